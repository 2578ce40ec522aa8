//! Lazy SMP thread pool: every worker searches the same root and they
//! cooperate only through the shared tables.

use std::sync::atomic::AtomicU64;
use std::thread;

use kestrel_core::{Move, Position};
use tracing::{info, warn};

use crate::error::ConfigError;

use super::config::SearchConfig;
use super::control::SearchControl;
use super::history::SearchStats;
use super::tablebase::{NoTablebase, Tablebase};
use super::tt::TranspositionTable;
use super::value::{DEPTH_MAX, Depth, ONE_PLY, VALUE_DRAW, mated_in};
use super::worker::{SearchContext, Worker, WorkerOutcome};
use super::{IterationReport, SearchResult};

/// Stack size for search threads; the recursion keeps a move list per ply.
const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Owns everything the workers share between searches.
pub struct ThreadPool {
    tt: TranspositionTable,
    stats: SearchStats,
    config: SearchConfig,
    tablebase: Box<dyn Tablebase>,
}

impl ThreadPool {
    /// Build a pool for `config`, allocating its transposition table.
    pub fn new(config: SearchConfig) -> Result<Self, ConfigError> {
        if let Err(err) = config.validate() {
            warn!(%err, "rejected search configuration");
            return Err(err);
        }
        Ok(Self {
            tt: TranspositionTable::new(config.hash_mb),
            stats: SearchStats::new(),
            config,
            tablebase: Box::new(NoTablebase),
        })
    }

    /// Replace the endgame tablebase used by the search.
    pub fn with_tablebase(mut self, tablebase: Box<dyn Tablebase>) -> Self {
        self.tablebase = tablebase;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn tt(&self) -> &TranspositionTable {
        &self.tt
    }

    /// Set the number of search threads.
    pub fn set_threads(&mut self, threads: usize) -> Result<(), ConfigError> {
        let config = SearchConfig { threads, ..self.config.clone() };
        if let Err(err) = config.validate() {
            warn!(%err, "rejected thread count");
            return Err(err);
        }
        self.config = config;
        Ok(())
    }

    /// Reallocate the transposition table, discarding its contents.
    pub fn resize_tt(&mut self, mb: usize) -> Result<(), ConfigError> {
        let config = SearchConfig { hash_mb: mb, ..self.config.clone() };
        if let Err(err) = config.validate() {
            warn!(%err, "rejected hash size");
            return Err(err);
        }
        self.config = config;
        self.tt = TranspositionTable::new(mb);
        Ok(())
    }

    /// Forget everything learned: table entries and move statistics.
    pub fn clear(&self) {
        self.tt.clear();
        self.stats.clear();
    }

    /// Permille of the transposition table in use by the current search.
    pub fn hashfull(&self) -> u32 {
        self.tt.hashfull()
    }

    /// Search `pos` to at most `max_depth` plies on every configured thread.
    ///
    /// The main worker reports each completed iteration through `on_iter` and
    /// raises the stop flag when it finishes, which ends the helpers too.
    pub fn search<F>(&self, pos: &Position, max_depth: Depth, control: &SearchControl, mut on_iter: F) -> SearchResult
    where
        F: FnMut(&IterationReport<'_>) + Send,
    {
        self.tt.new_generation();
        let max_depth = max_depth.clamp(ONE_PLY, DEPTH_MAX - ONE_PLY);

        if pos.legal_moves().is_empty() {
            let score = if pos.in_check() { mated_in(0) } else { VALUE_DRAW };
            info!(score, "no legal moves at the root");
            return SearchResult::terminal(score);
        }

        let ctx = SearchContext {
            tt: &self.tt,
            stats: &self.stats,
            control,
            config: &self.config,
            tablebase: self.tablebase.as_ref(),
        };
        let threads = self.config.threads;
        let nodes: Vec<AtomicU64> = (0..threads).map(|_| AtomicU64::new(0)).collect();
        let nodes = nodes.as_slice();

        let outcomes: Vec<WorkerOutcome> = thread::scope(|s| {
            let mut handles = Vec::with_capacity(threads);

            let main = move || {
                let mut root = pos.clone();
                let mut worker = Worker::new(0, ctx, &root);
                worker.iterate(&mut root, ONE_PLY, max_depth, nodes, &mut on_iter);
                control.stop();
                worker.into_outcome()
            };
            let main_handle = thread::Builder::new()
                .name("kestrel-search-0".into())
                .stack_size(WORKER_STACK_SIZE)
                .spawn_scoped(s, main);

            for idx in 1..threads {
                let helper = move || {
                    let mut root = pos.clone();
                    let mut worker = Worker::new(idx, ctx, &root);
                    // Odd helpers skip the first iteration so the threads drift apart.
                    let start = ONE_PLY + (idx % 2) as Depth;
                    worker.iterate(&mut root, start, max_depth, nodes, &mut |_| {});
                    worker.into_outcome()
                };
                match thread::Builder::new()
                    .name(format!("kestrel-search-{idx}"))
                    .stack_size(WORKER_STACK_SIZE)
                    .spawn_scoped(s, helper)
                {
                    Ok(handle) => handles.push(handle),
                    Err(err) => warn!(idx, %err, "failed to spawn search helper"),
                }
            }

            let mut outcomes = Vec::with_capacity(threads);
            match main_handle {
                Ok(handle) => outcomes.push(join(handle)),
                Err(err) => {
                    warn!(%err, "failed to spawn main search thread");
                    control.stop();
                }
            }
            outcomes.extend(handles.into_iter().map(join));
            outcomes
        });

        let result = SearchResult::from_outcomes(&outcomes);
        info!(
            best_move = %result.best_move,
            score = result.score,
            depth = result.depth,
            nodes = result.nodes,
            tb_hits = result.tb_hits,
            elapsed_ms = control.elapsed().as_millis() as u64,
            "search finished"
        );
        result
    }
}

fn join(handle: thread::ScopedJoinHandle<'_, WorkerOutcome>) -> WorkerOutcome {
    match handle.join() {
        Ok(outcome) => outcome,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

impl SearchResult {
    fn terminal(score: i32) -> Self {
        Self {
            best_move: Move::NULL,
            ponder_move: None,
            pv: Vec::new(),
            score,
            depth: 0,
            sel_depth: 0,
            nodes: 0,
            tb_hits: 0,
        }
    }

    /// Pick the line to play from the finished workers.
    ///
    /// A helper replaces the main worker only when it completed a deeper
    /// iteration with a better score.
    fn from_outcomes(outcomes: &[WorkerOutcome]) -> Self {
        let nodes = outcomes.iter().map(|o| o.nodes).sum();
        let tb_hits = outcomes.iter().map(|o| o.tb_hits).sum();

        let score = |o: &WorkerOutcome| o.root_moves.best().map(|rm| rm.score);
        let mut best = outcomes.iter().find(|o| o.idx == 0).or_else(|| outcomes.first());
        for o in outcomes {
            if let Some(cur) = best
                && o.completed_depth > cur.completed_depth
                && score(o) > score(cur)
            {
                best = Some(o);
            }
        }

        let Some(outcome) = best else {
            return Self { nodes, tb_hits, ..Self::terminal(VALUE_DRAW) };
        };
        let Some(line) = outcome.root_moves.best() else {
            return Self { nodes, tb_hits, ..Self::terminal(VALUE_DRAW) };
        };

        Self {
            best_move: line.mv(),
            ponder_move: line.pv.get(1).copied(),
            pv: line.pv.clone(),
            score: line.score,
            depth: outcome.completed_depth,
            sel_depth: outcome.sel_depth,
            nodes,
            tb_hits,
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("tt", &self.tt)
            .field("config", &self.config)
            .finish()
    }
}
