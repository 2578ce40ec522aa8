//! One search thread: its private stack, position copy and counters.

use std::sync::atomic::{AtomicU64, Ordering};

use kestrel_core::{Move, Position};
use tracing::debug;

use super::config::SearchConfig;
use super::control::SearchControl;
use super::history::SearchStats;
use super::node::Root;
use super::root::RootMoves;
use super::stack::{PvTable, SearchStack};
use super::tablebase::Tablebase;
use super::tt::TranspositionTable;
use super::value::{Depth, VALUE_DRAW, VALUE_INFINITE, Value};
use super::IterationReport;

/// Everything a worker shares with the rest of the pool.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub tt: &'a TranspositionTable,
    pub stats: &'a SearchStats,
    pub control: &'a SearchControl,
    pub config: &'a SearchConfig,
    pub tablebase: &'a dyn Tablebase,
}

/// What a worker leaves behind once its iterations are over.
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub idx: usize,
    pub completed_depth: Depth,
    pub root_moves: RootMoves,
    pub sel_depth: usize,
    pub nodes: u64,
    pub tb_hits: u64,
}

pub struct Worker<'a> {
    pub(super) idx: usize,
    pub(super) tt: &'a TranspositionTable,
    pub(super) stats: &'a SearchStats,
    pub(super) control: &'a SearchControl,
    pub(super) config: &'a SearchConfig,
    pub(super) tablebase: &'a dyn Tablebase,
    /// Effective tablebase cardinality: the smaller of the setting and the tables.
    pub(super) tb_cardinality: u32,
    pub(super) stack: SearchStack,
    pub(super) pv: PvTable,
    pub(super) root_moves: RootMoves,
    /// Draw score by side to move, skewed by contempt against the root side.
    pub(super) draw_value: [Value; 2],
    pub(super) nodes: u64,
    pub(super) tb_hits: u64,
    pub(super) calls: u32,
    pub(super) sel_depth: usize,
    pub(super) best_move_changes: u64,
    pub(super) completed_depth: Depth,
}

impl<'a> Worker<'a> {
    pub fn new(idx: usize, ctx: SearchContext<'a>, root: &Position) -> Self {
        let us = root.side_to_move();
        let mut draw_value = [VALUE_DRAW; 2];
        draw_value[us.index()] = VALUE_DRAW - ctx.config.contempt;
        draw_value[(!us).index()] = VALUE_DRAW + ctx.config.contempt;

        Self {
            idx,
            tt: ctx.tt,
            stats: ctx.stats,
            control: ctx.control,
            config: ctx.config,
            tablebase: ctx.tablebase,
            tb_cardinality: ctx.config.tb_cardinality.min(ctx.tablebase.cardinality()),
            stack: SearchStack::new(),
            pv: PvTable::new(),
            root_moves: RootMoves::new(root),
            draw_value,
            nodes: 0,
            tb_hits: 0,
            calls: 0,
            sel_depth: 0,
            best_move_changes: 0,
            completed_depth: 0,
        }
    }

    #[inline]
    pub fn is_main(&self) -> bool {
        self.idx == 0
    }

    /// Root move list, sorted best first after each completed iteration.
    pub fn root_moves(&self) -> &RootMoves {
        &self.root_moves
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Iterative deepening from `start_depth` to `max_depth`.
    ///
    /// `nodes` receives this worker's node count after every iteration so the
    /// main worker can report pool totals. Only the main worker calls `report`.
    pub fn iterate(
        &mut self,
        pos: &mut Position,
        start_depth: Depth,
        max_depth: Depth,
        nodes: &[AtomicU64],
        report: &mut dyn FnMut(&IterationReport<'_>),
    ) {
        debug!(worker = self.idx, start_depth, max_depth, "worker started");
        if self.root_moves.is_empty() {
            return;
        }
        self.stack.reset();

        for depth in start_depth..=max_depth {
            if self.control.should_stop_iterating() {
                break;
            }
            self.root_moves.save_previous_scores();
            self.root_moves.pv_idx = 0;
            self.sel_depth = 0;
            self.best_move_changes = 0;

            let score = self.search::<Root>(pos, 0, -VALUE_INFINITE, VALUE_INFINITE, depth, false);
            self.root_moves.sort();
            nodes[self.idx].store(self.nodes, Ordering::Relaxed);

            if self.control.is_stopped() {
                break;
            }
            self.completed_depth = depth;

            if self.is_main() {
                let best = &self.root_moves.moves[0];
                debug!(
                    depth,
                    score,
                    sel_depth = self.sel_depth,
                    best_move_changes = self.best_move_changes,
                    "iteration complete"
                );
                let total = nodes.iter().map(|n| n.load(Ordering::Relaxed)).sum();
                report(&IterationReport {
                    depth,
                    sel_depth: self.sel_depth,
                    score: best.score,
                    nodes: total,
                    pv: &best.pv,
                    elapsed: self.control.elapsed(),
                });
            }
        }

        nodes[self.idx].store(self.nodes, Ordering::Relaxed);
        debug!(
            worker = self.idx,
            completed_depth = self.completed_depth,
            nodes = self.nodes,
            "worker finished"
        );
    }

    pub fn into_outcome(self) -> WorkerOutcome {
        WorkerOutcome {
            idx: self.idx,
            completed_depth: self.completed_depth,
            root_moves: self.root_moves,
            sel_depth: self.sel_depth,
            nodes: self.nodes,
            tb_hits: self.tb_hits,
        }
    }

    /// `mv` if it can be the move stored for `pos`: a piece of the side to
    /// move stands on its source square. Guards against key collisions.
    #[inline]
    pub(super) fn sane_tt_move(pos: &Position, mv: Move) -> Move {
        if !mv.is_null() && pos.board().color_on(mv.source()) == Some(pos.side_to_move()) {
            mv
        } else {
            Move::NULL
        }
    }
}
