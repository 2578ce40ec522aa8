//! Fixed-depth search bench over a set of positions.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use kestrel_core::Position;
use kestrel_engine::{SearchConfig, SearchControl, ThreadPool};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Positions searched when no `--fen` is given.
const BENCH_FENS: &[&str] = &[
    kestrel_core::STARTING_FEN,
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
    "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq c6 0 2",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "8/8/8/3k4/8/3K4/4P3/8 w - - 0 1",
];

#[derive(Parser)]
#[command(author, version, about = "Search bench for the kestrel engine")]
struct Args {
    /// Maximum search depth in plies
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(i32).range(1..128))]
    depth: i32,

    /// Number of search threads
    #[arg(short, long, default_value = "1")]
    threads: usize,

    /// Transposition table size in MB
    #[arg(long, default_value = "16")]
    hash: usize,

    /// Position to search, repeatable; the built-in set is used when absent
    #[arg(long)]
    fen: Vec<String>,

    /// Time limit per position in milliseconds
    #[arg(long)]
    movetime: Option<u64>,
}

fn control_for(movetime: Option<u64>) -> SearchControl {
    let stopped = Arc::new(AtomicBool::new(false));
    match movetime {
        Some(ms) => {
            let limit = Duration::from_millis(ms);
            SearchControl::new_timed(stopped, limit, limit)
        }
        None => SearchControl::new_infinite(stopped),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = SearchConfig {
        hash_mb: args.hash,
        threads: args.threads,
        ..SearchConfig::default()
    };
    let pool = ThreadPool::new(config).context("invalid search configuration")?;

    let fens: Vec<&str> = if args.fen.is_empty() {
        BENCH_FENS.to_vec()
    } else {
        args.fen.iter().map(String::as_str).collect()
    };
    let positions = fens
        .iter()
        .map(|fen| fen.parse::<Position>().with_context(|| format!("invalid FEN: {fen}")))
        .collect::<Result<Vec<_>>>()?;

    info!(
        positions = positions.len(),
        depth = args.depth,
        threads = args.threads,
        hash_mb = args.hash,
        "kestrel bench starting"
    );

    let start = Instant::now();
    let mut total_nodes = 0u64;
    for (fen, pos) in fens.iter().zip(&positions) {
        let control = control_for(args.movetime);
        let result = pool.search(pos, args.depth, &control, |it| {
            let pv: Vec<String> = it.pv.iter().map(|mv| mv.to_uci()).collect();
            debug!(
                depth = it.depth,
                sel_depth = it.sel_depth,
                score = it.score,
                nodes = it.nodes,
                elapsed_ms = it.elapsed.as_millis() as u64,
                pv = %pv.join(" "),
                "iteration"
            );
        });
        total_nodes += result.nodes;
        info!(
            fen,
            best_move = %result.best_move,
            ponder = ?result.ponder_move.map(|mv| mv.to_uci()),
            score = result.score,
            depth = result.depth,
            sel_depth = result.sel_depth,
            nodes = result.nodes,
            tb_hits = result.tb_hits,
            hashfull = pool.hashfull(),
            "position searched"
        );
    }

    let elapsed = start.elapsed();
    let nps = (total_nodes as f64 / elapsed.as_secs_f64().max(1e-3)) as u64;
    info!(
        nodes = total_nodes,
        elapsed_ms = elapsed.as_millis() as u64,
        nps,
        "bench complete"
    );
    Ok(())
}
