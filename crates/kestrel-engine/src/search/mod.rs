//! Alpha-beta search with Lazy SMP.

mod alphabeta;
pub mod config;
pub mod control;
pub mod history;
pub mod movepick;
pub mod node;
pub mod params;
pub mod pool;
mod qsearch;
pub mod root;
pub mod see;
pub mod stack;
pub mod tablebase;
pub mod tt;
pub mod value;
pub mod worker;

use std::time::Duration;

use kestrel_core::Move;

use value::{Depth, Value};

/// Result of a completed search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Best move of the deepest completed iteration, null when the root has no moves.
    pub best_move: Move,
    /// Expected reply, the second move of the PV.
    pub ponder_move: Option<Move>,
    pub pv: Vec<Move>,
    /// Score from the side to move's point of view.
    pub score: Value,
    pub depth: Depth,
    pub sel_depth: usize,
    /// Nodes searched by all threads.
    pub nodes: u64,
    pub tb_hits: u64,
}

/// Progress after one completed iteration of the main worker.
#[derive(Debug, Clone, Copy)]
pub struct IterationReport<'r> {
    pub depth: Depth,
    pub sel_depth: usize,
    pub score: Value,
    /// Nodes searched by all threads so far.
    pub nodes: u64,
    pub pv: &'r [Move],
    pub elapsed: Duration,
}
