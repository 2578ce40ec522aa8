//! Score and depth units used throughout the search.
//!
//! Scores are centipawns from the side to move's point of view. Mate scores
//! count plies from the root, so the same mate found at different plies is
//! stored in the transposition table relative to the node instead.

/// A search score in centipawns.
pub type Value = i32;

/// A remaining search depth in plies. Quiescence uses zero and below.
pub type Depth = i32;

/// Deepest ply the search will descend to.
pub const MAX_PLY: usize = 128;

pub const VALUE_ZERO: Value = 0;
pub const VALUE_DRAW: Value = 0;
pub const VALUE_KNOWN_WIN: Value = 10_000;
pub const VALUE_MATE: Value = 32_000;
pub const VALUE_INFINITE: Value = 32_001;
/// Sentinel for "no value", never a real score.
pub const VALUE_NONE: Value = 32_002;

pub const VALUE_MATE_IN_MAX_PLY: Value = VALUE_MATE - 2 * MAX_PLY as Value;
pub const VALUE_MATED_IN_MAX_PLY: Value = -VALUE_MATE + 2 * MAX_PLY as Value;

pub const ONE_PLY: Depth = 1;
pub const DEPTH_ZERO: Depth = 0;
/// Quiescence depth at which quiet checks are still generated.
pub const DEPTH_QS_CHECKS: Depth = 0;
pub const DEPTH_QS_NO_CHECKS: Depth = -1;
/// Below this quiescence depth only recaptures are searched.
pub const DEPTH_QS_RECAPTURES: Depth = -5;
/// Depth recorded for entries that carry only a static evaluation.
pub const DEPTH_NONE: Depth = -6;
pub const DEPTH_MAX: Depth = MAX_PLY as Depth;

/// Score for delivering mate `ply` plies from the root.
#[inline]
pub const fn mate_in(ply: usize) -> Value {
    VALUE_MATE - ply as Value
}

/// Score for being mated `ply` plies from the root.
#[inline]
pub const fn mated_in(ply: usize) -> Value {
    -VALUE_MATE + ply as Value
}

/// Convert a root-relative score into the node-relative form stored in the
/// transposition table.
#[inline]
pub fn value_to_tt(v: Value, ply: usize) -> Value {
    debug_assert!(v != VALUE_NONE);
    if v >= VALUE_MATE_IN_MAX_PLY {
        v + ply as Value
    } else if v <= VALUE_MATED_IN_MAX_PLY {
        v - ply as Value
    } else {
        v
    }
}

/// Inverse of [`value_to_tt`]. [`VALUE_NONE`] passes through unchanged.
#[inline]
pub fn value_from_tt(v: Value, ply: usize) -> Value {
    if v == VALUE_NONE {
        VALUE_NONE
    } else if v >= VALUE_MATE_IN_MAX_PLY {
        v - ply as Value
    } else if v <= VALUE_MATED_IN_MAX_PLY {
        v + ply as Value
    } else {
        v
    }
}

/// Bonus fed to the history tables for a move that caused (or refuted) a cutoff.
#[inline]
pub const fn stat_bonus(depth: Depth) -> Value {
    depth * depth + 2 * depth - 2
}
