//! Tuning constants of the node search.
//!
//! Margins are in centipawns. The defaults are the classic values of the
//! search this engine follows, rescaled from a 188-point pawn to a 100-point one.

use crate::error::ConfigError;

use super::value::{Depth, Value};

/// Depth limit (exclusive) of the move-count pruning table.
pub const MOVE_COUNT_DEPTHS: usize = 16;

const REDUCTION_DIM: usize = 64;

type ReductionTable = [[[[Depth; REDUCTION_DIM]; REDUCTION_DIM]; 2]; 2];

#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Razoring margin by depth; index 0 is unused.
    pub razor_margin: [Value; 4],
    /// Child futility margin per ply of depth.
    pub futility_margin_per_ply: Value,
    /// Extra margin for futility pruning of individual moves.
    pub futility_parent_margin: Value,
    /// Delta-pruning margin added to the stand-pat score in quiescence.
    pub qsearch_futility_margin: Value,
    pub probcut_margin: Value,
    /// Non-PV internal iterative deepening needs `static_eval + iid_margin >= beta`.
    pub iid_margin: Value,
    /// Singular search window is `tt_value - singular_margin_per_ply * depth`.
    pub singular_margin_per_ply: Value,
    pub tempo: Value,
    pub pawn_value: Value,
    pub null_move_base: i32,
    pub null_move_depth_factor: i32,
    pub null_move_divisor: i32,
    /// History score at which late-move reduction is neither raised nor lowered.
    pub history_reduction_offset: Value,
    /// History points per ply of reduction change.
    pub history_reduction_divisor: Value,
    /// Quiet moves searched before the rest are pruned, by `[improving][depth]`.
    pub futility_move_counts: [[usize; MOVE_COUNT_DEPTHS]; 2],
    reductions: Box<ReductionTable>,
}

impl SearchParams {
    /// Late-move reduction for the `move_count`-th move at `depth`.
    #[inline]
    pub fn reduction(&self, pv: bool, improving: bool, depth: Depth, move_count: usize) -> Depth {
        let d = (depth.max(0) as usize).min(REDUCTION_DIM - 1);
        let mc = move_count.min(REDUCTION_DIM - 1);
        self.reductions[pv as usize][improving as usize][d][mc]
    }

    /// Child futility margin at `depth`.
    #[inline]
    pub fn futility_margin(&self, depth: Depth) -> Value {
        self.futility_margin_per_ply * depth
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("razor_margin[1]", self.razor_margin[1]),
            ("razor_margin[2]", self.razor_margin[2]),
            ("razor_margin[3]", self.razor_margin[3]),
            ("futility_margin_per_ply", self.futility_margin_per_ply),
            ("futility_parent_margin", self.futility_parent_margin),
            ("qsearch_futility_margin", self.qsearch_futility_margin),
            ("probcut_margin", self.probcut_margin),
            ("iid_margin", self.iid_margin),
            ("singular_margin_per_ply", self.singular_margin_per_ply),
            ("pawn_value", self.pawn_value),
            ("null_move_divisor", self.null_move_divisor),
            ("history_reduction_divisor", self.history_reduction_divisor),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(ConfigError::NonPositive {
                    name,
                    value: value as i64,
                });
            }
        }
        for row in &self.futility_move_counts {
            if let Some(index) = row.windows(2).position(|w| w[1] < w[0]) {
                return Err(ConfigError::NonMonotonic {
                    table: "futility_move_counts",
                    index: index + 1,
                });
            }
        }
        Ok(())
    }
}

fn futility_move_counts() -> [[usize; MOVE_COUNT_DEPTHS]; 2] {
    let mut counts = [[0; MOVE_COUNT_DEPTHS]; 2];
    for d in 0..MOVE_COUNT_DEPTHS {
        let depth = d as f64;
        counts[0][d] = (2.4 + 0.773 * depth.powf(1.8)) as usize;
        counts[1][d] = (2.9 + 1.045 * (depth + 0.49).powf(1.8)) as usize;
    }
    counts
}

fn reductions() -> Box<ReductionTable> {
    let mut table = Box::new([[[[0; REDUCTION_DIM]; REDUCTION_DIM]; 2]; 2]);
    for improving in 0..2 {
        for d in 1..REDUCTION_DIM {
            for mc in 1..REDUCTION_DIM {
                let r = (d as f64).ln() * (mc as f64).ln() / 2.0;
                if r < 0.80 {
                    continue;
                }
                let non_pv = r.round() as Depth;
                table[1][improving][d][mc] = (non_pv - 1).max(0);
                table[0][improving][d][mc] = if improving == 0 && non_pv >= 2 { non_pv + 1 } else { non_pv };
            }
        }
    }
    table
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            razor_margin: [257, 303, 321, 295],
            futility_margin_per_ply: 80,
            futility_parent_margin: 136,
            qsearch_futility_margin: 68,
            probcut_margin: 106,
            iid_margin: 136,
            singular_margin_per_ply: 2,
            tempo: crate::eval::TEMPO,
            pawn_value: 100,
            null_move_base: 823,
            null_move_depth_factor: 67,
            null_move_divisor: 256,
            history_reduction_offset: 10_000,
            history_reduction_divisor: 20_000,
            futility_move_counts: futility_move_counts(),
            reductions: reductions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_count_curves() {
        let p = SearchParams::default();
        assert_eq!(p.futility_move_counts[0][0], 2);
        assert_eq!(p.futility_move_counts[0][1], 3);
        assert_eq!(p.futility_move_counts[1][1], 5);
        assert!(p.futility_move_counts[1][15] > p.futility_move_counts[0][15]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn reductions_grow_and_favour_pv() {
        let p = SearchParams::default();
        assert_eq!(p.reduction(false, true, 1, 30), 0);
        assert_eq!(p.reduction(false, true, 3, 2), 0);
        assert!(p.reduction(false, true, 10, 20) > p.reduction(false, true, 4, 4));
        assert!(p.reduction(true, true, 10, 20) < p.reduction(false, true, 10, 20));
        // Not improving adds a ply once the base reduction reaches two.
        assert_eq!(p.reduction(false, false, 20, 20), p.reduction(false, true, 20, 20) + 1);
        // Out-of-range indices clamp to the table edge.
        assert_eq!(p.reduction(false, true, 500, 500), p.reduction(false, true, 63, 63));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut p = SearchParams::default();
        p.pawn_value = 0;
        assert!(matches!(p.validate(), Err(ConfigError::NonPositive { name: "pawn_value", .. })));

        let mut p = SearchParams::default();
        p.futility_move_counts[0][5] = 0;
        assert!(matches!(
            p.validate(),
            Err(ConfigError::NonMonotonic { index: 5, .. })
        ));
    }
}
