//! Quiescence search: captures, promotions and (at the first level) quiet
//! checks until the position is quiet enough to trust the static eval.

use kestrel_core::{Move, Position};

use crate::eval::{endgame_value, evaluate};

use super::movepick::MovePicker;
use super::node::NodeType;
use super::see::see_ge;
use super::tt::Bound;
use super::value::{
    DEPTH_NONE, DEPTH_QS_CHECKS, DEPTH_QS_NO_CHECKS, DEPTH_ZERO, Depth, MAX_PLY, ONE_PLY, VALUE_INFINITE,
    VALUE_KNOWN_WIN, VALUE_MATED_IN_MAX_PLY, VALUE_NONE, Value, mated_in, value_from_tt, value_to_tt,
};
use super::worker::Worker;

impl Worker<'_> {
    /// Resolve captures below the horizon. `in_check` must match `pos.in_check()`.
    pub(super) fn qsearch<N: NodeType>(
        &mut self,
        pos: &mut Position,
        ply: usize,
        mut alpha: Value,
        beta: Value,
        depth: Depth,
        in_check: bool,
    ) -> Value {
        debug_assert!(!N::ROOT);
        debug_assert_eq!(in_check, pos.in_check());
        debug_assert!(-VALUE_INFINITE <= alpha && alpha < beta && beta <= VALUE_INFINITE);
        debug_assert!(N::PV || alpha == beta - 1);
        debug_assert!(depth <= DEPTH_ZERO);

        let (tt, stats) = (self.tt, self.stats);
        let params = &self.config.params;
        let old_alpha = alpha;

        if N::PV {
            self.pv.clear_ply(ply);
        }
        {
            let ss = self.stack.at_mut::<0>(ply);
            ss.current_move = Move::NULL;
            ss.cont_hist = None;
        }
        let mut best_move = Move::NULL;

        if pos.is_draw() || ply >= MAX_PLY {
            return if ply >= MAX_PLY && !in_check {
                evaluate(pos.board())
            } else {
                self.draw_value[pos.side_to_move().index()]
            };
        }
        debug_assert!(ply < MAX_PLY);

        // Checks are only generated at the first quiescence level, so entries
        // from either kind of node answer different questions.
        let tt_depth = if in_check || depth >= DEPTH_QS_CHECKS { DEPTH_QS_CHECKS } else { DEPTH_QS_NO_CHECKS };

        let key = pos.key();
        let tte = tt.probe(key);
        let tt_data = tte.data;
        let tt_value = tt_data.map_or(VALUE_NONE, |d| value_from_tt(d.value, ply));
        let tt_move = tt_data.map_or(Move::NULL, |d| Self::sane_tt_move(pos, d.mv));

        if !N::PV
            && let Some(d) = tt_data
            && d.depth >= tt_depth
            && tt_value != VALUE_NONE
            && (if tt_value >= beta { d.bound.has_lower() } else { d.bound.has_upper() })
        {
            self.stack.at_mut::<0>(ply).current_move = tt_move;
            return tt_value;
        }

        // Stand pat.
        let static_eval;
        let mut best_value;
        let futility_base;
        if in_check {
            static_eval = VALUE_NONE;
            best_value = -VALUE_INFINITE;
            futility_base = -VALUE_INFINITE;
        } else {
            if let Some(d) = tt_data {
                static_eval = if d.eval == VALUE_NONE { evaluate(pos.board()) } else { d.eval };
                best_value = static_eval;
                if tt_value != VALUE_NONE
                    && (if tt_value > best_value { d.bound.has_lower() } else { d.bound.has_upper() })
                {
                    best_value = tt_value;
                }
            } else {
                let parent_eval = self.stack.at::<-1>(ply).static_eval;
                static_eval = if pos.game_ply() > 0 && pos.last_move().is_null() && parent_eval != VALUE_NONE {
                    -parent_eval + 2 * params.tempo
                } else {
                    evaluate(pos.board())
                };
                best_value = static_eval;
            }

            if best_value >= beta {
                if tt_data.is_none() {
                    tte.save(
                        key,
                        value_to_tt(best_value, ply),
                        Bound::Lower,
                        DEPTH_NONE,
                        Move::NULL,
                        static_eval,
                        tt.generation(),
                    );
                }
                return best_value;
            }

            if N::PV && best_value > alpha {
                alpha = best_value;
            }
            futility_base = best_value + params.qsearch_futility_margin;
        }
        self.stack.at_mut::<0>(ply).static_eval = static_eval;

        let last = pos.last_move();
        let recapture_sq = (!last.is_null()).then(|| last.dest());
        let mut picker = MovePicker::new_qsearch(pos, tt_move, depth, stats, recapture_sq);

        while let Some(mv) = picker.next(pos) {
            let gives_check = pos.gives_check(mv);

            // Futility pruning: even winning the captured piece outright
            // cannot lift the score to alpha.
            if !in_check && !gives_check && futility_base > -VALUE_KNOWN_WIN && !pos.advanced_pawn_push(mv) {
                let futility_value = futility_base + pos.board().piece_on(mv.dest()).map_or(0, endgame_value);
                if futility_value <= alpha {
                    best_value = best_value.max(futility_value);
                    continue;
                }
                if futility_base <= alpha && !see_ge(pos.board(), mv, 1) {
                    best_value = best_value.max(futility_base);
                    continue;
                }
            }

            // Losing exchanges are skipped, and so are quiet evasions once a
            // move has shown the side to move is not mated.
            let evasion_prunable = in_check && best_value > VALUE_MATED_IN_MAX_PLY && !pos.is_capture(mv);
            if (!in_check || evasion_prunable) && !mv.is_promotion() && !see_ge(pos.board(), mv, 0) {
                continue;
            }

            self.stack.at_mut::<0>(ply).current_move = mv;
            self.nodes += 1;
            let value = {
                let mut child = pos.play(mv);
                -self.qsearch::<N>(&mut child, ply + 1, -beta, -alpha, depth - ONE_PLY, gives_check)
            };
            debug_assert!(value > -VALUE_INFINITE && value < VALUE_INFINITE);

            if value > best_value {
                best_value = value;
                if value > alpha {
                    if N::PV {
                        self.pv.update(ply, mv);
                    }
                    if N::PV && value < beta {
                        alpha = value;
                        best_move = mv;
                    } else {
                        tte.save(
                            key,
                            value_to_tt(value, ply),
                            Bound::Lower,
                            tt_depth,
                            mv,
                            static_eval,
                            tt.generation(),
                        );
                        return value;
                    }
                }
            }
        }

        if in_check && best_value == -VALUE_INFINITE {
            return mated_in(ply);
        }

        let bound = if N::PV && best_value > old_alpha { Bound::Exact } else { Bound::Upper };
        tte.save(key, value_to_tt(best_value, ply), bound, tt_depth, best_move, static_eval, tt.generation());

        debug_assert!(best_value > -VALUE_INFINITE && best_value < VALUE_INFINITE);
        best_value
    }
}
