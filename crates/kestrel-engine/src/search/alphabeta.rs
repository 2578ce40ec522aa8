//! The alpha-beta node search.

use std::time::Duration;

use kestrel_core::{Move, MoveKind, PieceKind, Position};
use tracing::info;

use crate::eval::evaluate;

use super::history::PieceTo;
use super::movepick::MovePicker;
use super::node::{NodeType, NonPv, Pv};
use super::see::{piece_value, see, see_ge};
use super::tt::Bound;
use super::value::{
    DEPTH_MAX, DEPTH_NONE, DEPTH_ZERO, Depth, MAX_PLY, ONE_PLY, VALUE_DRAW, VALUE_INFINITE, VALUE_KNOWN_WIN,
    VALUE_MATE, VALUE_MATE_IN_MAX_PLY, VALUE_MATED_IN_MAX_PLY, VALUE_NONE, VALUE_ZERO, Value, mate_in,
    mated_in, stat_bonus, value_from_tt, value_to_tt,
};
use super::worker::Worker;

/// Quiet moves remembered per node for history penalties.
const MAX_QUIETS: usize = 64;

/// Root searches slower than this announce the move being searched.
const CURRMOVE_DELAY: Duration = Duration::from_secs(3);

impl Worker<'_> {
    /// Search `pos` to `depth` within `(alpha, beta)` and return its score.
    ///
    /// After a stop the returned value is meaningless and nothing is recorded.
    pub(super) fn search<N: NodeType>(
        &mut self,
        pos: &mut Position,
        ply: usize,
        mut alpha: Value,
        mut beta: Value,
        depth: Depth,
        cut_node: bool,
    ) -> Value {
        debug_assert!(-VALUE_INFINITE <= alpha && alpha < beta && beta <= VALUE_INFINITE);
        debug_assert!(N::PV || alpha == beta - 1);
        debug_assert!(DEPTH_ZERO < depth && depth < DEPTH_MAX);
        debug_assert!(!(N::PV && cut_node));

        let (tt, stats, config) = (self.tt, self.stats, self.config);
        let params = &config.params;

        // Node init.
        let in_check = pos.in_check();
        let us = pos.side_to_move();
        let mut move_count = 0usize;
        let mut quiets = [Move::NULL; MAX_QUIETS];
        let mut quiet_count = 0usize;
        let mut best_value = -VALUE_INFINITE;
        self.stack.at_mut::<0>(ply).move_count = 0;
        self.control.poll(self.idx, &mut self.calls);
        if N::PV && self.sel_depth < ply + 1 {
            self.sel_depth = ply + 1;
        }

        if !N::ROOT {
            if self.control.is_stopped() || pos.is_draw() || ply >= MAX_PLY {
                return if ply >= MAX_PLY && !in_check {
                    evaluate(pos.board())
                } else {
                    self.draw_value[us.index()]
                };
            }

            // Mate distance pruning.
            alpha = alpha.max(mated_in(ply));
            beta = beta.min(mate_in(ply + 1));
            if alpha >= beta {
                return alpha;
            }
        }

        debug_assert!(ply < MAX_PLY);

        {
            let ss = self.stack.at_mut::<0>(ply);
            ss.current_move = Move::NULL;
            ss.cont_hist = None;
        }
        {
            let child = self.stack.at_mut::<1>(ply);
            child.excluded_move = Move::NULL;
            child.skip_early_pruning = false;
        }
        self.stack.at_mut::<2>(ply).killers = [Move::NULL; 2];
        let mut best_move = Move::NULL;

        // Transposition table lookup. A search with an excluded move must not
        // overwrite the full search of the same position, so it uses its own key.
        let excluded = self.stack.at::<0>(ply).excluded_move;
        let key = if excluded.is_null() { pos.key() } else { pos.exclusion_key() };
        let mut tte = tt.probe(key);
        let mut tt_data = tte.data;
        let tt_value = tt_data.map_or(VALUE_NONE, |d| value_from_tt(d.value, ply));
        let mut tt_move = if N::ROOT {
            self.root_moves.moves[self.root_moves.pv_idx].mv()
        } else {
            tt_data.map_or(Move::NULL, |d| Self::sane_tt_move(pos, d.mv))
        };

        if !N::PV
            && let Some(d) = tt_data
            && d.depth >= depth
            && tt_value != VALUE_NONE
            && (if tt_value >= beta { d.bound.has_lower() } else { d.bound.has_upper() })
        {
            self.stack.at_mut::<0>(ply).current_move = tt_move;
            if tt_value >= beta && !tt_move.is_null() && !pos.is_capture_or_promotion(tt_move) {
                self.update_stats(pos, ply, tt_move, depth, &[]);
            }
            return tt_value;
        }

        // Tablebase probe.
        if !N::ROOT && self.tb_cardinality > 0 {
            let pieces = pos.piece_count();
            if pieces <= self.tb_cardinality
                && (pieces < self.tb_cardinality || depth >= config.tb_probe_depth)
                && pos.rule50() == 0
                && !pos.can_castle_any()
                && let Some(wdl) = self.tablebase.probe_wdl(pos)
            {
                self.tb_hits += 1;
                let draw_score = i32::from(config.tb_use_rule50);
                let v = wdl.value();
                let value = if v < -draw_score {
                    -VALUE_MATE + MAX_PLY as Value + ply as Value
                } else if v > draw_score {
                    VALUE_MATE - MAX_PLY as Value - ply as Value
                } else {
                    VALUE_DRAW + 2 * v * draw_score
                };
                tte.save(
                    key,
                    value_to_tt(value, ply),
                    Bound::Exact,
                    (depth + 6 * ONE_PLY).min(DEPTH_MAX - ONE_PLY),
                    Move::NULL,
                    VALUE_NONE,
                    tt.generation(),
                );
                return value;
            }
        }

        // Static evaluation.
        let static_eval;
        let mut eval = VALUE_NONE;
        if in_check {
            static_eval = VALUE_NONE;
        } else if let Some(d) = tt_data {
            static_eval = if d.eval == VALUE_NONE { evaluate(pos.board()) } else { d.eval };
            eval = static_eval;
            if tt_value != VALUE_NONE
                && (if tt_value > eval { d.bound.has_lower() } else { d.bound.has_upper() })
            {
                eval = tt_value;
            }
        } else {
            let parent_eval = self.stack.at::<-1>(ply).static_eval;
            let after_null = pos.game_ply() > 0 && pos.last_move().is_null() && parent_eval != VALUE_NONE;
            static_eval = if after_null {
                -parent_eval + 2 * params.tempo
            } else {
                evaluate(pos.board())
            };
            eval = static_eval;
            tte.save(key, VALUE_NONE, Bound::None, DEPTH_NONE, Move::NULL, static_eval, tt.generation());
        }
        self.stack.at_mut::<0>(ply).static_eval = static_eval;

        if !in_check && !self.stack.at::<0>(ply).skip_early_pruning {
            // Razoring.
            if !N::PV
                && depth < 4 * ONE_PLY
                && eval + params.razor_margin[depth as usize] <= alpha
                && tt_move.is_null()
            {
                if depth <= ONE_PLY && eval + params.razor_margin[3] <= alpha {
                    return self.qsearch::<NonPv>(pos, ply, alpha, beta, DEPTH_ZERO, false);
                }
                let ralpha = alpha - params.razor_margin[depth as usize];
                let v = self.qsearch::<NonPv>(pos, ply, ralpha, ralpha + 1, DEPTH_ZERO, false);
                if v <= ralpha {
                    return v;
                }
            }

            // Child node futility pruning.
            if !N::ROOT
                && depth < 7 * ONE_PLY
                && eval - params.futility_margin(depth) >= beta
                && eval < VALUE_KNOWN_WIN
                && pos.has_non_pawn_material(us)
            {
                return eval - params.futility_margin(depth);
            }

            // Null move search with verification at high depth.
            if !N::PV
                && depth >= 2 * ONE_PLY
                && eval >= beta
                && (static_eval >= beta || depth >= 12 * ONE_PLY)
                && pos.has_non_pawn_material(us)
            {
                debug_assert!(eval - beta >= 0);
                {
                    let ss = self.stack.at_mut::<0>(ply);
                    ss.current_move = Move::NULL;
                    ss.cont_hist = None;
                }
                let r = ((params.null_move_base + params.null_move_depth_factor * depth) / params.null_move_divisor
                    + ((eval - beta) / params.pawn_value).min(3))
                    * ONE_PLY;

                self.stack.at_mut::<1>(ply).skip_early_pruning = true;
                self.nodes += 1;
                let null_value = {
                    let mut child = pos.play_null();
                    if depth - r < ONE_PLY {
                        -self.qsearch::<NonPv>(&mut child, ply + 1, -beta, -beta + 1, DEPTH_ZERO, false)
                    } else {
                        -self.search::<NonPv>(&mut child, ply + 1, -beta, -beta + 1, depth - r, !cut_node)
                    }
                };
                self.stack.at_mut::<1>(ply).skip_early_pruning = false;

                if null_value >= beta {
                    // Unproven mates are not returned.
                    let null_value = if null_value >= VALUE_MATE_IN_MAX_PLY { beta } else { null_value };
                    if depth < 12 * ONE_PLY && beta.abs() < VALUE_KNOWN_WIN {
                        return null_value;
                    }

                    self.stack.at_mut::<0>(ply).skip_early_pruning = true;
                    let v = if depth - r < ONE_PLY {
                        self.qsearch::<NonPv>(pos, ply, beta - 1, beta, DEPTH_ZERO, false)
                    } else {
                        self.search::<NonPv>(pos, ply, beta - 1, beta, depth - r, false)
                    };
                    self.stack.at_mut::<0>(ply).skip_early_pruning = false;
                    if v >= beta {
                        return null_value;
                    }
                }
            }

            // ProbCut: a good capture that beats beta by a margin at reduced
            // depth almost certainly refutes the previous move.
            if !N::PV && depth >= 5 * ONE_PLY && beta.abs() < VALUE_MATE_IN_MAX_PLY {
                let rbeta = (beta + params.probcut_margin).min(VALUE_INFINITE);
                let rdepth = depth - 4 * ONE_PLY;
                let threshold = pos.captured_piece().map_or(0, piece_value);
                let mut picker = MovePicker::new_probcut(pos, tt_move, threshold, stats);
                while let Some(mv) = picker.next(pos) {
                    {
                        let ss = self.stack.at_mut::<0>(ply);
                        ss.current_move = mv;
                        ss.cont_hist = Some(PieceTo::new(pos.moved_piece(mv), mv.dest()));
                    }
                    self.nodes += 1;
                    let value = {
                        let mut child = pos.play(mv);
                        -self.search::<NonPv>(&mut child, ply + 1, -rbeta, -rbeta + 1, rdepth, !cut_node)
                    };
                    if value >= rbeta {
                        return value;
                    }
                }
            }

            // Internal iterative deepening.
            if depth >= (if N::PV { 5 } else { 8 }) * ONE_PLY
                && tt_move.is_null()
                && (N::PV || static_eval + params.iid_margin >= beta)
            {
                let d = depth - 2 * ONE_PLY - if N::PV { DEPTH_ZERO } else { depth / 4 };
                self.stack.at_mut::<0>(ply).skip_early_pruning = true;
                self.search::<N>(pos, ply, alpha, beta, d, cut_node);
                self.stack.at_mut::<0>(ply).skip_early_pruning = false;

                tte = tt.probe(key);
                tt_data = tte.data;
                tt_move = tt_data.map_or(Move::NULL, |d| Self::sane_tt_move(pos, d.mv));
            }
        }

        // Move loop.
        let cont = [
            self.stack.at::<-1>(ply).cont_hist,
            self.stack.at::<-2>(ply).cont_hist,
            self.stack.at::<-4>(ply).cont_hist,
        ];
        let cmh = stats.continuation(cont[0]);
        let fmh = stats.continuation(cont[1]);
        let fmh2 = stats.continuation(cont[2]);

        let mut picker = MovePicker::new_main(pos, tt_move, stats, self.stack.at::<0>(ply).killers, cont);
        let mut value = best_value;
        let prior_eval = self.stack.at::<-2>(ply).static_eval;
        let improving = static_eval >= prior_eval || prior_eval == VALUE_NONE;

        let singular_node = !N::ROOT
            && depth >= 8 * ONE_PLY
            && !tt_move.is_null()
            && tt_value.abs() < VALUE_KNOWN_WIN
            && excluded.is_null()
            && tt_data.is_some_and(|d| d.bound.has_lower() && d.depth >= depth - 3 * ONE_PLY);

        while let Some(mv) = picker.next(pos) {
            if mv == excluded {
                continue;
            }
            if N::ROOT && !self.root_moves.contains(mv) {
                continue;
            }

            move_count += 1;
            self.stack.at_mut::<0>(ply).move_count = move_count;

            if N::ROOT && self.is_main() && self.control.elapsed() > CURRMOVE_DELAY {
                info!(
                    depth,
                    currmove = %mv,
                    currmovenumber = move_count + self.root_moves.pv_idx,
                    "searching root move"
                );
            }

            if N::PV {
                self.pv.clear_ply(ply + 1);
            }

            let mut extension = DEPTH_ZERO;
            let capture_or_promotion = pos.is_capture_or_promotion(mv);
            let moved = pos.moved_piece(mv);
            let piece_to = PieceTo::new(moved, mv.dest());
            let gives_check = pos.gives_check(mv);
            let move_count_pruning = depth < 16 * ONE_PLY
                && move_count >= params.futility_move_counts[usize::from(improving)][depth as usize];

            // Check extension.
            if gives_check && !move_count_pruning && see_ge(pos.board(), mv, VALUE_ZERO) {
                extension = ONE_PLY;
            }

            if singular_node && mv == tt_move && extension == DEPTH_ZERO {
                extension = self.singular_extension(pos, ply, mv, tt_value, depth, cut_node);
            }

            let new_depth = depth - ONE_PLY + extension;

            // Pruning at shallow depth.
            if !N::ROOT
                && !capture_or_promotion
                && !in_check
                && !gives_check
                && !pos.advanced_pawn_push(mv)
                && best_value > VALUE_MATED_IN_MAX_PLY
            {
                if move_count_pruning {
                    continue;
                }

                // Countermove-based pruning.
                if depth <= 4 * ONE_PLY
                    && mv != self.stack.at::<0>(ply).killers[0]
                    && cmh.as_ref().is_none_or(|t| t.get(piece_to) < VALUE_ZERO)
                    && fmh.as_ref().is_none_or(|t| t.get(piece_to) < VALUE_ZERO)
                    && (fmh2.as_ref().is_none_or(|t| t.get(piece_to) < VALUE_ZERO) || (cmh.is_some() && fmh.is_some()))
                {
                    continue;
                }

                let predicted_depth =
                    (new_depth - params.reduction(N::PV, improving, depth, move_count)).max(DEPTH_ZERO);

                // Parent node futility pruning.
                if predicted_depth < 7 * ONE_PLY
                    && static_eval + params.futility_margin(predicted_depth) + params.futility_parent_margin <= alpha
                {
                    continue;
                }

                if predicted_depth < 4 * ONE_PLY && !see_ge(pos.board(), mv, VALUE_ZERO) {
                    continue;
                }
            }

            {
                let ss = self.stack.at_mut::<0>(ply);
                ss.current_move = mv;
                ss.cont_hist = Some(piece_to);
                ss.move_count = move_count;
            }

            self.nodes += 1;
            let mut child = pos.play(mv);

            // Late move reduction, re-searched at full depth when it fails high.
            let do_full_depth = if depth >= 3 * ONE_PLY && move_count > 1 && !capture_or_promotion {
                let mut r = params.reduction(N::PV, improving, depth, move_count);
                let hist = stats.history.get(piece_to)
                    + cmh.as_ref().map_or(0, |t| t.get(piece_to))
                    + fmh.as_ref().map_or(0, |t| t.get(piece_to))
                    + fmh2.as_ref().map_or(0, |t| t.get(piece_to));

                if cut_node {
                    r += 2 * ONE_PLY;
                } else if mv.kind() == MoveKind::Normal
                    && child.board().piece_on(mv.dest()) != Some(PieceKind::Pawn)
                    && see(child.board(), Move::new(mv.dest(), mv.source())) < VALUE_ZERO
                {
                    // The move escapes a capture.
                    r -= 2 * ONE_PLY;
                }

                let r_hist = (hist - params.history_reduction_offset) / params.history_reduction_divisor;
                r = (r - r_hist * ONE_PLY).max(DEPTH_ZERO);

                let d = (new_depth - r).max(ONE_PLY);
                value = -self.search::<NonPv>(&mut child, ply + 1, -(alpha + 1), -alpha, d, true);
                value > alpha && r != DEPTH_ZERO
            } else {
                !N::PV || move_count > 1
            };

            if do_full_depth {
                value = if new_depth < ONE_PLY {
                    -self.qsearch::<NonPv>(&mut child, ply + 1, -(alpha + 1), -alpha, DEPTH_ZERO, gives_check)
                } else {
                    -self.search::<NonPv>(&mut child, ply + 1, -(alpha + 1), -alpha, new_depth, !cut_node)
                };
            }

            // Full window search for the first PV move and for moves that
            // beat alpha without reaching beta.
            if N::PV && (move_count == 1 || (value > alpha && (N::ROOT || value < beta))) {
                self.pv.clear_ply(ply + 1);
                value = if new_depth < ONE_PLY {
                    -self.qsearch::<Pv>(&mut child, ply + 1, -beta, -alpha, DEPTH_ZERO, gives_check)
                } else {
                    -self.search::<Pv>(&mut child, ply + 1, -beta, -alpha, new_depth, false)
                };
            }

            drop(child);

            if self.control.is_stopped() {
                return VALUE_ZERO;
            }
            debug_assert!(value > -VALUE_INFINITE && value < VALUE_INFINITE);

            if N::ROOT
                && let Some(rm) = self.root_moves.find_mut(mv)
            {
                if move_count == 1 || value > alpha {
                    rm.score = value;
                    rm.pv.truncate(1);
                    rm.pv.extend_from_slice(self.pv.line(ply + 1));
                    if move_count > 1 && self.idx == 0 {
                        self.best_move_changes += 1;
                    }
                } else {
                    // Stable sorting keeps unimproved moves in their order.
                    rm.score = -VALUE_INFINITE;
                }
            }

            if value > best_value {
                best_value = value;
                if value > alpha {
                    best_move = mv;
                    if N::PV && !N::ROOT {
                        self.pv.update(ply, mv);
                    }
                    if N::PV && value < beta {
                        alpha = value;
                    } else {
                        debug_assert!(value >= beta);
                        break;
                    }
                }
            }

            if !capture_or_promotion && mv != best_move && quiet_count < MAX_QUIETS {
                quiets[quiet_count] = mv;
                quiet_count += 1;
            }
        }

        if move_count == 0 {
            best_value = if !excluded.is_null() {
                alpha
            } else if in_check {
                mated_in(ply)
            } else {
                self.draw_value[us.index()]
            };
        } else if !best_move.is_null() && !pos.is_capture_or_promotion(best_move) {
            self.update_stats(pos, ply, best_move, depth, &quiets[..quiet_count]);
        } else if depth >= 3 * ONE_PLY
            && best_move.is_null()
            && pos.captured_piece().is_none()
            && let Some(prev) = self.stack.at::<-1>(ply).cont_hist
        {
            // The previous quiet move caused this fail low.
            let bonus = stat_bonus(depth / ONE_PLY);
            let keys = [
                self.stack.at::<-2>(ply).cont_hist,
                self.stack.at::<-3>(ply).cont_hist,
                self.stack.at::<-5>(ply).cont_hist,
            ];
            for table in keys.into_iter().filter_map(|k| stats.continuation(k)) {
                table.update(prev, bonus);
            }
        }

        let bound = if best_value >= beta {
            Bound::Lower
        } else if N::PV && !best_move.is_null() {
            Bound::Exact
        } else {
            Bound::Upper
        };
        tte.save(key, value_to_tt(best_value, ply), bound, depth, best_move, static_eval, tt.generation());

        debug_assert!(best_value > -VALUE_INFINITE && best_value < VALUE_INFINITE);
        best_value
    }

    /// Singular extension: `ONE_PLY` if every move but `tt_move` fails low
    /// against a window just below `tt_value` at half depth.
    pub(super) fn singular_extension(
        &mut self,
        pos: &mut Position,
        ply: usize,
        tt_move: Move,
        tt_value: Value,
        depth: Depth,
        cut_node: bool,
    ) -> Depth {
        let rbeta = tt_value - self.config.params.singular_margin_per_ply * depth / ONE_PLY;
        {
            let ss = self.stack.at_mut::<0>(ply);
            ss.excluded_move = tt_move;
            ss.skip_early_pruning = true;
        }
        let v = self.search::<NonPv>(pos, ply, rbeta - 1, rbeta, depth / 2, cut_node);
        {
            let ss = self.stack.at_mut::<0>(ply);
            ss.excluded_move = Move::NULL;
            ss.skip_early_pruning = false;
        }
        if v < rbeta { ONE_PLY } else { DEPTH_ZERO }
    }

    /// Reward the quiet `mv` that produced a cutoff and penalise the quiets
    /// tried before it.
    pub(super) fn update_stats(&mut self, pos: &Position, ply: usize, mv: Move, depth: Depth, quiets: &[Move]) {
        let stats = self.stats;
        {
            let ss = self.stack.at_mut::<0>(ply);
            if ss.killers[0] != mv {
                ss.killers[1] = ss.killers[0];
                ss.killers[0] = mv;
            }
        }

        let bonus = stat_bonus(depth / ONE_PLY);
        let prev = self.stack.at::<-1>(ply).cont_hist;
        let conts = [
            stats.continuation(prev),
            stats.continuation(self.stack.at::<-2>(ply).cont_hist),
            stats.continuation(self.stack.at::<-4>(ply).cont_hist),
        ];

        let piece_to = PieceTo::new(pos.moved_piece(mv), mv.dest());
        stats.history.update(piece_to, bonus);
        if let Some(prev) = prev {
            stats.counter_moves.set(prev, mv);
        }
        for table in conts.iter().flatten() {
            table.update(piece_to, bonus);
        }

        for &quiet in quiets {
            let pt = PieceTo::new(pos.moved_piece(quiet), quiet.dest());
            stats.history.update(pt, -bonus);
            for table in conts.iter().flatten() {
                table.update(pt, -bonus);
            }
        }

        // The previous move was the first one tried at its node and it just
        // got refuted: penalise it in the tables further back.
        if self.stack.at::<-1>(ply).move_count == 1
            && pos.captured_piece().is_none()
            && let Some(prev) = prev
        {
            let penalty = -bonus - 2 * (depth + ONE_PLY) / ONE_PLY - 1;
            let keys = [
                self.stack.at::<-2>(ply).cont_hist,
                self.stack.at::<-3>(ply).cont_hist,
                self.stack.at::<-5>(ply).cont_hist,
            ];
            for table in keys.into_iter().filter_map(|k| stats.continuation(k)) {
                table.update(prev, penalty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use kestrel_core::{Board, Square};

    use super::super::node::Root;
    use super::super::tablebase::{Tablebase, Wdl};
    use super::super::worker::harness::Harness;
    use super::*;

    /// Answers `wdl` for every position and remembers which keys it saw.
    struct FixedWdl {
        wdl: Wdl,
        probed: Mutex<Vec<u64>>,
    }

    impl Tablebase for FixedWdl {
        fn cardinality(&self) -> u32 {
            32
        }

        fn probe_wdl(&self, pos: &Position) -> Option<Wdl> {
            self.probed.lock().unwrap().push(pos.key());
            Some(self.wdl)
        }
    }

    /// Raises the stop flag the first time it is consulted.
    struct StopOnProbe {
        stopped: Arc<AtomicBool>,
    }

    impl Tablebase for StopOnProbe {
        fn cardinality(&self) -> u32 {
            32
        }

        fn probe_wdl(&self, _pos: &Position) -> Option<Wdl> {
            self.stopped.store(true, Ordering::Relaxed);
            None
        }
    }

    fn tablebase_harness(wdl: Wdl) -> Harness<FixedWdl> {
        let tablebase = FixedWdl {
            wdl,
            probed: Mutex::new(Vec::new()),
        };
        let mut h = Harness::with_tablebase(tablebase, Arc::new(AtomicBool::new(false)));
        h.config.tb_cardinality = 32;
        h
    }

    fn position(fen: &str) -> Position {
        fen.parse().unwrap()
    }

    #[test]
    fn mate_distance_pruning_needs_no_moves() {
        let h = Harness::new();
        let mut pos = Position::new(Board::starting_position());
        let mut w = h.worker(&pos);
        let v = w.search::<NonPv>(&mut pos, 5, mate_in(6), mate_in(6) + 1, 4, false);
        assert_eq!(v, mate_in(6));
        assert_eq!(w.nodes(), 0);
    }

    #[test]
    fn checkmate_scores_by_ply() {
        let mated_at = |ply| {
            let h = Harness::new();
            let mut pos = position("7k/6Q1/6K1/8/8/8/8/8 b - - 0 1");
            let mut w = h.worker(&pos);
            w.search::<Pv>(&mut pos, ply, -VALUE_INFINITE, VALUE_INFINITE, 3, false)
        };
        let near = mated_at(2);
        let far = mated_at(4);
        assert_eq!(near, mated_in(2));
        assert_eq!(far, mated_in(4));
        assert!(near < far, "a mate two plies sooner must score worse for the mated side");
    }

    #[test]
    fn stalemate_is_a_draw() {
        let h = Harness::new();
        let mut pos = position("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        let mut w = h.worker(&pos);
        let v = w.search::<Pv>(&mut pos, 1, -VALUE_INFINITE, VALUE_INFINITE, 3, false);
        assert_eq!(v, VALUE_DRAW);
    }

    #[test]
    fn exhausted_excluded_search_returns_alpha() {
        let h = Harness::new();
        let mut pos = position("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        let mut w = h.worker(&pos);
        {
            let ss = w.stack.at_mut::<0>(2);
            ss.excluded_move = Move::new(Square::H8, Square::G8);
            ss.skip_early_pruning = true;
        }
        let v = w.search::<NonPv>(&mut pos, 2, -101, -100, 2, false);
        assert_eq!(v, -101);
    }

    #[test]
    fn child_futility_returns_reduced_eval() {
        let h = Harness::new();
        let mut pos = position("4k3/8/8/8/8/8/8/Q3K3 w - - 0 1");
        let mut w = h.worker(&pos);
        let v = w.search::<NonPv>(&mut pos, 2, -1, 0, 3, false);
        assert_eq!(v, evaluate(pos.board()) - h.config.params.futility_margin(3));
        assert_eq!(w.nodes(), 0);
    }

    #[test]
    fn null_move_needs_non_pawn_material() {
        let h = Harness::new();
        let mut pawns = position("4k3/4p3/8/8/8/8/4P3/4K3 w - - 0 1");
        let mut w = h.worker(&pawns);
        w.search::<NonPv>(&mut pawns, 0, -501, -500, 7, false);
        let pawn_nodes = w.nodes();

        let h = Harness::new();
        let mut knight = position("4k3/4p3/8/8/8/8/4P3/2N1K3 w - - 0 1");
        let mut w = h.worker(&knight);
        let v = w.search::<NonPv>(&mut knight, 0, -501, -500, 7, false);
        assert!(v >= -500);
        assert!(w.nodes() <= 3, "null move should refute at once, searched {}", w.nodes());
        assert!(pawn_nodes > 10, "pawn ending searched only {pawn_nodes} nodes");
    }

    #[test]
    fn start_position_fails_high_against_a_low_beta() {
        let h = Harness::new();
        let mut pos = Position::new(Board::starting_position());
        let mut w = h.worker(&pos);
        let v = w.search::<NonPv>(&mut pos, 0, -1001, -1000, 4, false);
        assert!(v >= -1000, "got {v}");
    }

    #[test]
    fn reliable_tt_move_triggers_the_singular_search() {
        let h = Harness::new();
        let mut pos = position("4k3/8/8/8/8/8/3r4/3RK3 w - - 0 1");
        let capture = Move::new(Square::D1, Square::D2);
        let ply = 1;
        h.tt.probe(pos.key())
            .save(pos.key(), value_to_tt(300, ply), Bound::Lower, 6, capture, VALUE_NONE, h.tt.generation());
        assert!(!h.tt.probe(pos.exclusion_key()).hit());

        let mut w = h.worker(&pos);
        let v = w.search::<Pv>(&mut pos, ply, -VALUE_INFINITE, VALUE_INFINITE, 8, false);
        assert!(v > 0);
        assert!(h.tt.probe(pos.exclusion_key()).hit());
    }

    #[test]
    fn only_winning_move_is_extended() {
        // Rxa5 wins the queen; every other move leaves the rook to be taken.
        let h = Harness::new();
        let mut pos = position("7k/8/8/q7/8/8/8/R5K1 w - - 0 1");
        let capture = Move::new(Square::A1, Square::A5);
        let mut w = h.worker(&pos);
        assert_eq!(w.singular_extension(&mut pos, 1, capture, 400, 8, false), ONE_PLY);
        assert!(w.stack.at::<0>(1).excluded_move.is_null());
        assert_eq!(pos.game_ply(), 0);
    }

    #[test]
    fn move_with_good_alternatives_is_not_extended() {
        let h = Harness::new();
        let mut pos = Position::new(Board::starting_position());
        let e4 = Move::new(Square::E2, Square::E4);
        let mut w = h.worker(&pos);
        assert_eq!(w.singular_extension(&mut pos, 1, e4, -200, 8, false), DEPTH_ZERO);
    }

    #[test]
    fn tablebase_win_is_stored_exact_and_deep() {
        let h = tablebase_harness(Wdl::Win);
        let mut pos = position("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        let mut w = h.worker(&pos);
        let v = w.search::<NonPv>(&mut pos, 1, -1, 0, 3, false);

        assert_eq!(v, VALUE_MATE - MAX_PLY as Value - 1);
        assert_eq!(w.tb_hits, 1);
        assert_eq!(w.nodes(), 0);
        let data = h.tt.probe(pos.key()).data.unwrap();
        assert_eq!(data.bound, Bound::Exact);
        assert_eq!(data.depth, 3 + 6 * ONE_PLY);
        assert!(data.mv.is_null());
        assert_eq!(value_from_tt(data.value, 1), v);
    }

    #[test]
    fn tablebase_results_map_to_scores() {
        let mated = -VALUE_MATE + MAX_PLY as Value + 1;
        let cases = [
            (Wdl::Loss, true, mated),
            (Wdl::BlessedLoss, true, VALUE_DRAW - 2),
            (Wdl::Draw, true, VALUE_DRAW),
            (Wdl::CursedWin, true, VALUE_DRAW + 2),
            (Wdl::CursedWin, false, VALUE_MATE - MAX_PLY as Value - 1),
            (Wdl::BlessedLoss, false, mated),
        ];
        for (wdl, use_rule50, expected) in cases {
            let mut h = tablebase_harness(wdl);
            h.config.tb_use_rule50 = use_rule50;
            let mut pos = position("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
            let mut w = h.worker(&pos);
            let v = w.search::<NonPv>(&mut pos, 1, -1, 0, 3, false);
            assert_eq!(v, expected, "{wdl:?} with rule50 {use_rule50}");
        }
    }

    #[test]
    fn tablebase_skips_positions_with_clock_or_castling() {
        for fen in ["4k3/8/8/8/8/8/4P3/4K3 w - - 3 10", "4k3/8/8/8/8/8/4P3/4K2R w K - 0 1"] {
            let h = tablebase_harness(Wdl::Win);
            let mut pos = position(fen);
            let mut w = h.worker(&pos);
            let v = w.search::<NonPv>(&mut pos, 1, -1, 0, 1, false);
            assert!(v < VALUE_MATE_IN_MAX_PLY, "{fen}");
            assert!(!h.tablebase.probed.lock().unwrap().contains(&pos.key()), "{fen}");
            assert_eq!(w.tb_hits, 0, "{fen}");
        }
    }

    #[test]
    fn stop_inside_the_tree_records_nothing() {
        let stopped = Arc::new(AtomicBool::new(false));
        let tablebase = StopOnProbe {
            stopped: Arc::clone(&stopped),
        };
        let mut h = Harness::with_tablebase(tablebase, stopped);
        h.config.tb_cardinality = 32;
        // Only pawn moves are legal, so the first reply position is probed.
        let mut pos = position("4k3/8/8/8/8/8/4n1PP/7K w - - 0 1");
        let root_moves: Vec<Move> = pos.legal_moves().iter().copied().collect();
        assert_eq!(root_moves.len(), 4);

        let mut w = h.worker(&pos);
        let v = w.search::<Root>(&mut pos, 0, -VALUE_INFINITE, VALUE_INFINITE, 4, false);

        assert!(h.control.is_stopped());
        assert_eq!(v, VALUE_ZERO);
        assert_eq!(pos.game_ply(), 0);
        assert!(w.root_moves().moves.iter().all(|rm| rm.score == -VALUE_INFINITE));
        for ply in 0..4 {
            assert_eq!(w.stack.at::<0>(ply).killers, [Move::NULL; 2]);
        }

        let eval_only = |key: u64| {
            h.tt.probe(key)
                .data
                .is_none_or(|d| d.bound == Bound::None && d.mv.is_null())
        };
        assert!(eval_only(pos.key()));
        for mv in root_moves {
            let piece_to = PieceTo::new(pos.moved_piece(mv), mv.dest());
            assert_eq!(h.stats.history.get(piece_to), 0, "{mv}");
            let child = pos.play(mv);
            assert!(eval_only(child.key()), "{mv}");
        }
    }

    #[test]
    fn search_restores_the_position() {
        let h = Harness::new();
        let mut pos = position("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4");
        let key = pos.key();
        let mut w = h.worker(&pos);
        let v = w.search::<Pv>(&mut pos, 1, -VALUE_INFINITE, VALUE_INFINITE, 5, false);
        assert!(v > -VALUE_INFINITE && v < VALUE_INFINITE);
        assert_eq!(pos.key(), key);
        assert_eq!(pos.game_ply(), 0);
    }

    #[test]
    fn root_mate_in_one_is_stored_exact() {
        use std::sync::atomic::AtomicU64;

        let h = Harness::new();
        let mut pos = position("r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4");
        let mate = Move::new(Square::H5, Square::F7);
        let mut w = h.worker(&pos);
        let nodes = [AtomicU64::new(0)];
        w.iterate(&mut pos, 1, 3, &nodes, &mut |_| {});

        let best = &w.root_moves().moves[0];
        assert_eq!(best.mv(), mate);
        assert_eq!(best.score, mate_in(1));
        let data = h.tt.probe(pos.key()).data.unwrap();
        assert_eq!(data.bound, Bound::Exact);
        assert_eq!(data.mv, mate);
        assert_eq!(value_from_tt(data.value, 0), mate_in(1));
    }

    #[test]
    fn cutoff_rewards_move_and_penalises_earlier_quiets() {
        let h = Harness::new();
        let pos = Position::new(Board::starting_position());
        let mut w = h.worker(&pos);
        let best = Move::new(Square::G1, Square::F3);
        let tried = Move::new(Square::A2, Square::A3);
        w.update_stats(&pos, 2, best, 4, &[tried]);

        assert_eq!(w.stack.at::<0>(2).killers[0], best);
        let bonus = stat_bonus(4) * 32;
        let key = |mv: Move| PieceTo::new(pos.moved_piece(mv), mv.dest());
        assert_eq!(h.stats.history.get(key(best)), bonus);
        assert_eq!(h.stats.history.get(key(tried)), -bonus);

        let other = Move::new(Square::B1, Square::C3);
        w.update_stats(&pos, 2, other, 4, &[]);
        assert_eq!(w.stack.at::<0>(2).killers, [other, best]);
    }

    #[test]
    fn stop_flag_aborts_with_zero() {
        let h = Harness::new();
        h.control.stop();
        let mut pos = Position::new(Board::starting_position());
        let mut w = h.worker(&pos);
        assert_eq!(w.search::<Pv>(&mut pos, 1, -VALUE_INFINITE, VALUE_INFINITE, 6, false), VALUE_DRAW);
        assert_eq!(pos.game_ply(), 0);
    }
}
