//! Staged move ordering.
//!
//! Moves come out in stages so a cutoff found early saves the cost of
//! scoring everything else. Within a stage the best remaining score is
//! picked by selection, one move at a time.
//!
//! Main search: TT move, winning and equal captures (MVV-LVA order, SEE
//! checked lazily), killers, countermove, quiets by history, losing captures.
//! In check every legal move is an evasion. ProbCut and quiescence have their
//! own shorter sequences.

use kestrel_core::{Move, MoveKind, MoveList, PieceKind, Position, PromotionPiece, Square};

use super::history::{HISTORY_MAX, PieceTo, SearchStats};
use super::see::{piece_value, see, see_ge};
use super::value::{DEPTH_QS_NO_CHECKS, DEPTH_QS_RECAPTURES, Depth, Value};

/// MVV-LVA scores indexed by `[victim][attacker]`.
///
/// Weights: Pawn=1, Knight=3, Bishop=3, Rook=5, Queen=9, King=0.
/// Formula: `victim_weight * 16 - attacker_weight`.
const MVV_LVA: [[Value; 6]; 6] = [
    [15, 13, 13, 11, 7, 16],
    [47, 45, 45, 43, 39, 48],
    [47, 45, 45, 43, 39, 48],
    [79, 77, 77, 75, 71, 80],
    [143, 141, 141, 139, 135, 144],
    [-1, -3, -3, -5, -9, 0],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    MainTt,
    CapturesInit,
    GoodCaptures,
    FirstKiller,
    SecondKiller,
    CounterMove,
    QuietsInit,
    Quiets,
    BadCaptures,
    EvasionTt,
    EvasionsInit,
    Evasions,
    ProbCutTt,
    ProbCutInit,
    ProbCut,
    QsTt,
    QsCapturesInit,
    QsCaptures,
    QsChecksInit,
    QsChecks,
    RecapturesInit,
    Recaptures,
    Done,
}

/// Captures and queen promotions: the moves produced by the capture stages.
#[inline]
pub fn is_tactical(pos: &Position, mv: Move) -> bool {
    if mv.is_promotion() {
        mv.promotion_piece() == PromotionPiece::Queen
    } else {
        pos.is_capture(mv)
    }
}

fn captured_kind(pos: &Position, mv: Move) -> Option<PieceKind> {
    if mv.kind() == MoveKind::EnPassant {
        Some(PieceKind::Pawn)
    } else if mv.is_castle() {
        None
    } else {
        pos.board().piece_on(mv.dest())
    }
}

fn capture_score(pos: &Position, mv: Move) -> Value {
    let attacker = pos.moved_piece(mv).kind();
    let mut score = captured_kind(pos, mv).map_or(0, |victim| MVV_LVA[victim.index()][attacker.index()]);
    if mv.is_promotion() && mv.promotion_piece() == PromotionPiece::Queen {
        score += MVV_LVA[PieceKind::Queen.index()][PieceKind::Pawn.index()];
    }
    score
}

fn quiet_score(stats: &SearchStats, cont: &[Option<PieceTo>; 3], pos: &Position, mv: Move) -> Value {
    let pt = PieceTo::new(pos.moved_piece(mv), mv.dest());
    let follow_ups: Value = cont
        .iter()
        .flatten()
        .map(|&prev| stats.counter_move_history.stats(prev).get(pt))
        .sum();
    stats.history.get(pt) + follow_ups
}

fn evasion_score(stats: &SearchStats, pos: &Position, mv: Move) -> Value {
    let exchange = see(pos.board(), mv);
    if exchange < 0 {
        exchange - HISTORY_MAX
    } else if let Some(victim) = captured_kind(pos, mv) {
        piece_value(victim) - pos.moved_piece(mv).kind() as Value + HISTORY_MAX
    } else {
        stats.history.get(PieceTo::new(pos.moved_piece(mv), mv.dest()))
    }
}

/// Produces the moves of one node in search order.
///
/// The picker does not hold the position: the caller passes it to
/// [`next`](MovePicker::next) each time, so it can play moves in between.
pub struct MovePicker<'a> {
    stats: &'a SearchStats,
    stage: Stage,
    legal: MoveList,
    tt_move: Move,
    killers: [Move; 2],
    counter_move: Move,
    cont: [Option<PieceTo>; 3],
    threshold: Value,
    with_checks: bool,
    recapture_sq: Option<Square>,
    moves: [Move; 256],
    scores: [Value; 256],
    len: usize,
    cursor: usize,
    bad_captures: MoveList,
    bad_cursor: usize,
}

impl<'a> MovePicker<'a> {
    fn empty(pos: &Position, stats: &'a SearchStats, stage: Stage) -> Self {
        Self {
            stats,
            stage,
            legal: pos.legal_moves(),
            tt_move: Move::NULL,
            killers: [Move::NULL; 2],
            counter_move: Move::NULL,
            cont: [None; 3],
            threshold: 0,
            with_checks: false,
            recapture_sq: None,
            moves: [Move::NULL; 256],
            scores: [0; 256],
            len: 0,
            cursor: 0,
            bad_captures: MoveList::new(),
            bad_cursor: 0,
        }
    }

    /// Picker for an interior node of the main search.
    ///
    /// `cont` holds the continuation keys of the moves one, two and four plies
    /// back; the first also selects the countermove.
    pub fn new_main(
        pos: &Position,
        tt_move: Move,
        stats: &'a SearchStats,
        killers: [Move; 2],
        cont: [Option<PieceTo>; 3],
    ) -> Self {
        if pos.in_check() {
            return Self::new_evasions(pos, tt_move, stats);
        }
        let mut picker = Self::empty(pos, stats, Stage::MainTt);
        picker.tt_move = picker.accept(tt_move);
        picker.cont = cont;
        picker.killers = killers;
        if picker.killers[1] == picker.killers[0] {
            picker.killers[1] = Move::NULL;
        }
        let counter = cont[0].map_or(Move::NULL, |prev| stats.counter_moves.get(prev));
        if !picker.killers.contains(&counter) {
            picker.counter_move = counter;
        }
        picker
    }

    fn new_evasions(pos: &Position, tt_move: Move, stats: &'a SearchStats) -> Self {
        let mut picker = Self::empty(pos, stats, Stage::EvasionTt);
        picker.tt_move = picker.accept(tt_move);
        picker
    }

    /// Picker for the quiescence search at `depth` (zero or below).
    ///
    /// Quiet checks are added at [`DEPTH_QS_CHECKS`](super::value::DEPTH_QS_CHECKS);
    /// at or below [`DEPTH_QS_RECAPTURES`] only captures on `recapture_sq` remain.
    pub fn new_qsearch(
        pos: &Position,
        tt_move: Move,
        depth: Depth,
        stats: &'a SearchStats,
        recapture_sq: Option<Square>,
    ) -> Self {
        if pos.in_check() {
            return Self::new_evasions(pos, tt_move, stats);
        }
        if depth <= DEPTH_QS_RECAPTURES {
            let mut picker = Self::empty(pos, stats, Stage::RecapturesInit);
            picker.recapture_sq = recapture_sq;
            return picker;
        }
        let mut picker = Self::empty(pos, stats, Stage::QsTt);
        picker.with_checks = depth > DEPTH_QS_NO_CHECKS;
        let tt_move = picker.accept(tt_move);
        if picker.with_checks || (!tt_move.is_null() && is_tactical(pos, tt_move)) {
            picker.tt_move = tt_move;
        }
        picker
    }

    /// Picker for ProbCut: tactical moves whose exchange beats `threshold`.
    pub fn new_probcut(pos: &Position, tt_move: Move, threshold: Value, stats: &'a SearchStats) -> Self {
        debug_assert!(!pos.in_check());
        let mut picker = Self::empty(pos, stats, Stage::ProbCutTt);
        picker.threshold = threshold;
        let tt_move = picker.accept(tt_move);
        if !tt_move.is_null() && is_tactical(pos, tt_move) && see(pos.board(), tt_move) > threshold {
            picker.tt_move = tt_move;
        }
        picker
    }

    /// `mv` if it is legal here, otherwise the null move.
    fn accept(&self, mv: Move) -> Move {
        if !mv.is_null() && self.legal.as_slice().contains(&mv) {
            mv
        } else {
            Move::NULL
        }
    }

    fn fill(
        &mut self,
        pos: &Position,
        keep: impl Fn(&Position, Move) -> bool,
        score: impl Fn(&Position, Move) -> Value,
    ) {
        self.len = 0;
        self.cursor = 0;
        for i in 0..self.legal.len() {
            let mv = self.legal[i];
            if mv != self.tt_move && keep(pos, mv) {
                self.moves[self.len] = mv;
                self.scores[self.len] = score(pos, mv);
                self.len += 1;
            }
        }
    }

    fn pick_best(&mut self) -> Option<Move> {
        if self.cursor >= self.len {
            return None;
        }
        let mut best = self.cursor;
        for i in self.cursor + 1..self.len {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }
        self.moves.swap(self.cursor, best);
        self.scores.swap(self.cursor, best);
        let mv = self.moves[self.cursor];
        self.cursor += 1;
        Some(mv)
    }

    fn refutation(&self, pos: &Position, mv: Move) -> Option<Move> {
        let mv = self.accept(mv);
        (!mv.is_null() && mv != self.tt_move && !is_tactical(pos, mv)).then_some(mv)
    }

    /// Next move to search, or `None` when the node is exhausted.
    pub fn next(&mut self, pos: &Position) -> Option<Move> {
        loop {
            match self.stage {
                Stage::MainTt | Stage::EvasionTt | Stage::ProbCutTt | Stage::QsTt => {
                    self.stage = match self.stage {
                        Stage::MainTt => Stage::CapturesInit,
                        Stage::EvasionTt => Stage::EvasionsInit,
                        Stage::ProbCutTt => Stage::ProbCutInit,
                        _ => Stage::QsCapturesInit,
                    };
                    if !self.tt_move.is_null() {
                        return Some(self.tt_move);
                    }
                }
                Stage::CapturesInit => {
                    self.fill(pos, is_tactical, capture_score);
                    self.stage = Stage::GoodCaptures;
                }
                Stage::GoodCaptures => {
                    while let Some(mv) = self.pick_best() {
                        if see_ge(pos.board(), mv, 0) {
                            return Some(mv);
                        }
                        self.bad_captures.push(mv);
                    }
                    self.stage = Stage::FirstKiller;
                }
                Stage::FirstKiller => {
                    self.stage = Stage::SecondKiller;
                    if let Some(mv) = self.refutation(pos, self.killers[0]) {
                        return Some(mv);
                    }
                }
                Stage::SecondKiller => {
                    self.stage = Stage::CounterMove;
                    if let Some(mv) = self.refutation(pos, self.killers[1]) {
                        return Some(mv);
                    }
                }
                Stage::CounterMove => {
                    self.stage = Stage::QuietsInit;
                    if let Some(mv) = self.refutation(pos, self.counter_move) {
                        return Some(mv);
                    }
                }
                Stage::QuietsInit => {
                    let skip = [self.killers[0], self.killers[1], self.counter_move];
                    let (stats, cont) = (self.stats, self.cont);
                    self.fill(
                        pos,
                        |pos, mv| !is_tactical(pos, mv) && !skip.contains(&mv),
                        |pos, mv| quiet_score(stats, &cont, pos, mv),
                    );
                    self.stage = Stage::Quiets;
                }
                Stage::Quiets => {
                    if let Some(mv) = self.pick_best() {
                        return Some(mv);
                    }
                    self.stage = Stage::BadCaptures;
                }
                Stage::BadCaptures => {
                    if self.bad_cursor < self.bad_captures.len() {
                        self.bad_cursor += 1;
                        return Some(self.bad_captures[self.bad_cursor - 1]);
                    }
                    self.stage = Stage::Done;
                }
                Stage::EvasionsInit => {
                    let stats = self.stats;
                    self.fill(pos, |_, _| true, |pos, mv| evasion_score(stats, pos, mv));
                    self.stage = Stage::Evasions;
                }
                Stage::ProbCutInit => {
                    self.fill(pos, is_tactical, capture_score);
                    self.stage = Stage::ProbCut;
                }
                Stage::ProbCut => {
                    while let Some(mv) = self.pick_best() {
                        if see(pos.board(), mv) > self.threshold {
                            return Some(mv);
                        }
                    }
                    self.stage = Stage::Done;
                }
                Stage::QsCapturesInit => {
                    self.fill(pos, is_tactical, capture_score);
                    self.stage = Stage::QsCaptures;
                }
                Stage::QsCaptures => {
                    if let Some(mv) = self.pick_best() {
                        return Some(mv);
                    }
                    self.stage = if self.with_checks { Stage::QsChecksInit } else { Stage::Done };
                }
                Stage::QsChecksInit => {
                    self.fill(
                        pos,
                        |pos, mv| !is_tactical(pos, mv) && pos.gives_check(mv),
                        |_, _| 0,
                    );
                    self.stage = Stage::QsChecks;
                }
                Stage::RecapturesInit => {
                    let target = self.recapture_sq;
                    self.fill(
                        pos,
                        |pos, mv| Some(mv.dest()) == target && is_tactical(pos, mv),
                        capture_score,
                    );
                    self.stage = Stage::Recaptures;
                }
                Stage::Evasions | Stage::QsChecks | Stage::Recaptures => {
                    if let Some(mv) = self.pick_best() {
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use kestrel_core::{Color, Piece};

    use super::*;
    use crate::search::value::DEPTH_QS_CHECKS;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).expect("valid FEN")
    }

    fn drain(picker: &mut MovePicker<'_>, pos: &Position) -> Vec<Move> {
        let mut out = Vec::new();
        while let Some(mv) = picker.next(pos) {
            out.push(mv);
        }
        out
    }

    fn assert_permutation_of_legal(moves: &[Move], pos: &Position) {
        let unique: HashSet<Move> = moves.iter().copied().collect();
        assert_eq!(unique.len(), moves.len(), "duplicate move yielded");
        assert_eq!(moves.len(), pos.legal_moves().len());
    }

    #[test]
    fn mvv_lva_prefers_big_victims_and_small_attackers() {
        let q = PieceKind::Queen.index();
        let p = PieceKind::Pawn.index();
        assert!(MVV_LVA[q][p] > MVV_LVA[p][q]);
        let r = PieceKind::Rook.index();
        assert!(MVV_LVA[r][p] > MVV_LVA[r][PieceKind::Knight.index()]);
    }

    #[test]
    fn main_picker_yields_every_legal_move_once() {
        let stats = SearchStats::new();
        let kiwipete = pos("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        let tt = kiwipete.parse_move("e2a6").unwrap();
        let killer = kiwipete.parse_move("a2a3").unwrap();
        let mut picker = MovePicker::new_main(&kiwipete, tt, &stats, [killer, Move::NULL], [None; 3]);
        let moves = drain(&mut picker, &kiwipete);
        assert_permutation_of_legal(&moves, &kiwipete);
        assert_eq!(moves[0], tt);
    }

    #[test]
    fn good_captures_precede_killers_quiets_and_bad_captures() {
        let stats = SearchStats::new();
        // Qxd5 loses the queen to the e6 pawn, Nxe5 wins a pawn.
        let p = pos("4k3/8/4p3/3pp3/2N5/8/3Q4/4K3 w - - 0 1");
        let killer = p.parse_move("e1f1").unwrap();
        let mut picker = MovePicker::new_main(&p, Move::NULL, &stats, [killer, Move::NULL], [None; 3]);
        let moves = drain(&mut picker, &p);
        assert_permutation_of_legal(&moves, &p);

        let nxe5 = p.parse_move("c4e5").unwrap();
        let qxd5 = p.parse_move("d2d5").unwrap();
        assert_eq!(moves[0], nxe5);
        assert_eq!(moves[1], killer);
        assert_eq!(*moves.last().unwrap(), qxd5);
    }

    #[test]
    fn history_orders_quiets() {
        let stats = SearchStats::new();
        let p = pos("4k3/8/8/8/8/8/8/4K2N w - - 0 1");
        let favoured = p.parse_move("h1g3").unwrap();
        let pt = PieceTo::new(Piece::new(PieceKind::Knight, Color::White), Square::G3);
        stats.history.update(pt, 100);
        let mut picker = MovePicker::new_main(&p, Move::NULL, &stats, [Move::NULL; 2], [None; 3]);
        assert_eq!(picker.next(&p), Some(favoured));
    }

    #[test]
    fn countermove_follows_killers() {
        let stats = SearchStats::new();
        let p = pos("4k3/8/8/8/8/8/8/4K2N w - - 0 1");
        let prev = PieceTo::new(Piece::new(PieceKind::King, Color::Black), Square::E8);
        let counter = p.parse_move("h1f2").unwrap();
        stats.counter_moves.set(prev, counter);
        let killer = p.parse_move("e1d1").unwrap();
        let mut picker = MovePicker::new_main(&p, Move::NULL, &stats, [killer, Move::NULL], [Some(prev), None, None]);
        assert_eq!(picker.next(&p), Some(killer));
        assert_eq!(picker.next(&p), Some(counter));
        let rest = drain(&mut picker, &p);
        assert!(!rest.contains(&counter) && !rest.contains(&killer));
    }

    #[test]
    fn illegal_tt_move_and_killers_are_dropped() {
        let stats = SearchStats::new();
        let p = pos("4k3/8/8/8/8/8/8/4K2N w - - 0 1");
        let bogus = Move::new(Square::A1, Square::A8);
        let mut picker = MovePicker::new_main(&p, bogus, &stats, [bogus, bogus], [None; 3]);
        let moves = drain(&mut picker, &p);
        assert_permutation_of_legal(&moves, &p);
        assert!(!moves.contains(&bogus));
    }

    #[test]
    fn in_check_yields_evasions_with_captures_first() {
        let stats = SearchStats::new();
        // Black queen checks from e2 and can be taken by the king or knight.
        let p = pos("4k3/8/8/8/8/8/4q3/3K2N1 w - - 0 1");
        let mut picker = MovePicker::new_main(&p, Move::NULL, &stats, [Move::NULL; 2], [None; 3]);
        let moves = drain(&mut picker, &p);
        assert_permutation_of_legal(&moves, &p);
        assert!(p.is_capture(moves[0]));
    }

    #[test]
    fn probcut_filters_by_exchange_threshold() {
        let stats = SearchStats::new();
        let p = pos("4k3/8/4p3/3pp3/2N5/8/3Q4/4K3 w - - 0 1");
        let mut picker = MovePicker::new_probcut(&p, Move::NULL, 0, &stats);
        assert_eq!(drain(&mut picker, &p), vec![p.parse_move("c4e5").unwrap()]);

        let mut picker = MovePicker::new_probcut(&p, Move::NULL, 100, &stats);
        assert!(drain(&mut picker, &p).is_empty());
    }

    #[test]
    fn qsearch_checks_only_at_check_depth() {
        let stats = SearchStats::new();
        let start = Position::new(kestrel_core::Board::starting_position());
        let mut picker = MovePicker::new_qsearch(&start, Move::NULL, DEPTH_QS_CHECKS, &stats, None);
        assert!(picker.next(&start).is_none());

        // Rook lift to the eighth rank gives check; no captures exist.
        let p = pos("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        let mut with_checks = MovePicker::new_qsearch(&p, Move::NULL, DEPTH_QS_CHECKS, &stats, None);
        let checks = drain(&mut with_checks, &p);
        assert!(checks.contains(&p.parse_move("a1a8").unwrap()));
        assert!(checks.iter().all(|&mv| p.gives_check(mv)));

        let mut without = MovePicker::new_qsearch(&p, Move::NULL, DEPTH_QS_NO_CHECKS, &stats, None);
        assert!(without.next(&p).is_none());
    }

    #[test]
    fn deep_qsearch_only_recaptures() {
        let stats = SearchStats::new();
        let p = pos("4k3/8/4p3/3pp3/2N5/8/3Q4/4K3 w - - 0 1");
        let mut picker = MovePicker::new_qsearch(&p, Move::NULL, DEPTH_QS_RECAPTURES, &stats, Some(Square::D5));
        assert_eq!(drain(&mut picker, &p), vec![p.parse_move("d2d5").unwrap()]);

        let mut none = MovePicker::new_qsearch(&p, Move::NULL, DEPTH_QS_RECAPTURES, &stats, None);
        assert!(none.next(&p).is_none());
    }

    #[test]
    fn qsearch_drops_quiet_tt_move_without_checks() {
        let stats = SearchStats::new();
        let p = pos("4k3/8/4p3/3pp3/2N5/8/3Q4/4K3 w - - 0 1");
        let quiet = p.parse_move("e1f1").unwrap();
        let mut picker = MovePicker::new_qsearch(&p, quiet, DEPTH_QS_NO_CHECKS, &stats, None);
        let moves = drain(&mut picker, &p);
        assert!(!moves.contains(&quiet));
        assert!(moves.iter().all(|&mv| is_tactical(&p, mv)));
    }
}
