//! Move-ordering statistics shared by all search threads.
//!
//! Every table is indexed by a `(piece, to)` slot and stored in relaxed
//! atomics. Threads race on updates; a lost update only perturbs move order.

use std::sync::atomic::{AtomicI32, AtomicU16, Ordering};

use kestrel_core::{Move, Piece, Square};

use super::value::Value;

const PIECE_TO_COUNT: usize = 12 * 64;

/// Bound above every reachable history score.
pub const HISTORY_MAX: Value = 1 << 28;

/// Updates at or above this magnitude are ignored.
const BONUS_LIMIT: Value = 324;
const HISTORY_DIVISOR: Value = 324;
const COUNTER_MOVE_DIVISOR: Value = 936;

/// A `(piece, to)` slot. Also keys the continuation tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceTo(u16);

impl PieceTo {
    #[inline]
    pub const fn new(piece: Piece, to: Square) -> Self {
        PieceTo((piece.index() * 64 + to.index()) as u16)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Decay `slot` towards zero by `|bonus| / divisor` of itself, then add `32 * bonus`.
#[inline]
fn apply_bonus(slot: &AtomicI32, bonus: Value, divisor: Value) {
    let magnitude = bonus.abs();
    if magnitude >= BONUS_LIMIT {
        return;
    }
    let old = slot.load(Ordering::Relaxed);
    let new = old - old * magnitude / divisor + bonus * 32;
    slot.store(new, Ordering::Relaxed);
}

fn zeroed(len: usize) -> Box<[AtomicI32]> {
    (0..len).map(|_| AtomicI32::new(0)).collect()
}

/// Butterfly-style history keyed by the moved piece and destination.
pub struct HistoryStats {
    table: Box<[AtomicI32]>,
}

impl HistoryStats {
    pub fn new() -> Self {
        Self {
            table: zeroed(PIECE_TO_COUNT),
        }
    }

    #[inline]
    pub fn get(&self, pt: PieceTo) -> Value {
        self.table[pt.index()].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn update(&self, pt: PieceTo, bonus: Value) {
        apply_bonus(&self.table[pt.index()], bonus, HISTORY_DIVISOR);
    }

    pub fn clear(&self) {
        self.table.iter().for_each(|v| v.store(0, Ordering::Relaxed));
    }
}

impl Default for HistoryStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for moves that follow a given earlier move.
pub struct CounterMoveStats<'a> {
    table: &'a [AtomicI32],
}

impl CounterMoveStats<'_> {
    #[inline]
    pub fn get(&self, pt: PieceTo) -> Value {
        self.table[pt.index()].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn update(&self, pt: PieceTo, bonus: Value) {
        apply_bonus(&self.table[pt.index()], bonus, COUNTER_MOVE_DIVISOR);
    }
}

/// One [`CounterMoveStats`] table per earlier `(piece, to)`.
pub struct CounterMoveHistory {
    table: Box<[AtomicI32]>,
}

impl CounterMoveHistory {
    pub fn new() -> Self {
        Self {
            table: zeroed(PIECE_TO_COUNT * PIECE_TO_COUNT),
        }
    }

    /// The table of follow-up statistics for the earlier move `prev`.
    #[inline]
    pub fn stats(&self, prev: PieceTo) -> CounterMoveStats<'_> {
        let start = prev.index() * PIECE_TO_COUNT;
        CounterMoveStats {
            table: &self.table[start..start + PIECE_TO_COUNT],
        }
    }

    pub fn clear(&self) {
        self.table.iter().for_each(|v| v.store(0, Ordering::Relaxed));
    }
}

impl Default for CounterMoveHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// The quiet move that last refuted each `(piece, to)`.
pub struct CounterMoves {
    table: Box<[AtomicU16]>,
}

impl CounterMoves {
    pub fn new() -> Self {
        Self {
            table: (0..PIECE_TO_COUNT).map(|_| AtomicU16::new(0)).collect(),
        }
    }

    #[inline]
    pub fn get(&self, pt: PieceTo) -> Move {
        Move::from_raw(self.table[pt.index()].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, pt: PieceTo, mv: Move) {
        self.table[pt.index()].store(mv.raw(), Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.table.iter().for_each(|v| v.store(0, Ordering::Relaxed));
    }
}

impl Default for CounterMoves {
    fn default() -> Self {
        Self::new()
    }
}

/// Every statistics table the search consults, shared across threads.
#[derive(Default)]
pub struct SearchStats {
    pub history: HistoryStats,
    pub counter_moves: CounterMoves,
    pub counter_move_history: CounterMoveHistory,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continuation table keyed by `prev`, if that ply recorded one.
    #[inline]
    pub fn continuation(&self, prev: Option<PieceTo>) -> Option<CounterMoveStats<'_>> {
        prev.map(|pt| self.counter_move_history.stats(pt))
    }

    pub fn clear(&self) {
        self.history.clear();
        self.counter_moves.clear();
        self.counter_move_history.clear();
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::{Color, PieceKind};

    use super::*;

    fn knight_f3() -> PieceTo {
        PieceTo::new(Piece::new(PieceKind::Knight, Color::White), Square::F3)
    }

    #[test]
    fn piece_to_indices_are_distinct() {
        let a = PieceTo::new(Piece::new(PieceKind::Pawn, Color::White), Square::A1);
        let b = PieceTo::new(Piece::new(PieceKind::King, Color::Black), Square::H8);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), PIECE_TO_COUNT - 1);
    }

    #[test]
    fn history_bonus_and_gravity() {
        let h = HistoryStats::new();
        h.update(knight_f3(), 6);
        assert_eq!(h.get(knight_f3()), 192);
        // 192 - 192 * 6 / 324 + 192 = 381
        h.update(knight_f3(), 6);
        assert_eq!(h.get(knight_f3()), 381);
        h.update(knight_f3(), -6);
        assert_eq!(h.get(knight_f3()), 381 - 381 * 6 / 324 - 192);
    }

    #[test]
    fn oversized_bonus_is_ignored() {
        let h = HistoryStats::new();
        h.update(knight_f3(), 324);
        h.update(knight_f3(), -400);
        assert_eq!(h.get(knight_f3()), 0);
    }

    #[test]
    fn history_saturates_below_max() {
        let h = HistoryStats::new();
        for _ in 0..10_000 {
            h.update(knight_f3(), 323);
        }
        let v = h.get(knight_f3());
        assert!(v > 0 && v < HISTORY_MAX);
        assert!(v <= 32 * 324 + 32);
    }

    #[test]
    fn continuation_tables_are_independent() {
        let stats = SearchStats::new();
        let prev_a = PieceTo::new(Piece::new(PieceKind::Pawn, Color::Black), Square::E5);
        let prev_b = PieceTo::new(Piece::new(PieceKind::Pawn, Color::Black), Square::D5);
        stats.counter_move_history.stats(prev_a).update(knight_f3(), 10);
        assert_eq!(stats.counter_move_history.stats(prev_a).get(knight_f3()), 320);
        assert_eq!(stats.counter_move_history.stats(prev_b).get(knight_f3()), 0);
        assert!(stats.continuation(None).is_none());

        stats.clear();
        assert_eq!(stats.counter_move_history.stats(prev_a).get(knight_f3()), 0);
    }

    #[test]
    fn counter_move_slot_round_trips() {
        let cm = CounterMoves::new();
        let mv = Move::new(Square::G8, Square::F6);
        assert!(cm.get(knight_f3()).is_null());
        cm.set(knight_f3(), mv);
        assert_eq!(cm.get(knight_f3()), mv);
    }
}
