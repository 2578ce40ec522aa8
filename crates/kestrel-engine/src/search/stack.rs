//! Per-ply search bookkeeping: the search stack and the principal variation table.

use kestrel_core::Move;

use super::history::PieceTo;
use super::value::{MAX_PLY, VALUE_NONE, Value};

/// Number of sentinel entries in front of ply 0.
///
/// Nodes read up to five plies back (the follow-up history looks at ply - 4)
/// and write two plies ahead, so the root needs valid entries on both sides.
pub const STACK_OFFSET: usize = 5;

const STACK_LEN: usize = MAX_PLY + STACK_OFFSET + 5;

/// What the search remembers about one ply of the current line.
#[derive(Debug, Clone, Copy)]
pub struct StackEntry {
    pub ply: usize,
    /// Move being searched from this ply, [`Move::NULL`] for a null move.
    pub current_move: Move,
    /// Move skipped during a singular-extension verification search.
    pub excluded_move: Move,
    pub static_eval: Value,
    pub move_count: usize,
    pub killers: [Move; 2],
    /// History slot of `current_move`, used by deeper plies as a continuation key.
    pub cont_hist: Option<PieceTo>,
    /// Suppresses null move, razoring and the other static prunings at the child.
    pub skip_early_pruning: bool,
}

impl StackEntry {
    const EMPTY: StackEntry = StackEntry {
        ply: 0,
        current_move: Move::NULL,
        excluded_move: Move::NULL,
        static_eval: VALUE_NONE,
        move_count: 0,
        killers: [Move::NULL; 2],
        cont_hist: None,
        skip_early_pruning: false,
    };
}

/// Fixed-size stack indexed by ply with room for sentinels before the root.
pub struct SearchStack {
    entries: Box<[StackEntry; STACK_LEN]>,
}

impl SearchStack {
    pub fn new() -> Self {
        let mut stack = Self {
            entries: Box::new([StackEntry::EMPTY; STACK_LEN]),
        };
        stack.reset();
        stack
    }

    /// Wipe every entry and renumber plies. Called before each new search.
    pub fn reset(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            *entry = StackEntry::EMPTY;
            entry.ply = i.saturating_sub(STACK_OFFSET);
        }
    }

    /// Entry `OFF` plies away from `ply`.
    #[inline]
    pub fn at<const OFF: isize>(&self, ply: usize) -> &StackEntry {
        const { assert!(-(STACK_OFFSET as isize) <= OFF && OFF <= 2) };
        &self.entries[(ply + STACK_OFFSET).wrapping_add_signed(OFF)]
    }

    /// Mutable entry `OFF` plies away from `ply`.
    #[inline]
    pub fn at_mut<const OFF: isize>(&mut self, ply: usize) -> &mut StackEntry {
        const { assert!(-(STACK_OFFSET as isize) <= OFF && OFF <= 2) };
        &mut self.entries[(ply + STACK_OFFSET).wrapping_add_signed(OFF)]
    }
}

impl Default for SearchStack {
    fn default() -> Self {
        Self::new()
    }
}

const PV_ROWS: usize = MAX_PLY + 2;

/// Triangular principal-variation table.
///
/// Row `ply` holds the best line found from that ply. A node that raises
/// alpha stores its move followed by the row of the ply below it.
pub struct PvTable {
    moves: Box<[[Move; PV_ROWS]; PV_ROWS]>,
    len: [usize; PV_ROWS],
}

impl PvTable {
    pub fn new() -> Self {
        Self {
            moves: Box::new([[Move::NULL; PV_ROWS]; PV_ROWS]),
            len: [0; PV_ROWS],
        }
    }

    /// Empty the line at `ply`.
    #[inline]
    pub fn clear_ply(&mut self, ply: usize) {
        if ply < PV_ROWS {
            self.len[ply] = 0;
        }
    }

    /// Store `mv` followed by the continuation at `ply + 1` as the line at `ply`.
    pub fn update(&mut self, ply: usize, mv: Move) {
        if ply + 1 >= PV_ROWS {
            return;
        }
        let copy_len = self.len[ply + 1].min(PV_ROWS - 1);
        let (top, bottom) = self.moves.split_at_mut(ply + 1);
        top[ply][0] = mv;
        top[ply][1..1 + copy_len].copy_from_slice(&bottom[0][..copy_len]);
        self.len[ply] = 1 + copy_len;
    }

    /// Line currently stored at `ply`.
    #[inline]
    pub fn line(&self, ply: usize) -> &[Move] {
        &self.moves[ply][..self.len[ply]]
    }
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::Square;

    use super::*;

    #[test]
    fn sentinels_sit_before_the_root() {
        let mut stack = SearchStack::new();
        stack.at_mut::<{ -5 }>(0).static_eval = 42;
        assert_eq!(stack.at::<{ -1 }>(4).static_eval, 42);
        assert_eq!(stack.at::<0>(3).ply, 3);
        assert_eq!(stack.at::<2>(MAX_PLY).ply, MAX_PLY + 2);
        assert!(stack.at::<{ -2 }>(0).current_move.is_null());
    }

    #[test]
    fn reset_clears_killers() {
        let mut stack = SearchStack::new();
        stack.at_mut::<1>(6).killers[0] = Move::new(Square::G1, Square::F3);
        stack.reset();
        assert!(stack.at::<0>(7).killers[0].is_null());
    }

    #[test]
    fn pv_update_prepends_to_child_line() {
        let mut pv = PvTable::new();
        let e4 = Move::new(Square::E2, Square::E4);
        let e5 = Move::new(Square::E7, Square::E5);
        let nf3 = Move::new(Square::G1, Square::F3);

        pv.clear_ply(3);
        pv.update(2, nf3);
        pv.update(1, e5);
        pv.update(0, e4);
        assert_eq!(pv.line(0), &[e4, e5, nf3]);

        pv.clear_ply(1);
        pv.update(0, nf3);
        assert_eq!(pv.line(0), &[nf3]);
    }

    #[test]
    fn pv_update_at_the_horizon_is_ignored() {
        let mut pv = PvTable::new();
        pv.update(PV_ROWS - 1, Move::new(Square::A2, Square::A3));
        assert!(pv.line(PV_ROWS - 1).is_empty());
    }
}
