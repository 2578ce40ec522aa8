//! Moves available at the root and what the search learned about each.

use kestrel_core::{Move, Position};

use super::value::{VALUE_INFINITE, Value};

#[derive(Debug, Clone)]
pub struct RootMove {
    /// Score from the current iteration, `-VALUE_INFINITE` until searched.
    pub score: Value,
    pub previous_score: Value,
    /// Principal variation starting with this move.
    pub pv: Vec<Move>,
}

impl RootMove {
    pub fn new(mv: Move) -> Self {
        Self {
            score: -VALUE_INFINITE,
            previous_score: -VALUE_INFINITE,
            pv: vec![mv],
        }
    }

    /// The root move itself.
    #[inline]
    pub fn mv(&self) -> Move {
        self.pv[0]
    }
}

/// Root move list of one worker, plus the index of the line being searched.
#[derive(Debug, Clone, Default)]
pub struct RootMoves {
    pub moves: Vec<RootMove>,
    pub pv_idx: usize,
}

impl RootMoves {
    /// Every legal move of `pos`, unscored.
    pub fn new(pos: &Position) -> Self {
        Self {
            moves: pos.legal_moves().as_slice().iter().copied().map(RootMove::new).collect(),
            pv_idx: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Whether `mv` is still to be searched for the current line.
    pub fn contains(&self, mv: Move) -> bool {
        self.moves[self.pv_idx..].iter().any(|rm| rm.mv() == mv)
    }

    pub fn find_mut(&mut self, mv: Move) -> Option<&mut RootMove> {
        self.moves.iter_mut().find(|rm| rm.mv() == mv)
    }

    /// Stable sort by descending score from `pv_idx` on.
    ///
    /// Moves that did not beat alpha keep their relative order.
    pub fn sort(&mut self) {
        self.moves[self.pv_idx..].sort_by(|a, b| b.score.cmp(&a.score));
    }

    pub fn save_previous_scores(&mut self) {
        for rm in &mut self.moves {
            rm.previous_score = rm.score;
        }
    }

    /// First move in the list, the best after [`sort`](Self::sort).
    #[inline]
    pub fn best(&self) -> Option<&RootMove> {
        self.moves.first()
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::Board;

    use super::*;

    #[test]
    fn startpos_has_twenty_root_moves() {
        let rm = RootMoves::new(&Position::new(Board::starting_position()));
        assert_eq!(rm.len(), 20);
        assert!(rm.moves.iter().all(|m| m.score == -VALUE_INFINITE && m.pv.len() == 1));
    }

    #[test]
    fn sort_is_stable_and_respects_pv_idx() {
        let pos = Position::new(Board::starting_position());
        let mut rm = RootMoves::new(&pos);
        let order: Vec<Move> = rm.moves.iter().map(RootMove::mv).collect();
        rm.moves[5].score = 40;
        rm.moves[9].score = 40;
        rm.moves[12].score = 90;
        rm.sort();
        assert_eq!(rm.moves[0].mv(), order[12]);
        assert_eq!(rm.moves[1].mv(), order[5]);
        assert_eq!(rm.moves[2].mv(), order[9]);
        assert_eq!(rm.moves[3].mv(), order[0]);

        rm.pv_idx = 1;
        assert!(!rm.contains(order[12]));
        assert!(rm.contains(order[9]));
    }

    #[test]
    fn find_and_save_previous() {
        let pos = Position::new(Board::starting_position());
        let mut rm = RootMoves::new(&pos);
        let e4 = pos.parse_move("e2e4").unwrap();
        rm.find_mut(e4).unwrap().score = 33;
        rm.save_previous_scores();
        assert_eq!(rm.find_mut(e4).unwrap().previous_score, 33);
        assert!(rm.find_mut(Move::NULL).is_none());
    }
}
