//! A board plus the stack of states that led to it.
//!
//! The search walks the tree by pushing a state for every move it tries and
//! popping it on the way back out. [`MoveGuard`] ties the pop to scope exit so
//! every return path restores the position exactly.

use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use tracing::trace;

use crate::attacks::{bishop_attacks, knight_attacks, pawn_attacks, queen_attacks, rook_attacks};
use crate::bitboard::Bitboard;
use crate::board::Board;
use crate::error::{FenError, MoveError};
use crate::movegen::generate_legal_moves;
use crate::moves::{Move, MoveKind, MoveList};
use crate::types::{Color, Piece, PieceKind};
use crate::zobrist;

/// Per-ply snapshot kept on the position stack.
#[derive(Clone, Copy)]
struct StateInfo {
    board: Board,
    /// Move that produced this state, [`Move::NULL`] for the root and null moves.
    last_move: Move,
    /// Piece kind removed by `last_move`, if it was a capture.
    captured: Option<PieceKind>,
    /// Plies since the last null move, bounding the repetition scan.
    plies_from_null: u16,
}

/// A chess position with its reversible history.
#[derive(Clone)]
pub struct Position {
    states: Vec<StateInfo>,
}

impl Position {
    /// Start a position with no history from `board`.
    pub fn new(board: Board) -> Position {
        let mut states = Vec::with_capacity(256);
        states.push(StateInfo {
            board,
            last_move: Move::NULL,
            captured: None,
            plies_from_null: 0,
        });
        Position { states }
    }

    /// Parse a FEN string into a history-free position.
    pub fn from_fen(fen: &str) -> Result<Position, FenError> {
        Ok(Position::new(fen.parse()?))
    }

    #[inline]
    fn state(&self) -> &StateInfo {
        // The root state is never popped.
        &self.states[self.states.len() - 1]
    }

    /// Return the current board.
    #[inline]
    pub fn board(&self) -> &Board {
        &self.state().board
    }

    /// Return the Zobrist key of the current position.
    #[inline]
    pub fn key(&self) -> u64 {
        self.board().hash()
    }

    /// Return the key used while searching this position with one move excluded.
    #[inline]
    pub fn exclusion_key(&self) -> u64 {
        self.key() ^ zobrist::EXCLUSION
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.board().side_to_move()
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.board().in_check()
    }

    /// Return the halfmove clock of the fifty-move rule.
    #[inline]
    pub fn rule50(&self) -> u16 {
        self.board().halfmove_clock()
    }

    /// Return the number of plies played since the last null move.
    #[inline]
    pub fn plies_from_null(&self) -> u16 {
        self.state().plies_from_null
    }

    /// Return the move that led to the current position, or [`Move::NULL`].
    #[inline]
    pub fn last_move(&self) -> Move {
        self.state().last_move
    }

    /// Return the piece kind captured by the last move, if any.
    #[inline]
    pub fn captured_piece(&self) -> Option<PieceKind> {
        self.state().captured
    }

    /// Return the number of moves stacked on top of the starting board.
    #[inline]
    pub fn game_ply(&self) -> usize {
        self.states.len() - 1
    }

    #[inline]
    pub fn piece_count(&self) -> u32 {
        self.board().piece_count()
    }

    #[inline]
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        self.board().has_non_pawn_material(color)
    }

    /// Return `true` if either side still holds any castling right.
    #[inline]
    pub fn can_castle_any(&self) -> bool {
        !self.board().castling().is_empty()
    }

    /// Generate every legal move of the current position.
    #[inline]
    pub fn legal_moves(&self) -> MoveList {
        generate_legal_moves(self.board())
    }

    /// Return the piece `mv` moves.
    ///
    /// # Panics
    ///
    /// Panics if the source square of `mv` is empty, which no legal move allows.
    pub fn moved_piece(&self, mv: Move) -> Piece {
        self.board()
            .colored_piece_on(mv.source())
            .expect("legal move must start on an occupied square")
    }

    /// Return `true` if `mv` captures a piece (en passant included).
    #[inline]
    pub fn is_capture(&self, mv: Move) -> bool {
        match mv.kind() {
            MoveKind::EnPassant => true,
            MoveKind::Castling => false,
            _ => self.board().side(!self.side_to_move()).contains(mv.dest()),
        }
    }

    /// Return `true` if `mv` captures or promotes.
    #[inline]
    pub fn is_capture_or_promotion(&self, mv: Move) -> bool {
        mv.is_promotion() || self.is_capture(mv)
    }

    /// Return `true` if `mv` pushes a pawn that already stands in the enemy half.
    pub fn advanced_pawn_push(&self, mv: Move) -> bool {
        let board = self.board();
        if board.piece_on(mv.source()) != Some(PieceKind::Pawn) {
            return false;
        }
        let rank = mv.source().rank().index();
        let relative = match board.side_to_move() {
            Color::White => rank,
            Color::Black => 7 - rank,
        };
        relative > 3
    }

    /// Return `true` if playing `mv` puts the opponent in check.
    ///
    /// Normal moves and promotions are resolved with attack lookups on the
    /// post-move occupancy. Castling and en passant, which move two pieces,
    /// fall back to making the move.
    pub fn gives_check(&self, mv: Move) -> bool {
        let board = self.board();
        let us = board.side_to_move();
        let king = board.king_square(!us);
        let src = mv.source();
        let dst = mv.dest();

        let kind = match mv.kind() {
            MoveKind::Normal => match board.piece_on(src) {
                Some(kind) => kind,
                None => return false,
            },
            MoveKind::Promotion => mv.promotion_piece().to_piece_kind(),
            MoveKind::EnPassant | MoveKind::Castling => return board.make_move(mv).in_check(),
        };

        let occupied = board.occupied().without(src).with(dst);
        let direct = match kind {
            PieceKind::Pawn => pawn_attacks(us, dst),
            PieceKind::Knight => knight_attacks(dst),
            PieceKind::Bishop => bishop_attacks(dst, occupied),
            PieceKind::Rook => rook_attacks(dst, occupied),
            PieceKind::Queen => queen_attacks(dst, occupied),
            PieceKind::King => Bitboard::EMPTY,
        };
        if direct.contains(king) {
            return true;
        }

        let ours = board.side(us).without(src).without(dst);
        let queens = board.pieces(PieceKind::Queen);
        let orthogonal = (board.pieces(PieceKind::Rook) | queens) & ours;
        let diagonal = (board.pieces(PieceKind::Bishop) | queens) & ours;
        (rook_attacks(king, occupied) & orthogonal).is_nonempty()
            || (bishop_attacks(king, occupied) & diagonal).is_nonempty()
    }

    /// Return `true` if the position is drawn by the fifty-move rule or by
    /// repeating any earlier position since the last irreversible move.
    pub fn is_draw(&self) -> bool {
        let board = self.board();
        if board.halfmove_clock() > 99 && (!board.in_check() || !self.legal_moves().is_empty()) {
            return true;
        }

        let end = usize::from(board.halfmove_clock().min(self.plies_from_null()));
        if end < 4 {
            return false;
        }
        let key = board.hash();
        let top = self.states.len() - 1;
        (4..=end)
            .step_by(2)
            .take_while(|&back| back <= top)
            .any(|back| self.states[top - back].board.hash() == key)
    }

    /// Play `mv` and return a guard that takes it back when dropped.
    pub fn play(&mut self, mv: Move) -> MoveGuard<'_> {
        self.push(mv);
        MoveGuard { pos: self }
    }

    /// Pass the turn and return a guard that restores it when dropped.
    pub fn play_null(&mut self) -> MoveGuard<'_> {
        let prev = *self.state();
        trace!(ply = self.game_ply(), "null move");
        self.states.push(StateInfo {
            board: prev.board.make_null_move(),
            last_move: Move::NULL,
            captured: None,
            plies_from_null: 0,
        });
        MoveGuard { pos: self }
    }

    /// Play `mv` permanently, extending the game history.
    pub fn push(&mut self, mv: Move) {
        let prev = *self.state();
        let captured = match mv.kind() {
            MoveKind::EnPassant => Some(PieceKind::Pawn),
            MoveKind::Castling => None,
            _ => prev.board.piece_on(mv.dest()),
        };
        self.states.push(StateInfo {
            board: prev.board.make_move(mv),
            last_move: mv,
            captured,
            plies_from_null: prev.plies_from_null + 1,
        });
    }

    /// Parse a move in UCI notation and check it against the legal moves.
    pub fn parse_move(&self, text: &str) -> Result<Move, MoveError> {
        if !(4..=5).contains(&text.len()) || !text.is_ascii() {
            return Err(MoveError::Malformed { text: text.to_string() });
        }
        self.legal_moves()
            .as_slice()
            .iter()
            .copied()
            .find(|mv| mv.to_uci() == text)
            .ok_or_else(|| MoveError::Illegal {
                text: text.to_string(),
                fen: self.board().to_string(),
            })
    }

    /// Replay a sequence of UCI moves from the current position.
    pub fn apply_uci_moves<'m>(&mut self, moves: impl IntoIterator<Item = &'m str>) -> Result<(), MoveError> {
        for text in moves {
            let mv = self.parse_move(text)?;
            self.push(mv);
        }
        Ok(())
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(fen: &str) -> Result<Position, FenError> {
        Position::from_fen(fen)
    }
}

/// Scoped ownership of one pushed state. Dropping the guard pops it.
pub struct MoveGuard<'a> {
    pos: &'a mut Position,
}

impl Deref for MoveGuard<'_> {
    type Target = Position;

    #[inline]
    fn deref(&self) -> &Position {
        self.pos
    }
}

impl DerefMut for MoveGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Position {
        self.pos
    }
}

impl Drop for MoveGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        debug_assert!(self.pos.states.len() > 1, "move guard popped the root state");
        self.pos.states.pop();
    }
}
