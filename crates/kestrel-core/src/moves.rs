//! Moves packed into 16 bits, and a fixed-capacity list of them.

use std::fmt;
use std::ops::Deref;

use crate::types::{PieceKind, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Normal,
    Promotion,
    EnPassant,
    Castling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionPiece {
    Knight,
    Bishop,
    Rook,
    Queen,
}

impl PromotionPiece {
    pub const ALL: [PromotionPiece; 4] = [
        PromotionPiece::Knight,
        PromotionPiece::Bishop,
        PromotionPiece::Rook,
        PromotionPiece::Queen,
    ];

    pub const fn to_piece_kind(self) -> PieceKind {
        match self {
            PromotionPiece::Knight => PieceKind::Knight,
            PromotionPiece::Bishop => PieceKind::Bishop,
            PromotionPiece::Rook => PieceKind::Rook,
            PromotionPiece::Queen => PieceKind::Queen,
        }
    }

    pub const fn uci_char(self) -> char {
        self.to_piece_kind().fen_char()
    }
}

/// A move: `from` in bits 0-5, `to` in bits 6-11, the promotion piece in
/// bits 12-13 and the [`MoveKind`] in bits 14-15.
///
/// Castling is stored as the king's own two-square step.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move(u16);

impl Move {
    /// a1a1, which no generator produces.
    pub const NULL: Move = Move(0);

    const fn pack(source: Square, dest: Square, promo: u16, kind: MoveKind) -> Move {
        Move(source.index() as u16 | (dest.index() as u16) << 6 | promo << 12 | (kind as u16) << 14)
    }

    #[inline]
    pub const fn new(source: Square, dest: Square) -> Move {
        Move::pack(source, dest, 0, MoveKind::Normal)
    }

    #[inline]
    pub const fn new_promotion(source: Square, dest: Square, piece: PromotionPiece) -> Move {
        Move::pack(source, dest, piece as u16, MoveKind::Promotion)
    }

    #[inline]
    pub const fn new_en_passant(source: Square, dest: Square) -> Move {
        Move::pack(source, dest, 0, MoveKind::EnPassant)
    }

    #[inline]
    pub const fn new_castle(king_from: Square, king_to: Square) -> Move {
        Move::pack(king_from, king_to, 0, MoveKind::Castling)
    }

    #[inline]
    pub const fn source(self) -> Square {
        Square::from_index_unchecked((self.0 & 0x3F) as u8)
    }

    #[inline]
    pub const fn dest(self) -> Square {
        Square::from_index_unchecked((self.0 >> 6 & 0x3F) as u8)
    }

    #[inline]
    pub const fn kind(self) -> MoveKind {
        match self.0 >> 14 {
            0 => MoveKind::Normal,
            1 => MoveKind::Promotion,
            2 => MoveKind::EnPassant,
            _ => MoveKind::Castling,
        }
    }

    /// Promotion piece; knight for moves that do not promote.
    #[inline]
    pub const fn promotion_piece(self) -> PromotionPiece {
        PromotionPiece::ALL[(self.0 >> 12 & 3) as usize]
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        matches!(self.kind(), MoveKind::Promotion)
    }

    #[inline]
    pub const fn is_en_passant(self) -> bool {
        matches!(self.kind(), MoveKind::EnPassant)
    }

    #[inline]
    pub const fn is_castle(self) -> bool {
        matches!(self.kind(), MoveKind::Castling)
    }

    /// True for [`MoveKind::Normal`], captures included.
    #[inline]
    pub const fn is_quiet(self) -> bool {
        matches!(self.kind(), MoveKind::Normal)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Rebuild a move from [`raw`](Move::raw) bits. Legality is not checked.
    #[inline]
    pub const fn from_raw(bits: u16) -> Move {
        Move(bits)
    }

    pub fn to_uci(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("0000");
        }
        write!(f, "{}{}", self.source(), self.dest())?;
        if self.is_promotion() {
            write!(f, "{}", self.promotion_piece().uci_char())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({self}, {:?})", self.kind())
    }
}

const MAX_MOVES: usize = 256;

/// Moves of one position, stored inline.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    len: usize,
}

impl MoveList {
    pub const fn new() -> MoveList {
        MoveList {
            moves: [Move::NULL; MAX_MOVES],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, mv: Move) {
        self.moves[self.len] = mv;
        self.len += 1;
    }

    #[inline]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    /// Keep only the moves `keep` accepts, preserving order.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(Move) -> bool) {
        let mut kept = 0;
        for i in 0..self.len {
            let mv = self.moves[i];
            if keep(mv) {
                self.moves[kept] = mv;
                kept += 1;
            }
        }
        self.len = kept;
    }
}

impl Default for MoveList {
    fn default() -> Self {
        MoveList::new()
    }
}

impl Deref for MoveList {
    type Target = [Move];

    #[inline]
    fn deref(&self) -> &[Move] {
        self.as_slice()
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl fmt::Debug for MoveList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
