//! Castling rights and the squares castling touches.

use std::fmt;

use crate::bitboard::Bitboard;
use crate::error::FenError;
use crate::types::{Color, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastleSide {
    King,
    Queen,
}

/// Four castling flags: white king side, white queen side, then black.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastleRights(u8);

impl CastleRights {
    pub const NONE: CastleRights = CastleRights(0);
    pub const ALL: CastleRights = CastleRights(0b1111);

    #[inline]
    pub const fn single(color: Color, side: CastleSide) -> CastleRights {
        CastleRights(1 << (color as u8 * 2 + side as u8))
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn has(self, color: Color, side: CastleSide) -> bool {
        self.0 & CastleRights::single(color, side).0 != 0
    }

    #[inline]
    #[must_use]
    pub const fn with(self, color: Color, side: CastleSide) -> CastleRights {
        CastleRights(self.0 | CastleRights::single(color, side).0)
    }

    /// Rights that survive a move touching `sq`, as source or destination.
    #[inline]
    #[must_use]
    pub(crate) fn after_touching(self, sq: Square) -> CastleRights {
        CastleRights(self.0 & LOST_ON[sq.index()])
    }

    pub fn from_fen(field: &str) -> Result<CastleRights, FenError> {
        if field == "-" {
            return Ok(CastleRights::NONE);
        }
        field.chars().try_fold(CastleRights::NONE, |rights, c| {
            let (color, side) = match c {
                'K' => (Color::White, CastleSide::King),
                'Q' => (Color::White, CastleSide::Queen),
                'k' => (Color::Black, CastleSide::King),
                'q' => (Color::Black, CastleSide::Queen),
                _ => return Err(FenError::InvalidCastlingChar { character: c }),
            };
            Ok(rights.with(color, side))
        })
    }
}

impl fmt::Display for CastleRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        for (i, c) in ['K', 'Q', 'k', 'q'].into_iter().enumerate() {
            if self.0 & (1 << i) != 0 {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CastleRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CastleRights({self})")
    }
}

/// Mask of rights kept when a piece leaves or lands on each square.
const LOST_ON: [u8; 64] = {
    let mut mask = [0b1111; 64];
    mask[Square::E1.index()] = 0b1100;
    mask[Square::H1.index()] = 0b1110;
    mask[Square::A1.index()] = 0b1101;
    mask[Square::E8.index()] = 0b0011;
    mask[Square::H8.index()] = 0b1011;
    mask[Square::A8.index()] = 0b0111;
    mask
};

/// Squares of one castling move.
pub(crate) struct CastlePath {
    pub king_from: Square,
    pub king_to: Square,
    pub rook_from: Square,
    pub rook_to: Square,
    /// Squares that must be empty.
    pub empty: Bitboard,
    /// Squares the king crosses, which must not be attacked.
    pub king_walk: [Square; 3],
}

pub(crate) const fn path(color: Color, side: CastleSide) -> CastlePath {
    match (color, side) {
        (Color::White, CastleSide::King) => CastlePath {
            king_from: Square::E1,
            king_to: Square::G1,
            rook_from: Square::H1,
            rook_to: Square::F1,
            empty: Bitboard::new(0x60),
            king_walk: [Square::E1, Square::F1, Square::G1],
        },
        (Color::White, CastleSide::Queen) => CastlePath {
            king_from: Square::E1,
            king_to: Square::C1,
            rook_from: Square::A1,
            rook_to: Square::D1,
            empty: Bitboard::new(0x0E),
            king_walk: [Square::E1, Square::D1, Square::C1],
        },
        (Color::Black, CastleSide::King) => CastlePath {
            king_from: Square::E8,
            king_to: Square::G8,
            rook_from: Square::H8,
            rook_to: Square::F8,
            empty: Bitboard::new(0x60 << 56),
            king_walk: [Square::E8, Square::F8, Square::G8],
        },
        (Color::Black, CastleSide::Queen) => CastlePath {
            king_from: Square::E8,
            king_to: Square::C8,
            rook_from: Square::A8,
            rook_to: Square::D8,
            empty: Bitboard::new(0x0E << 56),
            king_walk: [Square::E8, Square::D8, Square::C8],
        },
    }
}

/// Path of the castling move whose king lands on `king_to`.
pub(crate) fn path_to(king_to: Square) -> Option<CastlePath> {
    let (color, side) = match king_to {
        sq if sq == Square::G1 => (Color::White, CastleSide::King),
        sq if sq == Square::C1 => (Color::White, CastleSide::Queen),
        sq if sq == Square::G8 => (Color::Black, CastleSide::King),
        sq if sq == Square::C8 => (Color::Black, CastleSide::Queen),
        _ => return None,
    };
    Some(path(color, side))
}
