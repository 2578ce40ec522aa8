//! Sets of squares packed into a `u64`.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, Shr};

use crate::types::{Color, Square};

/// A set of squares, bit `i` standing for the square with index `i`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bitboard(u64);

impl Bitboard {
    pub const EMPTY: Bitboard = Bitboard(0);
    pub const FULL: Bitboard = Bitboard(!0);

    pub const FILE_A: Bitboard = Bitboard(0x0101_0101_0101_0101);
    pub const FILE_H: Bitboard = Bitboard(0x8080_8080_8080_8080);
    pub const RANK_1: Bitboard = Bitboard(0xFF);
    pub const RANK_8: Bitboard = Bitboard(0xFF << 56);

    /// Rank `r` (0 = first rank) as a set.
    #[inline]
    pub const fn rank(r: usize) -> Bitboard {
        Bitboard(0xFF << (8 * r))
    }

    /// File `f` (0 = a-file) as a set.
    #[inline]
    pub const fn file(f: usize) -> Bitboard {
        Bitboard(Self::FILE_A.0 << f)
    }

    /// The rank `relative` steps from `color`'s own back rank.
    #[inline]
    pub const fn relative_rank(color: Color, relative: usize) -> Bitboard {
        match color {
            Color::White => Self::rank(relative),
            Color::Black => Self::rank(7 - relative),
        }
    }

    #[inline]
    pub const fn new(bits: u64) -> Bitboard {
        Bitboard(bits)
    }

    #[inline]
    pub const fn inner(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_nonempty(self) -> bool {
        self.0 != 0
    }

    /// True if more than one square is set.
    #[inline]
    pub const fn has_many(self) -> bool {
        self.0 & self.0.wrapping_sub(1) != 0
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub const fn contains(self, sq: Square) -> bool {
        self.0 & sq.bitboard().0 != 0
    }

    #[inline]
    #[must_use]
    pub const fn with(self, sq: Square) -> Bitboard {
        Bitboard(self.0 | sq.bitboard().0)
    }

    #[inline]
    #[must_use]
    pub const fn without(self, sq: Square) -> Bitboard {
        Bitboard(self.0 & !sq.bitboard().0)
    }

    #[inline]
    #[must_use]
    pub const fn toggle(self, sq: Square) -> Bitboard {
        Bitboard(self.0 ^ sq.bitboard().0)
    }

    /// Lowest set square.
    #[inline]
    pub const fn lsb(self) -> Option<Square> {
        if self.0 == 0 {
            None
        } else {
            Some(Square::from_index_unchecked(self.0.trailing_zeros() as u8))
        }
    }

    /// Remove and return the lowest set square.
    #[inline]
    pub fn pop_lsb(&mut self) -> Option<Square> {
        let sq = self.lsb()?;
        self.0 &= self.0 - 1;
        Some(sq)
    }

    /// Shift every square one rank toward `color`'s promotion rank.
    #[inline]
    pub const fn forward(self, color: Color) -> Bitboard {
        match color {
            Color::White => Bitboard(self.0 << 8),
            Color::Black => Bitboard(self.0 >> 8),
        }
    }
}

impl Iterator for Bitboard {
    type Item = Square;

    #[inline]
    fn next(&mut self) -> Option<Square> {
        self.pop_lsb()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.count() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Bitboard {}

macro_rules! bit_ops {
    ($($op:ident, $method:ident, $assign:ident, $assign_method:ident, $sym:tt;)+) => {
        $(
            impl $op for Bitboard {
                type Output = Bitboard;

                #[inline]
                fn $method(self, rhs: Bitboard) -> Bitboard {
                    Bitboard(self.0 $sym rhs.0)
                }
            }

            impl $assign for Bitboard {
                #[inline]
                fn $assign_method(&mut self, rhs: Bitboard) {
                    self.0 = self.0 $sym rhs.0;
                }
            }
        )+
    };
}

bit_ops! {
    BitAnd, bitand, BitAndAssign, bitand_assign, &;
    BitOr, bitor, BitOrAssign, bitor_assign, |;
    BitXor, bitxor, BitXorAssign, bitxor_assign, ^;
}

impl Not for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn not(self) -> Bitboard {
        Bitboard(!self.0)
    }
}

impl Shl<u8> for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn shl(self, n: u8) -> Bitboard {
        Bitboard(self.0 << n)
    }
}

impl Shr<u8> for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn shr(self, n: u8) -> Bitboard {
        Bitboard(self.0 >> n)
    }
}

impl fmt::Debug for Bitboard {
    /// Eight lines from rank 8 down, `x` for members.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bitboard({:#018x})", self.0)?;
        for rank in (0..8).rev() {
            let row: String = (0..8)
                .map(|file| if self.0 >> (rank * 8 + file) & 1 == 1 { 'x' } else { '.' })
                .collect();
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}
