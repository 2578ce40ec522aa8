//! Middlegame/endgame score pairs packed into one integer.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A middlegame and an endgame value packed as `(mg << 16) + eg`.
///
/// Addition works on the packed form directly. The endgame half borrows from
/// the middlegame half when negative, so extraction rounds the upper half.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Score(i32);

impl Score {
    pub const ZERO: Score = Score(0);

    #[inline]
    pub const fn new(mg: i16, eg: i16) -> Score {
        Score(((mg as i32) << 16).wrapping_add(eg as i32))
    }

    #[inline]
    pub const fn mg(self) -> i16 {
        (self.0.wrapping_add(0x8000) >> 16) as i16
    }

    #[inline]
    pub const fn eg(self) -> i16 {
        self.0 as i16
    }

    /// Blend the two halves: `phase` of `max_phase` middlegame, the rest endgame.
    #[inline]
    pub const fn taper(self, phase: i32, max_phase: i32) -> i32 {
        (self.mg() as i32 * phase + self.eg() as i32 * (max_phase - phase)) / max_phase
    }
}

/// Shorthand for [`Score::new`], used by the evaluation tables.
#[allow(non_snake_case)]
#[inline]
pub const fn S(mg: i16, eg: i16) -> Score {
    Score::new(mg, eg)
}

macro_rules! packed_op {
    ($op:ident, $method:ident, $assign:ident, $assign_method:ident, $wrapping:ident) => {
        impl $op for Score {
            type Output = Score;

            #[inline]
            fn $method(self, rhs: Score) -> Score {
                Score(self.0.$wrapping(rhs.0))
            }
        }

        impl $assign for Score {
            #[inline]
            fn $assign_method(&mut self, rhs: Score) {
                self.0 = self.0.$wrapping(rhs.0);
            }
        }
    };
}

packed_op!(Add, add, AddAssign, add_assign, wrapping_add);
packed_op!(Sub, sub, SubAssign, sub_assign, wrapping_sub);

impl Neg for Score {
    type Output = Score;

    #[inline]
    fn neg(self) -> Score {
        Score::ZERO - self
    }
}

impl Mul<i16> for Score {
    type Output = Score;

    #[inline]
    fn mul(self, rhs: i16) -> Score {
        Score::new(self.mg() * rhs, self.eg() * rhs)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Score").field(&self.mg()).field(&self.eg()).finish()
    }
}
