//! Endgame tablebase seam.
//!
//! The search only needs win/draw/loss answers for positions with few pieces.
//! No tablebase ships with the engine; [`NoTablebase`] answers nothing.

use kestrel_core::Position;

/// Win/draw/loss from the side to move's point of view.
///
/// The blessed and cursed variants are results decided only by the 50-move rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum Wdl {
    Loss = -2,
    BlessedLoss = -1,
    Draw = 0,
    CursedWin = 1,
    Win = 2,
}

impl Wdl {
    #[inline]
    pub const fn value(self) -> i32 {
        self as i8 as i32
    }
}

pub trait Tablebase: Send + Sync {
    /// Largest piece count (kings included) the tables cover.
    fn cardinality(&self) -> u32;

    /// Probe `pos`, or `None` if it is not covered or the probe failed.
    fn probe_wdl(&self, pos: &Position) -> Option<Wdl>;
}

/// Tablebase that covers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTablebase;

impl Tablebase for NoTablebase {
    fn cardinality(&self) -> u32 {
        0
    }

    fn probe_wdl(&self, _pos: &Position) -> Option<Wdl> {
        None
    }
}
