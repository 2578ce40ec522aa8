//! Material values, phase weights and piece-square tables.
//!
//! Square tables are written for White, rank 1 first, and cover files a-d;
//! files e-h mirror them. Black looks up the vertically flipped square.

use kestrel_core::{Color, PieceKind, Square};

use super::score::{S, Score};

/// Material by [`PieceKind::index`].
pub const MATERIAL: [Score; PieceKind::COUNT] = [
    S(100, 120),
    S(320, 310),
    S(330, 320),
    S(500, 520),
    S(900, 950),
    S(0, 0),
];

pub const BISHOP_PAIR: Score = S(40, 60);

/// Phase contributed by each piece kind; pawns and kings count nothing.
pub const PHASE_WEIGHT: [i32; PieceKind::COUNT] = [0, 1, 1, 2, 4, 0];

/// Phase of the full starting material.
pub const MAX_PHASE: i32 = 24;

type HalfTable = [[Score; 4]; 8];

#[rustfmt::skip]
const PAWN: HalfTable = [
    [S(0, 0),     S(0, 0),     S(0, 0),     S(0, 0)],
    [S(0, -5),    S(5, -5),    S(5, -5),    S(-15, -5)],
    [S(0, 0),     S(0, 0),     S(-5, 0),    S(5, 0)],
    [S(0, 5),     S(0, 5),     S(5, 5),     S(20, 10)],
    [S(5, 15),    S(5, 15),    S(10, 15),   S(25, 20)],
    [S(10, 40),   S(15, 40),   S(20, 40),   S(30, 40)],
    [S(60, 110),  S(60, 110),  S(60, 110),  S(60, 110)],
    [S(0, 0),     S(0, 0),     S(0, 0),     S(0, 0)],
];

#[rustfmt::skip]
const KNIGHT: HalfTable = [
    [S(-45, -40), S(-30, -30), S(-25, -20), S(-20, -15)],
    [S(-30, -30), S(-15, -15), S(0, -5),    S(5, 0)],
    [S(-25, -20), S(5, -5),    S(10, 5),    S(15, 10)],
    [S(-20, -15), S(0, 0),     S(15, 10),   S(20, 15)],
    [S(-20, -15), S(5, 0),     S(15, 10),   S(20, 15)],
    [S(-25, -20), S(0, -5),    S(10, 5),    S(15, 10)],
    [S(-30, -30), S(-15, -15), S(0, -5),    S(0, 0)],
    [S(-45, -40), S(-30, -30), S(-25, -20), S(-20, -15)],
];

#[rustfmt::skip]
const BISHOP: HalfTable = [
    [S(-15, -15), S(-10, -10), S(-10, -10), S(-10, -5)],
    [S(-5, -10),  S(10, -5),   S(0, 0),     S(5, 0)],
    [S(-5, -5),   S(5, 0),     S(5, 5),     S(5, 5)],
    [S(-5, -5),   S(5, 0),     S(10, 5),    S(10, 10)],
    [S(-5, -5),   S(0, 0),     S(10, 5),    S(10, 10)],
    [S(-5, -5),   S(5, 0),     S(5, 5),     S(5, 5)],
    [S(-5, -10),  S(0, -5),    S(0, 0),     S(0, 0)],
    [S(-15, -15), S(-10, -10), S(-10, -10), S(-10, -5)],
];

#[rustfmt::skip]
const ROOK: HalfTable = [
    [S(-5, 0),    S(0, 0),     S(5, 0),     S(10, 0)],
    [S(-10, 0),   S(0, 0),     S(0, 0),     S(0, 0)],
    [S(-10, 0),   S(0, 0),     S(0, 0),     S(0, 0)],
    [S(-10, 0),   S(0, 0),     S(0, 0),     S(0, 0)],
    [S(-5, 0),    S(0, 0),     S(0, 0),     S(0, 0)],
    [S(-5, 5),    S(0, 5),     S(0, 5),     S(0, 5)],
    [S(10, 10),   S(15, 10),   S(15, 10),   S(15, 10)],
    [S(0, 5),     S(0, 5),     S(0, 5),     S(0, 5)],
];

#[rustfmt::skip]
const QUEEN: HalfTable = [
    [S(-15, -20), S(-10, -10), S(-5, -10),  S(0, -5)],
    [S(-10, -10), S(0, -5),    S(5, 0),     S(0, 0)],
    [S(-5, -5),   S(5, 0),     S(5, 5),     S(5, 5)],
    [S(0, -5),    S(0, 5),     S(5, 10),    S(5, 10)],
    [S(-5, -5),   S(0, 5),     S(5, 10),    S(5, 10)],
    [S(-5, -5),   S(0, 0),     S(5, 5),     S(5, 5)],
    [S(-10, -10), S(-5, -5),   S(0, 0),     S(0, 0)],
    [S(-15, -20), S(-10, -10), S(-5, -10),  S(0, -5)],
];

#[rustfmt::skip]
const KING: HalfTable = [
    [S(25, -40),  S(35, -25),  S(10, -15),  S(-5, -10)],
    [S(15, -20),  S(15, -10),  S(-5, 0),    S(-10, 5)],
    [S(-15, -10), S(-25, 5),   S(-30, 10),  S(-35, 15)],
    [S(-30, -5),  S(-35, 10),  S(-40, 20),  S(-45, 25)],
    [S(-40, -5),  S(-45, 15),  S(-50, 25),  S(-55, 30)],
    [S(-45, -10), S(-50, 10),  S(-55, 20),  S(-60, 25)],
    [S(-50, -20), S(-55, 0),   S(-60, 5),   S(-65, 10)],
    [S(-55, -40), S(-60, -20), S(-65, -10), S(-70, -5)],
];

const SQUARE_TABLES: [HalfTable; PieceKind::COUNT] = [PAWN, KNIGHT, BISHOP, ROOK, QUEEN, KING];

/// Square bonus of a `color` piece of `kind` standing on `sq`.
#[inline]
pub fn square_bonus(kind: PieceKind, color: Color, sq: Square) -> Score {
    let idx = match color {
        Color::White => sq.index(),
        Color::Black => sq.index() ^ 56,
    };
    let file = idx % 8;
    SQUARE_TABLES[kind.index()][idx / 8][file.min(7 - file)]
}
