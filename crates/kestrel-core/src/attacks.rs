//! Attack sets for every piece kind.
//!
//! Leapers use lookup tables. Sliders walk precomputed rays and cut each ray
//! at its first blocker: the nearest blocker is the lowest set bit on rays
//! pointing up the board and the highest on rays pointing down.

use crate::bitboard::Bitboard;
use crate::types::{Color, Square};

/// (file step, rank step) of the eight ray directions. The first four point
/// toward higher square indices.
const DIRECTIONS: [(i8, i8); 8] = [(0, 1), (1, 0), (1, 1), (-1, 1), (0, -1), (-1, 0), (-1, -1), (1, -1)];

const ROOK_DIRS: [usize; 4] = [0, 1, 4, 5];
const BISHOP_DIRS: [usize; 4] = [2, 3, 6, 7];

const KNIGHT_STEPS: [(i8, i8); 8] = [(1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2)];
const KING_STEPS: [(i8, i8); 8] = [(0, 1), (1, 1), (1, 0), (1, -1), (0, -1), (-1, -1), (-1, 0), (-1, 1)];

/// Bit of the square `(file, rank)`, or zero off the board.
const fn bit(file: i8, rank: i8) -> u64 {
    if file >= 0 && file < 8 && rank >= 0 && rank < 8 { 1 << (rank * 8 + file) } else { 0 }
}

const fn leaper_table(steps: &[(i8, i8)]) -> [u64; 64] {
    let mut table = [0; 64];
    let mut sq = 0;
    while sq < 64 {
        let (file, rank) = ((sq % 8) as i8, (sq / 8) as i8);
        let mut i = 0;
        while i < steps.len() {
            table[sq] |= bit(file + steps[i].0, rank + steps[i].1);
            i += 1;
        }
        sq += 1;
    }
    table
}

const fn pawn_table() -> [[u64; 64]; 2] {
    let mut table = [[0; 64]; 2];
    let mut sq = 0;
    while sq < 64 {
        let (file, rank) = ((sq % 8) as i8, (sq / 8) as i8);
        table[0][sq] = bit(file - 1, rank + 1) | bit(file + 1, rank + 1);
        table[1][sq] = bit(file - 1, rank - 1) | bit(file + 1, rank - 1);
        sq += 1;
    }
    table
}

const fn ray_table() -> [[u64; 64]; 8] {
    let mut table = [[0; 64]; 8];
    let mut dir = 0;
    while dir < 8 {
        let (df, dr) = DIRECTIONS[dir];
        let mut sq = 0;
        while sq < 64 {
            let mut file = (sq % 8) as i8 + df;
            let mut rank = (sq / 8) as i8 + dr;
            while bit(file, rank) != 0 {
                table[dir][sq] |= bit(file, rank);
                file += df;
                rank += dr;
            }
            sq += 1;
        }
        dir += 1;
    }
    table
}

static KNIGHT: [u64; 64] = leaper_table(&KNIGHT_STEPS);
static KING: [u64; 64] = leaper_table(&KING_STEPS);
static PAWN: [[u64; 64]; 2] = pawn_table();
static RAYS: [[u64; 64]; 8] = ray_table();

/// Ray from `sq` in direction `dir`, stopping at and including the first blocker.
#[inline]
fn ray_attacks(dir: usize, sq: Square, occupied: Bitboard) -> u64 {
    let ray = RAYS[dir][sq.index()];
    let blockers = ray & occupied.inner();
    if blockers == 0 {
        return ray;
    }
    let first = if dir < 4 {
        blockers.trailing_zeros()
    } else {
        63 - blockers.leading_zeros()
    };
    ray ^ RAYS[dir][first as usize]
}

#[inline]
fn slider_attacks(dirs: &[usize; 4], sq: Square, occupied: Bitboard) -> Bitboard {
    Bitboard::new(dirs.iter().fold(0, |acc, &dir| acc | ray_attacks(dir, sq, occupied)))
}

#[inline]
pub fn knight_attacks(sq: Square) -> Bitboard {
    Bitboard::new(KNIGHT[sq.index()])
}

#[inline]
pub fn king_attacks(sq: Square) -> Bitboard {
    Bitboard::new(KING[sq.index()])
}

/// Squares a `color` pawn on `sq` captures on.
#[inline]
pub fn pawn_attacks(color: Color, sq: Square) -> Bitboard {
    Bitboard::new(PAWN[color.index()][sq.index()])
}

#[inline]
pub fn rook_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    slider_attacks(&ROOK_DIRS, sq, occupied)
}

#[inline]
pub fn bishop_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    slider_attacks(&BISHOP_DIRS, sq, occupied)
}

#[inline]
pub fn queen_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    rook_attacks(sq, occupied) | bishop_attacks(sq, occupied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(squares: &[Square]) -> Bitboard {
        squares.iter().fold(Bitboard::EMPTY, |bb, &sq| bb.with(sq))
    }

    #[test]
    fn leapers_respect_edges() {
        assert_eq!(knight_attacks(Square::A1), set(&[Square::B3, Square::C2]));
        assert_eq!(knight_attacks(Square::E4).count(), 8);
        assert_eq!(king_attacks(Square::H8), set(&[Square::G8, Square::G7, Square::H7]));
        assert_eq!(pawn_attacks(Color::White, Square::A2), set(&[Square::B3]));
        assert_eq!(pawn_attacks(Color::Black, Square::E5), set(&[Square::D4, Square::F4]));
        assert_eq!(pawn_attacks(Color::White, Square::E8), Bitboard::EMPTY);
    }

    #[test]
    fn rook_rays_stop_at_blockers() {
        let occ = set(&[Square::D6, Square::F4, Square::D2]);
        let attacks = rook_attacks(Square::D4, occ);
        assert!(attacks.contains(Square::D6));
        assert!(!attacks.contains(Square::D7));
        assert!(attacks.contains(Square::F4));
        assert!(!attacks.contains(Square::G4));
        assert!(attacks.contains(Square::A4));
        assert!(attacks.contains(Square::D2));
        assert!(!attacks.contains(Square::D1));
        assert_eq!(attacks.count(), 2 + 2 + 3 + 2);
    }

    #[test]
    fn bishop_rays_stop_at_blockers() {
        let occ = set(&[Square::F6, Square::B2]);
        let attacks = bishop_attacks(Square::D4, occ);
        assert!(attacks.contains(Square::F6));
        assert!(!attacks.contains(Square::G7));
        assert!(attacks.contains(Square::B2));
        assert!(!attacks.contains(Square::A1));
        assert!(attacks.contains(Square::A7));
        assert!(attacks.contains(Square::G1));
        assert_eq!(bishop_attacks(Square::A1, Bitboard::EMPTY).count(), 7);
    }

    #[test]
    fn queen_is_rook_plus_bishop() {
        assert_eq!(queen_attacks(Square::D4, Bitboard::EMPTY).count(), 27);
    }
}
