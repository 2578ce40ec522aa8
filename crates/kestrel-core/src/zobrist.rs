//! Zobrist keys, generated at compile time from a fixed seed.

use crate::castling::CastleRights;
use crate::types::{Color, Piece, Square};

const fn splitmix(state: u64) -> (u64, u64) {
    let state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (state, z ^ (z >> 31))
}

struct Keys {
    pieces: [[u64; 64]; Piece::COUNT],
    castling: [u64; 16],
    en_passant_file: [u64; 8],
    side: u64,
    exclusion: u64,
}

const fn generate() -> Keys {
    let mut state = 0x4B45_5354_5245_4C00;
    let mut keys = Keys {
        pieces: [[0; 64]; Piece::COUNT],
        castling: [0; 16],
        en_passant_file: [0; 8],
        side: 0,
        exclusion: 0,
    };
    let mut p = 0;
    while p < Piece::COUNT {
        let mut sq = 0;
        while sq < 64 {
            let (next, key) = splitmix(state);
            state = next;
            keys.pieces[p][sq] = key;
            sq += 1;
        }
        p += 1;
    }
    // One key per single right; combined rights XOR their members.
    let mut singles = [0; 4];
    let mut i = 0;
    while i < 4 {
        let (next, key) = splitmix(state);
        state = next;
        singles[i] = key;
        i += 1;
    }
    let mut bits = 0;
    while bits < 16 {
        let mut b = 0;
        while b < 4 {
            if bits & (1 << b) != 0 {
                keys.castling[bits] ^= singles[b];
            }
            b += 1;
        }
        bits += 1;
    }
    let mut f = 0;
    while f < 8 {
        let (next, key) = splitmix(state);
        state = next;
        keys.en_passant_file[f] = key;
        f += 1;
    }
    let (next, side) = splitmix(state);
    keys.side = side;
    keys.exclusion = splitmix(next).1;
    keys
}

static KEYS: Keys = generate();

/// Mixed into a position key while one move is excluded from the search.
pub const EXCLUSION: u64 = generate().exclusion;

#[inline]
pub(crate) fn piece(piece: Piece, sq: Square) -> u64 {
    KEYS.pieces[piece.index()][sq.index()]
}

#[inline]
pub(crate) fn castling(rights: CastleRights) -> u64 {
    KEYS.castling[rights.bits() as usize]
}

#[inline]
pub(crate) fn en_passant(sq: Square) -> u64 {
    KEYS.en_passant_file[sq.file().index()]
}

/// Toggled whenever the side to move changes.
#[inline]
pub(crate) fn side(color: Color) -> u64 {
    match color {
        Color::White => 0,
        Color::Black => KEYS.side,
    }
}

#[inline]
pub(crate) fn side_toggle() -> u64 {
    KEYS.side
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn keys_are_distinct() {
        let mut seen = HashSet::new();
        for p in 0..Piece::COUNT {
            for sq in 0..64 {
                assert!(seen.insert(KEYS.pieces[p][sq]));
            }
        }
        for key in KEYS.en_passant_file {
            assert!(seen.insert(key));
        }
        assert!(seen.insert(KEYS.side));
        assert!(seen.insert(EXCLUSION));
        assert_eq!(KEYS.castling[0], 0);
    }

    #[test]
    fn combined_castling_keys_xor_singles() {
        assert_eq!(KEYS.castling[0b0011], KEYS.castling[0b0001] ^ KEYS.castling[0b0010]);
        assert_eq!(KEYS.castling[0b1111], KEYS.castling[0b0101] ^ KEYS.castling[0b1010]);
    }
}
