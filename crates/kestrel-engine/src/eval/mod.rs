//! Static evaluation: tapered material and piece-square terms.

pub mod score;
pub mod tables;

use kestrel_core::{Board, Color, PieceKind};

use crate::search::value::{VALUE_KNOWN_WIN, Value};

use self::score::Score;
use self::tables::{BISHOP_PAIR, MATERIAL, MAX_PHASE, PHASE_WEIGHT, square_bonus};

/// Bonus for having the move.
pub const TEMPO: Value = 10;

/// Endgame value of a piece, used by quiescence delta pruning.
#[inline]
pub fn endgame_value(kind: PieceKind) -> Value {
    MATERIAL[kind.index()].eg() as Value
}

/// Material and placement of `color`'s pieces, plus the phase they contribute.
fn side_terms(board: &Board, color: Color) -> (Score, i32) {
    let mut score = Score::ZERO;
    let mut phase = 0;
    for kind in PieceKind::ALL {
        let pieces = board.pieces_of(kind, color);
        let count = pieces.count() as i16;
        score += MATERIAL[kind.index()] * count;
        phase += PHASE_WEIGHT[kind.index()] * count as i32;
        for sq in pieces {
            score += square_bonus(kind, color, sq);
        }
    }
    if board.pieces_of(PieceKind::Bishop, color).count() >= 2 {
        score += BISHOP_PAIR;
    }
    (score, phase)
}

/// Evaluate `board` from the side to move's point of view.
///
/// The result never reaches the mate range.
pub fn evaluate(board: &Board) -> Value {
    let (white, white_phase) = side_terms(board, Color::White);
    let (black, black_phase) = side_terms(board, Color::Black);
    let phase = (white_phase + black_phase).min(MAX_PHASE);
    let score = (white - black).taper(phase, MAX_PHASE);
    let relative = match board.side_to_move() {
        Color::White => score,
        Color::Black => -score,
    };
    (relative + TEMPO).clamp(-VALUE_KNOWN_WIN + 1, VALUE_KNOWN_WIN - 1)
}
