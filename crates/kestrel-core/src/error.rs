use thiserror::Error;

use crate::types::Color;

/// A FEN string that cannot be turned into a board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("FEN needs 4 to 6 fields, found {found}")]
    FieldCount { found: usize },
    #[error("piece placement needs 8 ranks, found {found}")]
    RankCount { found: usize },
    #[error("rank {rank} of the placement covers {squares} squares")]
    RankLength { rank: usize, squares: usize },
    #[error("unknown piece '{character}'")]
    InvalidPieceChar { character: char },
    #[error("side to move must be 'w' or 'b', got \"{found}\"")]
    InvalidColor { found: String },
    #[error("unknown castling flag '{character}'")]
    InvalidCastlingChar { character: char },
    #[error("bad en passant square \"{found}\"")]
    InvalidEnPassant { found: String },
    #[error("bad {field} \"{found}\"")]
    InvalidCounter { field: &'static str, found: String },
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// A placement no legal game can reach.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("{color} has {count} kings")]
    KingCount { color: Color, count: u32 },
    #[error("pawn on the first or last rank")]
    PawnOnBackRank,
    #[error("the side not to move is in check")]
    OpponentInCheck,
}

/// A UCI move string that does not apply to a position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("malformed move \"{text}\"")]
    Malformed { text: String },
    #[error("{text} is not legal in {fen}")]
    Illegal { text: String, fen: String },
}
