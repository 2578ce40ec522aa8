//! Chess rules for kestrel: board representation, legal move generation and
//! the position stack the search walks.

mod attacks;
mod bitboard;
mod board;
mod castling;
mod error;
mod fen;
mod movegen;
mod moves;
mod position;
mod types;
mod zobrist;

pub use attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, queen_attacks, rook_attacks};
pub use bitboard::Bitboard;
pub use board::Board;
pub use castling::{CastleRights, CastleSide};
pub use error::{BoardError, FenError, MoveError};
pub use fen::STARTING_FEN;
pub use movegen::{generate_legal_moves, perft};
pub use moves::{Move, MoveKind, MoveList, PromotionPiece};
pub use position::{MoveGuard, Position};
pub use types::{Color, File, Piece, PieceKind, Rank, Square};
pub use zobrist::EXCLUSION;
