//! Piece placement plus the state needed to continue the game.

use crate::attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks};
use crate::bitboard::Bitboard;
use crate::castling::{self, CastleRights, CastleSide};
use crate::error::BoardError;
use crate::moves::{Move, MoveKind};
use crate::types::{Color, Piece, PieceKind, Square};
use crate::zobrist;

/// A chess position without history.
///
/// Boards are small and `Copy`; [`make_move`](Board::make_move) returns a new
/// board rather than mutating.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Board {
    pieces: [Bitboard; PieceKind::COUNT],
    sides: [Bitboard; Color::COUNT],
    side_to_move: Color,
    castling: CastleRights,
    /// Set only when an enemy pawn could capture onto it.
    en_passant: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u16,
    hash: u64,
    checkers: Bitboard,
}

impl Board {
    pub(crate) const fn empty() -> Board {
        Board {
            pieces: [Bitboard::EMPTY; PieceKind::COUNT],
            sides: [Bitboard::EMPTY; Color::COUNT],
            side_to_move: Color::White,
            castling: CastleRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
            checkers: Bitboard::EMPTY,
        }
    }

    pub fn starting_position() -> Board {
        crate::fen::STARTING_FEN
            .parse()
            .expect("the starting FEN is well formed")
    }

    /// Add or remove `piece` on `sq`, keeping the key in step.
    #[inline]
    pub(crate) fn toggle(&mut self, piece: Piece, sq: Square) {
        self.pieces[piece.kind().index()] = self.pieces[piece.kind().index()].toggle(sq);
        self.sides[piece.color().index()] = self.sides[piece.color().index()].toggle(sq);
        self.hash ^= zobrist::piece(piece, sq);
    }

    #[inline]
    fn relocate(&mut self, piece: Piece, from: Square, to: Square) {
        self.toggle(piece, from);
        self.toggle(piece, to);
    }

    #[inline]
    pub fn piece_on(&self, sq: Square) -> Option<PieceKind> {
        if !self.occupied().contains(sq) {
            return None;
        }
        PieceKind::ALL.into_iter().find(|kind| self.pieces[kind.index()].contains(sq))
    }

    #[inline]
    pub fn color_on(&self, sq: Square) -> Option<Color> {
        Color::ALL.into_iter().find(|color| self.sides[color.index()].contains(sq))
    }

    #[inline]
    pub fn colored_piece_on(&self, sq: Square) -> Option<Piece> {
        Some(Piece::new(self.piece_on(sq)?, self.color_on(sq)?))
    }

    #[inline]
    pub fn pieces(&self, kind: PieceKind) -> Bitboard {
        self.pieces[kind.index()]
    }

    #[inline]
    pub fn side(&self, color: Color) -> Bitboard {
        self.sides[color.index()]
    }

    #[inline]
    pub fn pieces_of(&self, kind: PieceKind, color: Color) -> Bitboard {
        self.pieces(kind) & self.side(color)
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.sides[0] | self.sides[1]
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.pieces_of(PieceKind::King, color)
            .lsb()
            .expect("a validated board has both kings")
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling(&self) -> CastleRights {
        self.castling
    }

    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    /// Zobrist key of the placement, side to move, castling rights and en passant file.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Enemy pieces giving check to the side to move.
    #[inline]
    pub fn checkers(&self) -> Bitboard {
        self.checkers
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.checkers.is_nonempty()
    }

    /// True if `color` has a piece other than pawns and its king.
    #[inline]
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        (self.side(color) & !(self.pieces(PieceKind::Pawn) | self.pieces(PieceKind::King))).is_nonempty()
    }

    #[inline]
    pub fn piece_count(&self) -> u32 {
        self.occupied().count()
    }

    /// Pieces of both colors attacking `sq`, with sliders seeing through `occupied`.
    pub fn attackers_to(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        let queens = self.pieces(PieceKind::Queen);
        (knight_attacks(sq) & self.pieces(PieceKind::Knight))
            | (king_attacks(sq) & self.pieces(PieceKind::King))
            | (rook_attacks(sq, occupied) & (self.pieces(PieceKind::Rook) | queens))
            | (bishop_attacks(sq, occupied) & (self.pieces(PieceKind::Bishop) | queens))
            | (pawn_attacks(Color::Black, sq) & self.pieces_of(PieceKind::Pawn, Color::White))
            | (pawn_attacks(Color::White, sq) & self.pieces_of(PieceKind::Pawn, Color::Black))
    }

    /// True if any `by` piece attacks `sq` on the current occupancy.
    #[inline]
    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        (self.attackers_to(sq, self.occupied()) & self.side(by)).is_nonempty()
    }

    /// Enemy attackers of the side to move's king.
    fn compute_checkers(&self) -> Bitboard {
        let us = self.side_to_move;
        self.attackers_to(self.king_square(us), self.occupied()) & self.side(!us)
    }

    /// Key built from scratch. Incremental updates must always agree with it.
    pub(crate) fn compute_hash(&self) -> u64 {
        let mut hash = zobrist::side(self.side_to_move) ^ zobrist::castling(self.castling);
        if let Some(ep) = self.en_passant {
            hash ^= zobrist::en_passant(ep);
        }
        for sq in self.occupied() {
            if let Some(piece) = self.colored_piece_on(sq) {
                hash ^= zobrist::piece(piece, sq);
            }
        }
        hash
    }

    /// Drop rights whose king or rook has left its home square.
    pub(crate) fn sanitize_castling(&mut self) {
        for color in Color::ALL {
            for side in [CastleSide::King, CastleSide::Queen] {
                let path = castling::path(color, side);
                let king_home = self.pieces_of(PieceKind::King, color).contains(path.king_from);
                let rook_home = self.pieces_of(PieceKind::Rook, color).contains(path.rook_from);
                if !(king_home && rook_home) {
                    self.castling = self.castling.after_touching(path.rook_from);
                }
            }
        }
    }

    /// Keep an en passant square only if an enemy pawn attacks it.
    fn capturable_en_passant(&self, ep: Square, pawn_color: Color) -> Option<Square> {
        let capturers = pawn_attacks(pawn_color, ep) & self.pieces_of(PieceKind::Pawn, !pawn_color);
        capturers.is_nonempty().then_some(ep)
    }

    /// Finish a board assembled piece by piece: check it and derive the key
    /// and checkers.
    pub(crate) fn finish(&mut self, en_passant: Option<Square>) -> Result<(), BoardError> {
        self.validate()?;
        self.sanitize_castling();
        self.en_passant = en_passant.and_then(|ep| self.capturable_en_passant(ep, !self.side_to_move));
        self.hash = self.compute_hash();
        self.checkers = self.compute_checkers();
        Ok(())
    }

    pub(crate) fn set_side_to_move(&mut self, color: Color) {
        self.side_to_move = color;
    }

    pub(crate) fn set_castling(&mut self, rights: CastleRights) {
        self.castling = rights;
    }

    pub(crate) fn set_clocks(&mut self, halfmove: u16, fullmove: u16) {
        self.halfmove_clock = halfmove;
        self.fullmove_number = fullmove.max(1);
    }

    /// Check the placement could arise in a game.
    pub fn validate(&self) -> Result<(), BoardError> {
        for color in Color::ALL {
            let count = self.pieces_of(PieceKind::King, color).count();
            if count != 1 {
                return Err(BoardError::KingCount { color, count });
            }
        }
        if (self.pieces(PieceKind::Pawn) & (Bitboard::RANK_1 | Bitboard::RANK_8)).is_nonempty() {
            return Err(BoardError::PawnOnBackRank);
        }
        let them = !self.side_to_move;
        if self.is_attacked(self.king_square(them), self.side_to_move) {
            return Err(BoardError::OpponentInCheck);
        }
        Ok(())
    }

    /// The board after `mv`, which must be legal here.
    pub fn make_move(&self, mv: Move) -> Board {
        let us = self.side_to_move;
        let them = !us;
        let (from, to) = (mv.source(), mv.dest());
        let Some(mover) = self.colored_piece_on(from) else {
            debug_assert!(false, "{mv} moves from an empty square");
            return self.make_null_move();
        };

        let mut next = *self;
        if let Some(ep) = self.en_passant {
            next.hash ^= zobrist::en_passant(ep);
            next.en_passant = None;
        }
        next.halfmove_clock += 1;

        match mv.kind() {
            MoveKind::Castling => {
                next.relocate(mover, from, to);
                if let Some(path) = castling::path_to(to) {
                    next.relocate(Piece::new(PieceKind::Rook, us), path.rook_from, path.rook_to);
                }
            }
            MoveKind::EnPassant => {
                if let Some(victim_sq) = to.offset(-us.forward()) {
                    next.toggle(Piece::new(PieceKind::Pawn, them), victim_sq);
                }
                next.relocate(mover, from, to);
                next.halfmove_clock = 0;
            }
            MoveKind::Normal | MoveKind::Promotion => {
                if let Some(victim) = self.colored_piece_on(to) {
                    next.toggle(victim, to);
                    next.halfmove_clock = 0;
                }
                next.toggle(mover, from);
                let landed = if mv.is_promotion() {
                    Piece::new(mv.promotion_piece().to_piece_kind(), us)
                } else {
                    mover
                };
                next.toggle(landed, to);

                if mover.kind() == PieceKind::Pawn {
                    next.halfmove_clock = 0;
                    if from.index().abs_diff(to.index()) == 16 {
                        let skipped = from.offset(us.forward());
                        next.en_passant = skipped.and_then(|ep| next.capturable_en_passant(ep, us));
                        if let Some(ep) = next.en_passant {
                            next.hash ^= zobrist::en_passant(ep);
                        }
                    }
                }
            }
        }

        let rights = self.castling.after_touching(from).after_touching(to);
        if rights != self.castling {
            next.hash ^= zobrist::castling(self.castling) ^ zobrist::castling(rights);
            next.castling = rights;
        }

        next.side_to_move = them;
        next.hash ^= zobrist::side_toggle();
        if us == Color::Black {
            next.fullmove_number += 1;
        }
        next.checkers = next.compute_checkers();
        next
    }

    /// The board with the turn passed. Only valid when not in check.
    pub fn make_null_move(&self) -> Board {
        let mut next = *self;
        if let Some(ep) = next.en_passant.take() {
            next.hash ^= zobrist::en_passant(ep);
        }
        next.side_to_move = !self.side_to_move;
        next.hash ^= zobrist::side_toggle();
        next.halfmove_clock += 1;
        next.checkers = next.compute_checkers();
        next
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Board({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::PromotionPiece;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    #[test]
    fn starting_position_layout() {
        let b = Board::starting_position();
        assert_eq!(b.piece_count(), 32);
        assert_eq!(b.piece_on(Square::E1), Some(PieceKind::King));
        assert_eq!(b.color_on(Square::D8), Some(Color::Black));
        assert_eq!(b.colored_piece_on(Square::G1), Some(Piece::new(PieceKind::Knight, Color::White)));
        assert_eq!(b.piece_on(Square::E4), None);
        assert_eq!(b.king_square(Color::Black), Square::E8);
        assert!(!b.in_check());
        assert!(b.has_non_pawn_material(Color::White));
        assert_eq!(b.hash(), b.compute_hash());
    }

    #[test]
    fn incremental_hash_matches_full_recompute() {
        let moves = [
            Move::new(Square::E2, Square::E4),
            Move::new(Square::D7, Square::D5),
            Move::new(Square::E4, Square::D5),
            Move::new(Square::G8, Square::F6),
            Move::new(Square::F1, Square::B5),
            Move::new(Square::C7, Square::C6),
            Move::new(Square::G1, Square::F3),
            Move::new(Square::C6, Square::B5),
            Move::new_castle(Square::E1, Square::G1),
        ];
        let mut b = Board::starting_position();
        for mv in moves {
            b = b.make_move(mv);
            assert_eq!(b.hash(), b.compute_hash(), "after {mv}");
        }
        assert!(!b.castling().has(Color::White, CastleSide::Queen));
        assert_eq!(b.piece_on(Square::F1), Some(PieceKind::Rook));
        assert_eq!(b.to_string(), "rnbqkb1r/pp2pppp/5n2/1p1P4/8/5N2/PPPP1PPP/RNBQ1RK1 b kq - 1 5");
    }

    #[test]
    fn double_push_sets_en_passant_only_when_capturable() {
        let b = Board::starting_position().make_move(Move::new(Square::E2, Square::E4));
        assert_eq!(b.en_passant(), None);

        let b = board("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1").make_move(Move::new(Square::E2, Square::E4));
        assert_eq!(b.en_passant(), Some(Square::E3));
        assert_eq!(b.hash(), b.compute_hash());

        let taken = b.make_move(Move::new_en_passant(Square::D4, Square::E3));
        assert_eq!(taken.piece_on(Square::E4), None);
        assert_eq!(taken.piece_count(), 3);
        assert_eq!(taken.hash(), taken.compute_hash());
    }

    #[test]
    fn promotion_capture_replaces_the_pawn() {
        let b = board("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let next = b.make_move(Move::new_promotion(Square::A7, Square::B8, PromotionPiece::Queen));
        assert_eq!(next.colored_piece_on(Square::B8), Some(Piece::new(PieceKind::Queen, Color::White)));
        assert_eq!(next.pieces(PieceKind::Pawn), Bitboard::EMPTY);
        assert!(next.in_check());
        assert_eq!(next.halfmove_clock(), 0);
        assert_eq!(next.hash(), next.compute_hash());
    }

    #[test]
    fn null_move_flips_the_turn() {
        let b = Board::starting_position();
        let n = b.make_null_move();
        assert_eq!(n.side_to_move(), Color::Black);
        assert_ne!(n.hash(), b.hash());
        assert_eq!(n.make_null_move().hash(), b.hash());
    }

    #[test]
    fn validation_rejects_impossible_boards() {
        assert_eq!(
            "8/8/8/8/8/8/8/4K3 w - - 0 1".parse::<Board>().map(|_| ()),
            Err(crate::FenError::Board(BoardError::KingCount { color: Color::Black, count: 0 }))
        );
        assert!("4k2P/8/8/8/8/8/8/4K3 w - - 0 1".parse::<Board>().is_err());
        assert!("4k3/8/8/8/8/8/8/4K2r b - - 0 1".parse::<Board>().is_err());
    }

    #[test]
    fn rights_without_rook_are_dropped() {
        let b = board("4k3/8/8/8/8/8/8/4K2R w KQ - 0 1");
        assert_eq!(b.castling().to_string(), "K");
    }
}
