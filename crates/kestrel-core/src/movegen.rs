//! Legal move generation.
//!
//! Moves are generated pseudo-legally, then any move that leaves the mover's
//! king attacked is filtered out. Castling is checked in full while it is
//! generated.

use crate::attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, queen_attacks, rook_attacks};
use crate::bitboard::Bitboard;
use crate::board::Board;
use crate::castling::{self, CastleSide};
use crate::moves::{Move, MoveKind, MoveList, PromotionPiece};
use crate::types::{PieceKind, Square};

/// Every legal move of `board`.
pub fn generate_legal_moves(board: &Board) -> MoveList {
    let mut list = MoveList::new();
    generate_pseudo_legal(board, &mut list);
    list.retain(|mv| keeps_king_safe(board, mv));
    list
}

fn generate_pseudo_legal(board: &Board, list: &mut MoveList) {
    let us = board.side_to_move();
    let occupied = board.occupied();
    let targets = !board.side(us);

    for kind in [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen, PieceKind::King] {
        for from in board.pieces_of(kind, us) {
            let attacks = match kind {
                PieceKind::Knight => knight_attacks(from),
                PieceKind::Bishop => bishop_attacks(from, occupied),
                PieceKind::Rook => rook_attacks(from, occupied),
                PieceKind::Queen => queen_attacks(from, occupied),
                _ => king_attacks(from),
            };
            for to in attacks & targets {
                list.push(Move::new(from, to));
            }
        }
    }

    generate_pawn_moves(board, list);
    generate_castling(board, list);
}

fn push_pawn_move(list: &mut MoveList, from: Square, to: Square, promotes: bool) {
    if promotes {
        for piece in PromotionPiece::ALL.into_iter().rev() {
            list.push(Move::new_promotion(from, to, piece));
        }
    } else {
        list.push(Move::new(from, to));
    }
}

fn generate_pawn_moves(board: &Board, list: &mut MoveList) {
    let us = board.side_to_move();
    let empty = !board.occupied();
    let enemies = board.side(!us);
    let promotion_rank = Bitboard::relative_rank(us, 7);
    let start_rank = Bitboard::relative_rank(us, 1);

    for from in board.pieces_of(PieceKind::Pawn, us) {
        if let Some(to) = from.offset(us.forward()).filter(|&to| empty.contains(to)) {
            push_pawn_move(list, from, to, promotion_rank.contains(to));
            if start_rank.contains(from) {
                if let Some(two) = to.offset(us.forward()).filter(|&two| empty.contains(two)) {
                    list.push(Move::new(from, two));
                }
            }
        }

        let attacks = pawn_attacks(us, from);
        for to in attacks & enemies {
            push_pawn_move(list, from, to, promotion_rank.contains(to));
        }
        if let Some(ep) = board.en_passant().filter(|&ep| attacks.contains(ep)) {
            list.push(Move::new_en_passant(from, ep));
        }
    }
}

fn generate_castling(board: &Board, list: &mut MoveList) {
    let us = board.side_to_move();
    if board.in_check() {
        return;
    }
    for side in [CastleSide::King, CastleSide::Queen] {
        if !board.castling().has(us, side) {
            continue;
        }
        let path = castling::path(us, side);
        if (path.empty & board.occupied()).is_nonempty() {
            continue;
        }
        if path.king_walk[1..].iter().any(|&sq| board.is_attacked(sq, !us)) {
            continue;
        }
        list.push(Move::new_castle(path.king_from, path.king_to));
    }
}

/// True if `mv` does not leave the mover's king attacked.
fn keeps_king_safe(board: &Board, mv: Move) -> bool {
    if mv.kind() == MoveKind::Castling {
        return true;
    }
    let us = board.side_to_move();
    let (from, to) = (mv.source(), mv.dest());

    let mut occupied = board.occupied().without(from).with(to);
    let mut enemies = board.side(!us).without(to);
    if mv.kind() == MoveKind::EnPassant {
        if let Some(victim) = to.offset(-us.forward()) {
            occupied = occupied.without(victim);
            enemies = enemies.without(victim);
        }
    }

    let king = if board.piece_on(from) == Some(PieceKind::King) {
        to
    } else {
        board.king_square(us)
    };
    (board.attackers_to(king, occupied) & enemies).is_empty()
}

/// Count leaf nodes of the legal move tree to `depth`.
pub fn perft(board: &Board, depth: u32) -> u64 {
    let moves = generate_legal_moves(board);
    match depth {
        0 => 1,
        1 => moves.len() as u64,
        _ => moves.iter().map(|&mv| perft(&board.make_move(mv), depth - 1)).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;

    fn count(fen: &str, depth: u32) -> u64 {
        perft(&fen.parse().unwrap(), depth)
    }

    #[test]
    fn perft_start() {
        let start = Board::starting_position();
        assert_eq!(perft(&start, 1), 20);
        assert_eq!(perft(&start, 2), 400);
        assert_eq!(perft(&start, 3), 8_902);
    }

    #[test]
    fn perft_kiwipete() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        assert_eq!(count(fen, 1), 48);
        assert_eq!(count(fen, 2), 2_039);
        assert_eq!(count(fen, 3), 97_862);
    }

    #[test]
    fn perft_rook_endgame() {
        let fen = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
        assert_eq!(count(fen, 1), 14);
        assert_eq!(count(fen, 2), 191);
        assert_eq!(count(fen, 3), 2_812);
        assert_eq!(count(fen, 4), 43_238);
    }

    #[test]
    fn perft_promotions_and_checks() {
        assert_eq!(count("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1", 3), 9_467);
        assert_eq!(count("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8", 2), 1_486);
    }

    #[test]
    fn en_passant_discovering_check_is_illegal() {
        let board: Board = "8/8/8/KPp4r/8/8/8/7k w - c6 0 1".parse().unwrap();
        let moves = generate_legal_moves(&board);
        assert!(!moves.iter().any(|mv| mv.is_en_passant()));
    }

    #[test]
    fn castling_through_attack_is_illegal() {
        // The black bishop covers f1.
        let board: Board = "4k3/8/8/8/8/8/6b1/R3K2R w KQ - 0 1".parse().unwrap();
        let moves = generate_legal_moves(&board);
        assert!(!moves.contains(&Move::new_castle(Square::E1, Square::G1)));
        assert!(moves.contains(&Move::new_castle(Square::E1, Square::C1)));
    }

    #[test]
    fn checkmate_has_no_moves() {
        let board: Board = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3".parse().unwrap();
        assert!(board.in_check());
        assert!(generate_legal_moves(&board).is_empty());
        assert_eq!(board.side_to_move(), Color::White);
    }
}
