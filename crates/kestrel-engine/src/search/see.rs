//! Static exchange evaluation.
//!
//! Plays out the capture sequence on one square with both sides always
//! recapturing with their least valuable attacker, and either side free to
//! stop when continuing would lose material.

use kestrel_core::{Bitboard, Board, Color, Move, MoveKind, PieceKind, Square, bishop_attacks, rook_attacks};

use super::value::Value;

/// Exchange values indexed by [`PieceKind::index`].
pub const PIECE_VALUE: [Value; PieceKind::COUNT] = [100, 320, 330, 500, 900, 20_000];

#[inline]
pub fn piece_value(kind: PieceKind) -> Value {
    PIECE_VALUE[kind.index()]
}

fn least_valuable(board: &Board, attackers: Bitboard, color: Color) -> Option<(Square, PieceKind)> {
    let ours = attackers & board.side(color);
    PieceKind::ALL
        .into_iter()
        .find_map(|kind| (ours & board.pieces(kind)).lsb().map(|sq| (sq, kind)))
}

/// Material balance of `mv` for the side owning the moving piece.
///
/// The mover is taken from the board, not the side to move, so a move of the
/// opponent's piece can be evaluated too. Castling always scores zero.
pub fn see(board: &Board, mv: Move) -> Value {
    if mv.is_castle() {
        return 0;
    }
    let from = mv.source();
    let to = mv.dest();
    let Some(mover_kind) = board.piece_on(from) else {
        return 0;
    };
    let mover = board.color_on(from).unwrap_or(board.side_to_move());

    let mut occ = board.occupied().without(from);
    let first_victim = if mv.kind() == MoveKind::EnPassant {
        let captured = match mover {
            Color::White => Square::from_index(to.index() as u8 - 8),
            Color::Black => Square::from_index(to.index() as u8 + 8),
        };
        if let Some(sq) = captured {
            occ = occ.without(sq);
        }
        piece_value(PieceKind::Pawn)
    } else {
        board.piece_on(to).map_or(0, piece_value)
    };

    // Piece left standing on the target square after the first capture.
    let mut on_target = if mv.is_promotion() {
        piece_value(mv.promotion_piece().to_piece_kind())
    } else {
        piece_value(mover_kind)
    };

    let mut gain = [0 as Value; 32];
    let mut depth = 0;
    gain[0] = if mv.is_promotion() {
        first_victim + on_target - piece_value(PieceKind::Pawn)
    } else {
        first_victim
    };

    let diagonal = board.pieces(PieceKind::Bishop) | board.pieces(PieceKind::Queen);
    let straight = board.pieces(PieceKind::Rook) | board.pieces(PieceKind::Queen);
    let mut attackers = board.attackers_to(to, occ) & occ;
    let mut side = !mover;

    while let Some((sq, kind)) = least_valuable(board, attackers, side) {
        if depth + 1 == gain.len() {
            break;
        }
        depth += 1;
        gain[depth] = on_target - gain[depth - 1];
        on_target = piece_value(kind);

        occ = occ.without(sq);
        if matches!(kind, PieceKind::Pawn | PieceKind::Bishop | PieceKind::Queen) {
            attackers |= bishop_attacks(to, occ) & diagonal;
        }
        if matches!(kind, PieceKind::Rook | PieceKind::Queen) {
            attackers |= rook_attacks(to, occ) & straight;
        }
        attackers &= occ;
        side = !side;
    }

    while depth > 0 {
        depth -= 1;
        gain[depth] = -(-gain[depth]).max(gain[depth + 1]);
    }
    gain[0]
}

/// True if the exchange started by `mv` nets at least `threshold`.
pub fn see_ge(board: &Board, mv: Move, threshold: Value) -> bool {
    // Capturing something at least as valuable as the capturer cannot go
    // below zero.
    if threshold <= 0 && !mv.is_castle() && !mv.is_promotion() {
        if let (Some(mover), Some(victim)) = (board.piece_on(mv.source()), board.piece_on(mv.dest())) {
            if piece_value(victim) >= piece_value(mover) {
                return true;
            }
        }
    }
    see(board, mv) >= threshold
}

#[cfg(test)]
mod tests {
    use kestrel_core::{Position, Square};

    use super::*;

    fn board(fen: &str) -> Board {
        fen.parse().expect("valid FEN")
    }

    fn find(board: &Board, uci: &str) -> Move {
        Position::new(*board).parse_move(uci).expect("legal move")
    }

    #[test]
    fn pawn_takes_undefended_knight() {
        let b = board("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1");
        assert_eq!(see(&b, find(&b, "e4d5")), 320);
    }

    #[test]
    fn pawn_takes_defended_knight() {
        let b = board("4k3/8/4p3/3n4/4P3/8/8/4K3 w - - 0 1");
        assert_eq!(see(&b, find(&b, "e4d5")), 220);
    }

    #[test]
    fn queen_takes_defended_pawn_loses() {
        let b = board("4k3/8/3p4/2p5/8/4Q3/8/4K3 w - - 0 1");
        assert_eq!(see(&b, find(&b, "e3c5")), 100 - 900);
    }

    #[test]
    fn xray_rook_backs_up_capture() {
        // Rooks doubled on the d-file against a single defender.
        let b = board("3rk3/8/8/3p4/8/8/3R4/3RK3 w - - 0 1");
        assert_eq!(see(&b, find(&b, "d2d5")), 100);
    }

    #[test]
    fn castling_is_neutral() {
        let b = board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(see(&b, find(&b, "e1g1")), 0);
    }

    #[test]
    fn reversed_move_uses_piece_owner() {
        // After ...Nf6 the knight on f6 considers stepping back to g8, which
        // is covered by the white rook: the exchange loses the knight.
        let b = board("4k1n1/6R1/8/8/8/8/8/4K3 b - - 0 1");
        let back = find(&b, "g8f6");
        let mut pos = Position::new(b);
        let child = pos.play(back);
        let reversed = Move::new(Square::F6, Square::G8);
        assert_eq!(see(child.board(), reversed), -320);
    }

    #[test]
    fn promotion_counts_the_new_piece() {
        let b = board("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(see(&b, find(&b, "a7a8q")), 800);
        assert_eq!(see(&b, find(&b, "a7a8n")), 220);
        assert!(see_ge(&b, find(&b, "a7a8q"), 800));
    }

    #[test]
    fn recaptured_promotion_keeps_the_rook() {
        // The king takes the new queen back, leaving rook for pawn.
        let b = board("1rk5/P7/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(see(&b, find(&b, "a7b8q")), 400);
    }

    #[test]
    fn see_ge_thresholds() {
        let b = board("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1");
        let mv = find(&b, "e4d5");
        assert!(see_ge(&b, mv, 0));
        assert!(see_ge(&b, mv, 320));
        assert!(!see_ge(&b, mv, 321));

        let losing = board("4k3/8/3p4/2p5/8/4Q3/8/4K3 w - - 0 1");
        assert!(!see_ge(&losing, find(&losing, "e3c5"), 0));
    }
}
