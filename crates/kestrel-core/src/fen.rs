//! Forsyth-Edwards Notation in and out of [`Board`].

use std::fmt;
use std::str::FromStr;

use crate::board::Board;
use crate::castling::CastleRights;
use crate::error::FenError;
use crate::types::{Color, File, Piece, Rank, Square};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn parse_placement(board: &mut Board, placement: &str) -> Result<(), FenError> {
    let rows: Vec<&str> = placement.split('/').collect();
    if rows.len() != 8 {
        return Err(FenError::RankCount { found: rows.len() });
    }
    for (row, text) in rows.iter().enumerate() {
        let rank = Rank::ALL[7 - row];
        let mut file = 0usize;
        for c in text.chars() {
            if let Some(skip) = c.to_digit(10).filter(|d| (1..=8).contains(d)) {
                file += skip as usize;
                continue;
            }
            let piece = Piece::from_fen_char(c).ok_or(FenError::InvalidPieceChar { character: c })?;
            if file < 8 {
                board.toggle(piece, Square::new(rank, File::ALL[file]));
            }
            file += 1;
        }
        if file != 8 {
            return Err(FenError::RankLength { rank: 8 - row, squares: file });
        }
    }
    Ok(())
}

fn parse_counter(field: &'static str, text: Option<&str>, default: u16) -> Result<u16, FenError> {
    text.map_or(Ok(default), |t| {
        t.parse().map_err(|_| FenError::InvalidCounter {
            field,
            found: t.to_string(),
        })
    })
}

impl FromStr for Board {
    type Err = FenError;

    /// Parse a FEN record. The two move counters may be left out.
    fn from_str(fen: &str) -> Result<Board, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(FenError::FieldCount { found: fields.len() });
        }

        let mut board = Board::empty();
        parse_placement(&mut board, fields[0])?;

        board.set_side_to_move(match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidColor { found: other.to_string() }),
        });
        board.set_castling(CastleRights::from_fen(fields[2])?);

        let en_passant = match fields[3] {
            "-" => None,
            text => {
                let sq = Square::from_algebraic(text)
                    .filter(|sq| matches!(sq.rank(), Rank::R3 | Rank::R6))
                    .ok_or_else(|| FenError::InvalidEnPassant { found: text.to_string() })?;
                Some(sq)
            }
        };

        let halfmove = parse_counter("halfmove clock", fields.get(4).copied(), 0)?;
        let fullmove = parse_counter("fullmove number", fields.get(5).copied(), 1)?;
        board.set_clocks(halfmove, fullmove);

        board.finish(en_passant)?;
        Ok(board)
    }
}

impl fmt::Display for Board {
    /// Write the board as a six-field FEN record.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rank) in Rank::ALL.into_iter().rev().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            let mut gap = 0;
            for file in File::ALL {
                match self.colored_piece_on(Square::new(rank, file)) {
                    Some(piece) => {
                        if gap > 0 {
                            write!(f, "{gap}")?;
                            gap = 0;
                        }
                        write!(f, "{piece}")?;
                    }
                    None => gap += 1,
                }
            }
            if gap > 0 {
                write!(f, "{gap}")?;
            }
        }
        let side = match self.side_to_move() {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let ep = self.en_passant().map_or_else(|| "-".to_string(), |sq| sq.to_string());
        write!(
            f,
            " {side} {} {ep} {} {}",
            self.castling(),
            self.halfmove_clock(),
            self.fullmove_number()
        )
    }
}
