use crate::board::Board;
use crate::types::{PieceColor, PieceKind, Square};

/// FEN of the standard starting position.
pub const STANDARD_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board.
///
/// Only piece placement and the active color are kept. Castling rights and
/// the en-passant square are derived from occupancy during move generation.
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let fen = fen.trim();
    if fen == STANDARD_FEN {
        return Ok(Board::standard());
    }

    let fields: Vec<&str> = fen.split(' ').collect();
    if fields.len() != 6 {
        return Err(FenError::InvalidFen(format!(
            "expected 6 fields, found {}",
            fields.len()
        )));
    }

    let ranks: Vec<&str> = fields[0].split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::InvalidFen(format!(
            "expected 8 ranks, found {}",
            ranks.len()
        )));
    }

    let turn = match fields[1] {
        "w" => PieceColor::White,
        "b" => PieceColor::Black,
        other => {
            return Err(FenError::InvalidFen(format!("bad active color '{}'", other)));
        }
    };

    let mut board = Board::empty(turn);
    for (idx, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - idx as u8;
        let mut file = 0u8;
        for c in rank_str.chars() {
            if let Some(skip) = c.to_digit(10) {
                if !(1..=8).contains(&skip) {
                    return Err(FenError::InvalidFen(format!("bad empty-square count '{}'", c)));
                }
                file = file
                    .checked_add(skip as u8)
                    .filter(|f| *f <= 8)
                    .ok_or_else(|| FenError::InvalidFen(format!("rank '{}' overflows", rank_str)))?;
                continue;
            }
            let kind = PieceKind::from_char(c)
                .ok_or_else(|| FenError::InvalidFen(format!("bad piece letter '{}'", c)))?;
            let color = if c.is_ascii_uppercase() {
                PieceColor::White
            } else {
                PieceColor::Black
            };
            let sq = Square::new(file, rank)
                .ok_or_else(|| FenError::InvalidFen(format!("rank '{}' overflows", rank_str)))?;
            board.place(kind, color, sq);
            file += 1;
        }
        if file > 8 {
            return Err(FenError::InvalidFen(format!("rank '{}' overflows", rank_str)));
        }
    }

    Ok(board)
}

/// Format a Board as a FEN string. Castling, en-passant and move counters
/// are not tracked and render as `- - 0 1`.
pub fn format_fen(board: &Board) -> String {
    let mut placement = String::new();
    for rank in (0..8u8).rev() {
        let mut empty = 0;
        for file in 0..8u8 {
            match Square::new(file, rank).and_then(|sq| board.piece_at(sq)) {
                Some(piece) => {
                    if empty > 0 {
                        placement.push_str(&empty.to_string());
                        empty = 0;
                    }
                    placement.push(piece.fen_char());
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            placement.push_str(&empty.to_string());
        }
        if rank > 0 {
            placement.push('/');
        }
    }

    let turn = match board.turn() {
        PieceColor::White => 'w',
        PieceColor::Black => 'b',
    };
    format!("{} {} - - 0 1", placement, turn)
}

/// Active color of a FEN string without decoding the placement.
pub fn fen_turn(fen: &str) -> Option<PieceColor> {
    match fen.split_whitespace().nth(1)? {
        "w" => Some(PieceColor::White),
        "b" => Some(PieceColor::Black),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Piece;
    use proptest::prelude::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_rank_overflow_is_rejected() {
        let long_rank = format!("{}/8/8/8/8/8/8/8 w - - 0 1", "9".repeat(30));
        assert!(matches!(parse_fen(&long_rank), Err(FenError::InvalidFen(_))));
        let many_eights = format!("{}/8/8/8/8/8/8/8 w - - 0 1", "8".repeat(40));
        assert!(matches!(parse_fen(&many_eights), Err(FenError::InvalidFen(_))));
        assert!(parse_fen("44/8/8/8/8/8/8/8 w - - 0 1").is_ok());
        assert!(parse_fen("0/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(parse_fen("9/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(parse_fen("7pp/8/8/8/8/8/8/8 w - - 0 1").is_err());
    }

    #[test]
    fn test_standard_fen_shortcut() {
        let board = parse_fen(STANDARD_FEN).unwrap();
        assert_eq!(board, Board::standard());
        assert_eq!(board.len(), 32);
        assert_eq!(board.turn(), PieceColor::White);
    }

    #[test]
    fn test_general_parse_matches_standard_board() {
        // Same placement, different counters: goes through the general path.
        let board = parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 2").unwrap();
        assert_eq!(board, Board::standard());
    }

    #[test]
    fn test_parse_black_to_move() {
        let board = parse_fen("4k3/8/8/3pP3/8/8/8/4K3 b - d6 0 1").unwrap();
        assert_eq!(board.turn(), PieceColor::Black);
        assert_eq!(board.len(), 4);
        assert_eq!(
            board.piece_at(sq("d5")),
            Some(&Piece::new(PieceKind::Pawn, PieceColor::Black, sq("d5")))
        );
        assert_eq!(
            board.piece_at(sq("e5")),
            Some(&Piece::new(PieceKind::Pawn, PieceColor::White, sq("e5")))
        );
    }

    #[test]
    fn test_wrong_field_count() {
        assert!(matches!(
            parse_fen("8/8/8/8/8/8/8/8 w - -"),
            Err(FenError::InvalidFen(_))
        ));
        assert!(parse_fen("").is_err());
    }

    #[test]
    fn test_wrong_rank_count() {
        assert!(matches!(
            parse_fen("8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::InvalidFen(_))
        ));
    }

    #[test]
    fn test_bad_piece_letter() {
        assert!(parse_fen("8/8/8/8/8/8/8/7x w - - 0 1").is_err());
    }

    #[test]
    fn test_rank_overflow() {
        assert!(parse_fen("9/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(parse_fen("ppppppppp/8/8/8/8/8/8/8 w - - 0 1").is_err());
    }

    #[test]
    fn test_format_standard() {
        assert_eq!(
            format_fen(&Board::standard()),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1"
        );
    }

    #[test]
    fn test_fen_turn() {
        assert_eq!(fen_turn(STANDARD_FEN), Some(PieceColor::White));
        assert_eq!(fen_turn("8/8/8/8/8/8/8/8 b - - 0 1"), Some(PieceColor::Black));
        assert_eq!(fen_turn("garbage"), None);
    }

    fn arb_board() -> impl Strategy<Value = Board> {
        let cell = prop_oneof![
            4 => Just(None),
            1 => (0usize..6, any::<bool>()).prop_map(Some),
        ];
        (prop::collection::vec(cell, 64), any::<bool>()).prop_map(|(cells, white)| {
            let kinds = [
                PieceKind::Pawn,
                PieceKind::Knight,
                PieceKind::Bishop,
                PieceKind::Rook,
                PieceKind::Queen,
                PieceKind::King,
            ];
            let turn = if white {
                PieceColor::White
            } else {
                PieceColor::Black
            };
            let mut board = Board::empty(turn);
            for (sq, cell) in Square::all().zip(cells) {
                if let Some((kind, is_white)) = cell {
                    let color = if is_white {
                        PieceColor::White
                    } else {
                        PieceColor::Black
                    };
                    board.place(kinds[kind], color, sq);
                }
            }
            board
        })
    }

    proptest! {
        #[test]
        fn prop_format_then_parse_is_identity(board in arb_board()) {
            let fen = format_fen(&board);
            let parsed = parse_fen(&fen).unwrap();
            prop_assert_eq!(parsed, board);
        }
    }
}
