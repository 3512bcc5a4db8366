use crate::board::Board;
use crate::fen::{parse_fen, FenError, STANDARD_FEN};
use crate::movegen::can_reach;
use crate::pgn::san::{format_san, parse_san, Discriminator, SanError, SanTarget};
use crate::types::{Piece, PieceKind, Square};
use crate::uci::LongMove;

const SHORT_CASTLE_FILES: (u8, u8, u8) = (6, 7, 5); // king to, rook from, rook to
const LONG_CASTLE_FILES: (u8, u8, u8) = (2, 0, 3);

impl Board {
    /// Resolve and play one SAN move.
    ///
    /// Returns the successor board and the move in long algebraic form. `self`
    /// is left untouched; the successor owns an independent copy of the
    /// piece map.
    pub fn apply(&self, san: &str) -> Result<(Board, LongMove), MoveError> {
        let intent = parse_san(san)?;
        let mover = self.turn();
        let home = mover.home_rank();

        let target = match intent.target {
            SanTarget::Square(sq) => sq,
            SanTarget::CastleShort => square(SHORT_CASTLE_FILES.0, home)?,
            SanTarget::CastleLong => square(LONG_CASTLE_FILES.0, home)?,
        };

        let source = self.resolve_source(san, intent.piece_kind, intent.discriminator, target)?;
        let piece = *self
            .piece_at(source)
            .ok_or_else(|| MoveError::IllegalMove(san.to_string()))?;

        let mut next = self.clone();
        next.set_turn(mover.opponent());

        // Captures are decided against the predecessor board.
        match self.piece_at(target) {
            Some(occupant) if occupant.color == mover => {
                return Err(MoveError::IllegalMove(san.to_string()));
            }
            Some(_) => {
                next.remove(target);
            }
            None => {
                let diagonal = source.file() != target.file();
                if piece.kind == PieceKind::Pawn && (intent.is_capture || diagonal) {
                    self.capture_en_passant(san, &piece, target, &mut next)?;
                } else if intent.is_capture {
                    return Err(MoveError::InvalidCapture(format!(
                        "{}: nothing to capture on {}",
                        san, target
                    )));
                }
            }
        }

        next.relocate(source, target);
        if let Some(kind) = intent.promotion {
            next.set_kind(target, kind);
        }

        // A castle flag always drags the rook; a bare two-file king step
        // is read as a castle too.
        let file_shift = target.file() as i8 - source.file() as i8;
        let castle = if intent.is_castle_short {
            Some(SHORT_CASTLE_FILES)
        } else if intent.is_castle_long {
            Some(LONG_CASTLE_FILES)
        } else if piece.kind == PieceKind::King && file_shift.abs() == 2 {
            Some(if file_shift > 0 {
                SHORT_CASTLE_FILES
            } else {
                LONG_CASTLE_FILES
            })
        } else {
            None
        };
        if let Some((_, rook_from, rook_to)) = castle {
            let rook_from = square(rook_from, source.rank())?;
            let rook_to = square(rook_to, source.rank())?;
            let rook_ok = self
                .piece_at(rook_from)
                .is_some_and(|p| p.kind == PieceKind::Rook && p.color == mover);
            if !rook_ok {
                return Err(MoveError::IllegalMove(san.to_string()));
            }
            next.relocate(rook_from, rook_to);
        }

        let long = LongMove::new(source, target, intent.promotion);
        let text = long.to_string();
        if !(4..=5).contains(&text.len()) {
            return Err(MoveError::TranslationLength(text));
        }

        tracing::trace!(san, long = %long, "Applied move");
        Ok((next, long))
    }

    /// Play an engine move, returning the successor board and the move in SAN.
    pub fn apply_long(&self, mv: LongMove) -> Result<(Board, String), MoveError> {
        let san = format_san(self, mv)?;
        let (next, resolved) = self.apply(&san)?;
        if resolved != mv {
            return Err(MoveError::IllegalMove(format!(
                "{} resolved to {} instead of {}",
                san, resolved, mv
            )));
        }
        Ok((next, san))
    }

    fn resolve_source(
        &self,
        san: &str,
        kind: PieceKind,
        discriminator: Option<Discriminator>,
        target: Square,
    ) -> Result<Square, MoveError> {
        let mover = self.turn();

        if let Some(Discriminator::Square(sq)) = discriminator {
            let owned = self
                .piece_at(sq)
                .is_some_and(|p| p.color == mover && p.kind == kind);
            return if owned {
                Ok(sq)
            } else {
                Err(MoveError::IllegalMove(san.to_string()))
            };
        }

        self.pieces_of(mover, kind)
            .filter(|p| discriminator.is_none_or(|d| d.matches(p.square)))
            .find(|p| can_reach(self, p, target))
            .map(|p| p.square)
            .ok_or_else(|| MoveError::IllegalMove(san.to_string()))
    }

    fn capture_en_passant(
        &self,
        san: &str,
        pawn: &Piece,
        target: Square,
        next: &mut Board,
    ) -> Result<(), MoveError> {
        if pawn.square.rank() != pawn.color.en_passant_rank() {
            return Err(MoveError::InvalidCapture(format!(
                "{}: {} is empty and {} is not an en-passant rank",
                san, target, pawn.square
            )));
        }
        let victim_sq = square(target.file(), pawn.square.rank())?;
        let is_enemy_pawn = self
            .piece_at(victim_sq)
            .is_some_and(|p| p.kind == PieceKind::Pawn && p.color != pawn.color);
        if !is_enemy_pawn {
            return Err(MoveError::InvalidCapture(format!(
                "{}: no pawn to take en passant on {}",
                san, victim_sq
            )));
        }
        next.remove(victim_sq);
        Ok(())
    }
}

fn square(file: u8, rank: u8) -> Result<Square, MoveError> {
    Square::new(file, rank)
        .ok_or_else(|| MoveError::IllegalMove(format!("off-board square {}/{}", file, rank)))
}

/// Translate a principal variation into SAN, threading the board through
/// each move.
pub fn pv_to_san(board: &Board, pv: &[LongMove]) -> Result<Vec<String>, MoveError> {
    let mut current = board.clone();
    let mut sans = Vec::with_capacity(pv.len());
    for mv in pv {
        let (next, san) = current.apply_long(*mv)?;
        sans.push(san);
        current = next;
    }
    Ok(sans)
}

/// Starting position of the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPosition {
    Standard,
    Fen(String),
}

impl StartPosition {
    /// Treats an empty string or the standard FEN as the standard start.
    pub fn from_fen(fen: Option<&str>) -> Self {
        match fen.map(str::trim) {
            None | Some("") => Self::Standard,
            Some(f) if f == STANDARD_FEN => Self::Standard,
            Some(f) => Self::Fen(f.to_string()),
        }
    }

    pub fn fen(&self) -> &str {
        match self {
            Self::Standard => STANDARD_FEN,
            Self::Fen(fen) => fen,
        }
    }

    pub fn board(&self) -> Result<Board, FenError> {
        match self {
            Self::Standard => Ok(Board::standard()),
            Self::Fen(fen) => parse_fen(fen),
        }
    }
}

/// One played move and the position it produced.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub san: String,
    pub long: LongMove,
    pub board_after: Board,
}

/// A start position plus the moves replayed from it.
#[derive(Debug, Clone)]
pub struct Game {
    start_position: StartPosition,
    initial: Board,
    history: Vec<HistoryEntry>,
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self {
            start_position: StartPosition::Standard,
            initial: Board::standard(),
            history: Vec::new(),
        }
    }

    pub fn from_start(start_position: StartPosition) -> Result<Self, GameError> {
        let initial = start_position.board()?;
        Ok(Self {
            start_position,
            initial,
            history: Vec::new(),
        })
    }

    /// Replay space-separated SAN movetext. Stops at the first move that
    /// fails to resolve.
    pub fn replay(start_position: StartPosition, movetext: &str) -> Result<Self, GameError> {
        let mut game = Self::from_start(start_position)?;
        for san in movetext.split_whitespace() {
            game.push_san(san)?;
        }
        Ok(game)
    }

    pub fn start_position(&self) -> &StartPosition {
        &self.start_position
    }

    /// Get the current board position
    pub fn position(&self) -> &Board {
        self.history
            .last()
            .map(|e| &e.board_after)
            .unwrap_or(&self.initial)
    }

    /// Get the move history
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn long_moves(&self) -> Vec<LongMove> {
        self.history.iter().map(|e| e.long).collect()
    }

    /// Resolve and play one SAN move on the current position.
    pub fn push_san(&mut self, san: &str) -> Result<&HistoryEntry, GameError> {
        let ply = self.history.len() + 1;
        let (board_after, long) = self
            .position()
            .apply(san)
            .map_err(|source| GameError::Move {
                ply,
                san: san.to_string(),
                source,
            })?;
        self.history.push(HistoryEntry {
            san: san.to_string(),
            long,
            board_after,
        });
        Ok(&self.history[ply - 1])
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error(transparent)]
    San(#[from] SanError),
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Invalid capture: {0}")]
    InvalidCapture(String),
    #[error("Long algebraic move has invalid length: {0}")]
    TranslationLength(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("FEN parse error: {0}")]
    Fen(#[from] FenError),
    #[error("Move {ply} ({san}): {source}")]
    Move {
        ply: usize,
        san: String,
        #[source]
        source: MoveError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PieceColor;
    use proptest::prelude::*;

    const SCHOLARS_MATE: &str = "e4 e5 Bc4 Nc6 Qh5 Nf6 Qxf7#";
    const OPERA_GAME: &str = "e4 e5 Nf3 d6 d4 Bg4 dxe5 Bxf3 Qxf3 dxe5 Bc4 Nf6 Qb3 Qe7 \
        Nc3 c6 Bg5 b5 Nxb5 cxb5 Bxb5+ Nbd7 O-O-O Rd8 Rxd7 Rxd7 Rd1 Qe6 Bxd7+ Nxd7 \
        Qb8+ Nxb8 Rd8#";

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn piece(kind: PieceKind, color: PieceColor, at: &str) -> Piece {
        Piece::new(kind, color, sq(at))
    }

    fn knight_board() -> Board {
        let mut board = Board::empty(PieceColor::Black);
        board.place(PieceKind::King, PieceColor::Black, sq("e8"));
        board.place(PieceKind::Knight, PieceColor::Black, sq("g8"));
        board.place(PieceKind::Knight, PieceColor::Black, sq("c6"));
        board.place(PieceKind::Bishop, PieceColor::White, sq("b5"));
        board.place(PieceKind::King, PieceColor::White, sq("e1"));
        board
    }

    #[test]
    fn test_apply_resolves_ambiguous_knight() {
        let board = knight_board();
        let (next, long) = board.apply("Ne7").unwrap();

        assert_eq!(long.to_string(), "g8e7");
        assert_eq!(next.turn(), PieceColor::White);
        assert!(next.is_empty_at(sq("g8")));
        assert_eq!(
            next.piece_at(sq("e7")),
            Some(&piece(PieceKind::Knight, PieceColor::Black, "e7"))
        );

        let mut expected = Board::empty(PieceColor::White);
        expected.place(PieceKind::King, PieceColor::Black, sq("e8"));
        expected.place(PieceKind::Knight, PieceColor::Black, sq("e7"));
        expected.place(PieceKind::Knight, PieceColor::Black, sq("c6"));
        expected.place(PieceKind::Bishop, PieceColor::White, sq("b5"));
        expected.place(PieceKind::King, PieceColor::White, sq("e1"));
        assert_eq!(next, expected);
    }

    #[test]
    fn test_apply_with_file_discriminator() {
        let board = knight_board();
        let (_, long) = board.apply("Nce7").unwrap();
        assert_eq!(long.to_string(), "c6e7");
        let (_, long) = board.apply("Nge7").unwrap();
        assert_eq!(long.to_string(), "g8e7");
    }

    #[test]
    fn test_apply_with_square_discriminator() {
        let board = knight_board();
        let (_, long) = board.apply("Nc6e7").unwrap();
        assert_eq!(long.to_string(), "c6e7");
        assert!(matches!(
            board.apply("Nd6e7"),
            Err(MoveError::IllegalMove(_))
        ));
    }

    #[test]
    fn test_predecessor_is_not_mutated() {
        let board = knight_board();
        let snapshot = board.clone();
        let (mut next, _) = board.apply("Ne7").unwrap();
        next.remove(sq("e8"));
        next.place(PieceKind::Queen, PieceColor::White, sq("g8"));
        assert_eq!(board, snapshot);
        assert_eq!(
            board.piece_at(sq("g8")),
            Some(&piece(PieceKind::Knight, PieceColor::Black, "g8"))
        );
    }

    #[test]
    fn test_illegal_move() {
        let board = Board::standard();
        assert!(matches!(board.apply("e5"), Err(MoveError::IllegalMove(_))));
        assert!(matches!(board.apply("Nd4"), Err(MoveError::IllegalMove(_))));
        assert!(matches!(board.apply("O-O"), Err(MoveError::IllegalMove(_))));
    }

    #[test]
    fn test_parse_errors_propagate() {
        let board = Board::standard();
        assert!(matches!(
            board.apply(""),
            Err(MoveError::San(SanError::EmptyMoveText))
        ));
    }

    #[test]
    fn test_capture_marker_on_empty_square_without_en_passant() {
        let mut board = Board::empty(PieceColor::White);
        board.place(PieceKind::King, PieceColor::White, sq("e1"));
        board.place(PieceKind::King, PieceColor::Black, sq("e8"));
        board.place(PieceKind::Pawn, PieceColor::White, sq("e4"));
        assert!(matches!(
            board.apply("exe5"),
            Err(MoveError::InvalidCapture(_))
        ));
        assert!(matches!(
            board.apply("e4xd5"),
            Err(MoveError::InvalidCapture(_))
        ));
    }

    #[test]
    fn test_black_capture_marker_off_en_passant_rank() {
        let board = parse_fen("4k3/8/8/3p4/8/8/8/4K3 b - - 0 1").unwrap();
        assert!(matches!(
            board.apply("dxd4"),
            Err(MoveError::InvalidCapture(_))
        ));
    }

    #[test]
    fn test_piece_capture_marker_on_empty_square() {
        let board = Board::standard();
        assert!(matches!(
            board.apply("Nxf3"),
            Err(MoveError::InvalidCapture(_))
        ));
    }

    #[test]
    fn test_en_passant_capture() {
        let board = parse_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let (next, long) = board.apply("exd6").unwrap();
        assert_eq!(long.to_string(), "e5d6");
        assert!(next.is_empty_at(sq("d5")));
        assert!(next.is_empty_at(sq("e5")));
        assert_eq!(
            next.piece_at(sq("d6")),
            Some(&piece(PieceKind::Pawn, PieceColor::White, "d6"))
        );
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn test_black_en_passant_capture() {
        let board = parse_fen("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1").unwrap();
        let (next, long) = board.apply("dxe3").unwrap();
        assert_eq!(long.to_string(), "d4e3");
        assert!(next.is_empty_at(sq("e4")));
    }

    #[test]
    fn test_en_passant_without_victim() {
        // The pawn on d5 is White's own, so the square behind it is not a capture.
        let board = parse_fen("4k3/8/8/3PP3/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(matches!(
            board.apply("e5xd6"),
            Err(MoveError::InvalidCapture(_))
        ));
    }

    #[test]
    fn test_castling_moves_rook() {
        let board = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let (next, long) = board.apply("O-O").unwrap();
        assert_eq!(long.to_string(), "e1g1");
        assert_eq!(next.piece_at(sq("g1")).map(|p| p.kind), Some(PieceKind::King));
        assert_eq!(next.piece_at(sq("f1")).map(|p| p.kind), Some(PieceKind::Rook));
        assert!(next.is_empty_at(sq("h1")));
        assert!(next.is_empty_at(sq("e1")));

        let (after, long) = next.apply("O-O-O").unwrap();
        assert_eq!(long.to_string(), "e8c8");
        assert_eq!(after.piece_at(sq("c8")).map(|p| p.kind), Some(PieceKind::King));
        assert_eq!(after.piece_at(sq("d8")).map(|p| p.kind), Some(PieceKind::Rook));
        assert!(after.is_empty_at(sq("a8")));
    }

    #[test]
    fn test_castle_flag_moves_rook_from_displaced_king() {
        let board = parse_fen("4k3/8/8/8/8/8/8/5K1R w - - 0 1").unwrap();
        let (next, long) = board.apply("O-O").unwrap();
        assert_eq!(long.to_string(), "f1g1");
        assert_eq!(next.piece_at(sq("g1")).map(|p| p.kind), Some(PieceKind::King));
        assert_eq!(next.piece_at(sq("f1")).map(|p| p.kind), Some(PieceKind::Rook));
        assert!(next.is_empty_at(sq("h1")));
    }

    #[test]
    fn test_king_two_file_step_is_castling() {
        let board = parse_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let (next, long) = board.apply("Kg1").unwrap();
        assert_eq!(long.to_string(), "e1g1");
        assert_eq!(next.piece_at(sq("f1")).map(|p| p.kind), Some(PieceKind::Rook));
    }

    #[test]
    fn test_promotion() {
        let board = parse_fen("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let (next, long) = board.apply("a8=Q+").unwrap();
        assert_eq!(long.to_string(), "a7a8q");
        assert_eq!(
            next.piece_at(sq("a8")),
            Some(&piece(PieceKind::Queen, PieceColor::White, "a8"))
        );

        let (next, long) = board.apply("axb8=N").unwrap();
        assert_eq!(long.to_string(), "a7b8n");
        assert_eq!(next.piece_at(sq("b8")).map(|p| p.kind), Some(PieceKind::Knight));
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn test_capture_removes_occupant() {
        let game = Game::replay(StartPosition::Standard, SCHOLARS_MATE).unwrap();
        let board = game.position();
        assert_eq!(board.len(), 31);
        assert_eq!(
            board.piece_at(sq("f7")),
            Some(&piece(PieceKind::Queen, PieceColor::White, "f7"))
        );
        assert_eq!(board.turn(), PieceColor::Black);
    }

    #[test]
    fn test_replay_long_moves() {
        let game = Game::replay(StartPosition::Standard, SCHOLARS_MATE).unwrap();
        let longs: Vec<String> = game.long_moves().iter().map(|m| m.to_string()).collect();
        assert_eq!(
            longs,
            vec!["e2e4", "e7e5", "f1c4", "b8c6", "d1h5", "g8f6", "h5f7"]
        );
    }

    #[test]
    fn test_replay_reports_failing_ply() {
        let err = Game::replay(StartPosition::Standard, "e4 e5 Ke3").unwrap_err();
        match err {
            GameError::Move { ply, san, .. } => {
                assert_eq!(ply, 3);
                assert_eq!(san, "Ke3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_replay_rejects_bad_fen() {
        let start = StartPosition::Fen("8/8/8 w - - 0 1".to_string());
        assert!(matches!(
            Game::replay(start, "e4"),
            Err(GameError::Fen(_))
        ));
    }

    #[test]
    fn test_opera_game() {
        let game = Game::replay(StartPosition::Standard, OPERA_GAME).unwrap();
        assert_eq!(game.history().len(), 33);
        let castle = &game.history()[22];
        assert_eq!(castle.san, "O-O-O");
        assert_eq!(castle.long.to_string(), "e1c1");
        let last = game.history().last().unwrap();
        assert_eq!(last.long.to_string(), "d1d8");
    }

    #[test]
    fn test_apply_long_round_trip() {
        let board = Board::standard();
        let (next, san) = board.apply_long("g1f3".parse().unwrap()).unwrap();
        assert_eq!(san, "Nf3");
        assert_eq!(next.piece_at(sq("f3")).map(|p| p.kind), Some(PieceKind::Knight));
    }

    #[test]
    fn test_pv_to_san() {
        let board = Board::standard();
        let pv: Vec<LongMove> = ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let sans = pv_to_san(&board, &pv).unwrap();
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
    }

    #[test]
    fn test_pv_to_san_stops_on_bad_move() {
        let board = Board::standard();
        let pv: Vec<LongMove> = ["e2e4", "e2e4"].iter().map(|s| s.parse().unwrap()).collect();
        assert!(pv_to_san(&board, &pv).is_err());
    }

    #[test]
    fn test_start_position_from_fen() {
        assert_eq!(StartPosition::from_fen(None), StartPosition::Standard);
        assert_eq!(StartPosition::from_fen(Some("")), StartPosition::Standard);
        assert_eq!(
            StartPosition::from_fen(Some(STANDARD_FEN)),
            StartPosition::Standard
        );
        let custom = "4k3/8/8/8/8/8/8/4K3 w - - 0 1";
        assert_eq!(
            StartPosition::from_fen(Some(custom)).fen(),
            custom
        );
    }

    #[test]
    fn test_long_moves_are_legal_for_cozy_chess() {
        let game = Game::replay(StartPosition::Standard, OPERA_GAME).unwrap();
        let mut board = cozy_chess::Board::default();
        for entry in game.history() {
            let text = entry.long.to_string();
            let mut mv: cozy_chess::Move = text.parse().unwrap();
            // cozy-chess encodes castling as king-takes-rook.
            let castle_rook = match text.as_str() {
                "e1g1" => Some("h1"),
                "e1c1" => Some("a1"),
                "e8g8" => Some("h8"),
                "e8c8" => Some("a8"),
                _ => None,
            };
            if let Some(rook) = castle_rook {
                if board.piece_on(mv.from) == Some(cozy_chess::Piece::King) {
                    mv.to = rook.parse().unwrap();
                }
            }
            assert!(board.try_play(mv).is_ok(), "cozy-chess rejected {}", text);
        }
    }

    proptest! {
        #[test]
        fn prop_apply_never_aliases_predecessor(prefix in 0usize..33, edits in 1usize..6) {
            let moves: Vec<&str> = OPERA_GAME.split_whitespace().collect();
            let game = Game::replay(
                StartPosition::Standard,
                &moves[..prefix].join(" "),
            ).unwrap();
            let before = game.position().clone();
            let snapshot = before.clone();

            let (mut after, _) = before.apply(moves[prefix]).unwrap();
            let squares: Vec<Square> = after.pieces().map(|p| p.square).take(edits).collect();
            for sq in squares {
                after.remove(sq);
            }
            after.place(PieceKind::Queen, PieceColor::Black, "d4".parse().unwrap());

            prop_assert_eq!(before, snapshot);
        }
    }
}
