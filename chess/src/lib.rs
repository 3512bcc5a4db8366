pub mod analysis;
pub mod board;
pub mod fen;
pub mod game;
pub mod movegen;
pub mod pgn;
pub mod record;
pub mod types;
pub mod uci;

pub use analysis::{AnalysisScore, Continuation};
pub use board::Board;
pub use fen::{format_fen, parse_fen, FenError, STANDARD_FEN};
pub use game::{pv_to_san, Game, GameError, HistoryEntry, MoveError, StartPosition};
pub use pgn::{decode_pgn, encode_annotated_pgn, encode_pgn, MovetextEntry, PgnError};
pub use record::{Clock, GameRecord, Player, RecordError, Winner};
pub use types::{Piece, PieceColor, PieceKind, Square};
pub use uci::{LongMove, LongMoveError};
