//! PGN container: tag pairs plus SAN movetext.

pub mod parser;
pub mod san;
pub mod writer;

pub use parser::{clean_movetext, decode_pgn};
pub use san::{format_san, parse_san, tokenize_san, MoveIntent, SanError};
pub use writer::{encode_annotated_pgn, encode_pgn, MovetextEntry};

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("Malformed PGN: {0}")]
    MalformedInput(String),
}
