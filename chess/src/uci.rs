//! Long algebraic moves as spoken by UCI engines (`e2e4`, `e7e8q`).

use std::fmt;
use std::str::FromStr;

use crate::types::{PieceKind, Square};

/// Source square, destination square and optional promotion piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LongMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl LongMove {
    pub fn new(from: Square, to: Square, promotion: Option<PieceKind>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }
}

impl fmt::Display for LongMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promo) = self.promotion {
            write!(f, "{}", promo.to_char_lower())?;
        }
        Ok(())
    }
}

impl FromStr for LongMove {
    type Err = LongMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LongMoveError::InvalidMove(s.to_string());
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(invalid());
        }

        let from: Square = s[0..2].parse().map_err(|_| invalid())?;
        let to: Square = s[2..4].parse().map_err(|_| invalid())?;
        let promotion = match s.as_bytes().get(4) {
            None => None,
            Some(b'q') => Some(PieceKind::Queen),
            Some(b'r') => Some(PieceKind::Rook),
            Some(b'b') => Some(PieceKind::Bishop),
            Some(b'n') => Some(PieceKind::Knight),
            Some(_) => return Err(LongMoveError::InvalidPromotion(s.to_string())),
        };

        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LongMoveError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}
