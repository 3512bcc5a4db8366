//! Standard Algebraic Notation: tokenizing, parsing into a [`MoveIntent`],
//! and formatting engine moves back into SAN.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::board::Board;
use crate::game::MoveError;
use crate::movegen::can_reach;
use crate::types::{file_index, rank_index, PieceKind, Square};
use crate::uci::LongMove;

const LONG_CASTLE: &str = "O-O-O";
const SHORT_CASTLE: &str = "O-O";
const CAPTURE: &str = "x";
const PROMOTE: &str = "=";
const CHECK: &str = "+";
const MATE: &str = "#";

static SQUARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-h][1-8]$").expect("square pattern compiles"));
static DISCRIMINATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-h]?[1-8]?$").expect("discriminator pattern compiles"));

/// Where a SAN move is going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanTarget {
    Square(Square),
    CastleShort,
    CastleLong,
}

impl fmt::Display for SanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Square(sq) => write!(f, "{}", sq),
            Self::CastleShort => f.write_str(SHORT_CASTLE),
            Self::CastleLong => f.write_str(LONG_CASTLE),
        }
    }
}

/// Partial source square used to pick between pieces that can reach the
/// same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    File(u8),
    Rank(u8),
    Square(Square),
}

impl Discriminator {
    fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(f), Some(r)) => Square::from_chars(f, r).map(Self::Square),
            (Some(c), None) => file_index(c)
                .map(Self::File)
                .or_else(|| rank_index(c).map(Self::Rank)),
            _ => None,
        }
    }

    /// True if `sq`'s name contains this fragment.
    pub fn matches(&self, sq: Square) -> bool {
        match *self {
            Self::File(f) => sq.file() == f,
            Self::Rank(r) => sq.rank() == r,
            Self::Square(s) => sq == s,
        }
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::File(file) => write!(f, "{}", (b'a' + file) as char),
            Self::Rank(rank) => write!(f, "{}", (b'1' + rank) as char),
            Self::Square(sq) => write!(f, "{}", sq),
        }
    }
}

/// A parsed SAN move, before it has been resolved against a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveIntent {
    pub piece_kind: PieceKind,
    pub target: SanTarget,
    pub discriminator: Option<Discriminator>,
    pub is_capture: bool,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_castle_long: bool,
    pub is_castle_short: bool,
    pub promotion: Option<PieceKind>,
}

/// Split the next token off the front of `data`.
///
/// Returns the number of bytes consumed and the token. Castles are matched
/// first, then piece letters, then the check/mate markers (only as the very
/// last character), rank digits, files (paired with a following rank into a
/// square), and the capture and promotion markers.
pub fn next_san_token(data: &str) -> Result<(usize, &str), SanError> {
    let Some(first) = data.chars().next() else {
        return Ok((0, ""));
    };

    let advance = if data.starts_with(LONG_CASTLE) {
        LONG_CASTLE.len()
    } else if data.starts_with(SHORT_CASTLE) {
        SHORT_CASTLE.len()
    } else if PieceKind::from_san_letter(first).is_some() {
        1
    } else if data.len() == first.len_utf8() {
        match first {
            '+' | '#' => 1,
            other => return Err(SanError::UnknownSymbol(other)),
        }
    } else if rank_index(first).is_some() {
        1
    } else if file_index(first).is_some() {
        match data[1..].chars().next() {
            Some(next) if rank_index(next).is_some() => 2,
            _ => 1,
        }
    } else if first == 'x' || first == '=' {
        1
    } else {
        return Err(SanError::UnknownSymbol(first));
    };

    Ok((advance, &data[..advance]))
}

/// Split a whole SAN move into tokens.
pub fn tokenize_san(text: &str) -> Result<Vec<&str>, SanError> {
    let mut rest = text.trim();
    let mut tokens = Vec::new();
    while !rest.is_empty() {
        let (advance, token) = next_san_token(rest)?;
        tokens.push(token);
        rest = &rest[advance..];
    }
    Ok(tokens)
}

/// Parse Standard Algebraic Notation (SAN) move text into a [`MoveIntent`].
pub fn parse_san(text: &str) -> Result<MoveIntent, SanError> {
    let tokens = tokenize_san(text)?;
    let Some(first) = tokens.first() else {
        return Err(SanError::EmptyMoveText);
    };

    let lead_piece = first
        .chars()
        .next()
        .filter(|_| first.len() == 1)
        .and_then(PieceKind::from_san_letter);
    let mut piece_kind = lead_piece.unwrap_or(PieceKind::Pawn);
    let start = usize::from(lead_piece.is_some());

    let mut target: Option<Discriminator> = None;
    let mut discriminator: Option<Discriminator> = None;
    let mut castle: Option<SanTarget> = None;
    let mut is_capture = false;
    let mut is_check = false;
    let mut is_checkmate = false;
    let mut promotion: Option<PieceKind> = None;

    let mut i = start;
    while i < tokens.len() {
        let token = tokens[i];
        i += 1;

        if SQUARE_RE.is_match(token) || DISCRIMINATOR_RE.is_match(token) {
            if castle.is_some() {
                return Err(SanError::UnknownToken(token.to_string()));
            }
            let fragment = Discriminator::from_token(token)
                .ok_or_else(|| SanError::UnknownToken(token.to_string()))?;
            if target.is_some() {
                discriminator = target;
            }
            target = Some(fragment);
            continue;
        }

        match token {
            LONG_CASTLE | SHORT_CASTLE => {
                if castle.is_some() || target.is_some() {
                    return Err(SanError::UnknownToken(token.to_string()));
                }
                castle = Some(if token == LONG_CASTLE {
                    SanTarget::CastleLong
                } else {
                    SanTarget::CastleShort
                });
                piece_kind = PieceKind::King;
            }
            CAPTURE => is_capture = true,
            CHECK => is_check = true,
            MATE => is_checkmate = true,
            PROMOTE => {
                if promotion.is_some() {
                    return Err(SanError::InvalidPromotion(format!(
                        "repeated promotion marker in '{}'",
                        text
                    )));
                }
                if piece_kind != PieceKind::Pawn {
                    return Err(SanError::InvalidPromotion(format!(
                        "promotion on a non-pawn move '{}'",
                        text
                    )));
                }
                let kind = tokens
                    .get(i)
                    .and_then(|t| t.chars().next())
                    .and_then(PieceKind::from_san_letter)
                    .filter(|k| *k != PieceKind::King)
                    .ok_or_else(|| {
                        SanError::InvalidPromotion(format!("no promotion piece in '{}'", text))
                    })?;
                promotion = Some(kind);
                i += 1;
            }
            other => return Err(SanError::UnknownToken(other.to_string())),
        }
    }

    let target = match (castle, target) {
        (Some(castle), _) => castle,
        (None, Some(Discriminator::Square(sq))) => SanTarget::Square(sq),
        (None, _) => return Err(SanError::MissingTarget(text.to_string())),
    };

    Ok(MoveIntent {
        piece_kind,
        target,
        discriminator,
        is_capture,
        is_check,
        is_checkmate,
        is_castle_long: target == SanTarget::CastleLong,
        is_castle_short: target == SanTarget::CastleShort,
        promotion,
    })
}

/// Format an engine move as SAN for the side to move on `board`.
///
/// Disambiguation uses the same pseudo-legal generator as move resolution,
/// so the result always resolves back to `mv`. Check markers are never
/// emitted.
pub fn format_san(board: &Board, mv: LongMove) -> Result<String, MoveError> {
    let illegal = || MoveError::IllegalMove(mv.to_string());
    let piece = *board
        .piece_at(mv.from)
        .filter(|p| p.color == board.turn())
        .ok_or_else(illegal)?;
    if !can_reach(board, &piece, mv.to) {
        return Err(illegal());
    }
    if mv.promotion.is_some() && piece.kind != PieceKind::Pawn {
        return Err(illegal());
    }

    let file_shift = mv.to.file() as i8 - mv.from.file() as i8;
    if piece.kind == PieceKind::King && file_shift.abs() == 2 {
        let castle = if file_shift > 0 {
            SHORT_CASTLE
        } else {
            LONG_CASTLE
        };
        return Ok(castle.to_string());
    }

    let is_capture =
        !board.is_empty_at(mv.to) || (piece.kind == PieceKind::Pawn && file_shift != 0);
    let mut san = String::with_capacity(8);

    match piece.kind.san_letter() {
        None => {
            if is_capture {
                san.push(mv.from.file_char());
            }
        }
        Some(letter) => {
            san.push(letter);
            let rivals: Vec<Square> = board
                .pieces_of(piece.color, piece.kind)
                .filter(|p| p.square != mv.from && can_reach(board, p, mv.to))
                .map(|p| p.square)
                .collect();
            if !rivals.is_empty() {
                if rivals.iter().all(|s| s.file() != mv.from.file()) {
                    san.push(mv.from.file_char());
                } else if rivals.iter().all(|s| s.rank() != mv.from.rank()) {
                    san.push(mv.from.rank_char());
                } else {
                    san.push_str(&mv.from.to_string());
                }
            }
        }
    }

    if is_capture {
        san.push('x');
    }
    san.push_str(&mv.to.to_string());
    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(promo.to_char_upper());
    }

    Ok(san)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SanError {
    #[error("Empty move text")]
    EmptyMoveText,
    #[error("Unknown symbol: {0:?}")]
    UnknownSymbol(char),
    #[error("Unknown token: {0}")]
    UnknownToken(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
    #[error("Move has no target square: {0}")]
    MissingTarget(String),
}
