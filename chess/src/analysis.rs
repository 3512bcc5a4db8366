//! Engine evaluation types shared by the engine actor and the annotator.

use std::fmt;

use crate::pgn::writer::{render_movetext, MovetextEntry};
use crate::types::PieceColor;

/// Engine evaluation score.
///
/// UCI reports scores from the side to move's point of view: positive
/// centipawns favour the mover, `Mate(n)` with positive `n` means the mover
/// mates in `n`, negative means the mover gets mated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisScore {
    Centipawns(i32),
    Mate(i32),
}

impl AnalysisScore {
    /// Negate the score (flip perspective).
    pub fn negate(self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    /// Re-express a side-to-move score from White's point of view, the PGN
    /// convention for evaluation comments.
    pub fn for_white(self, side_to_move: PieceColor) -> Self {
        match side_to_move {
            PieceColor::White => self,
            PieceColor::Black => self.negate(),
        }
    }
}

impl fmt::Display for AnalysisScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Centipawns(cp) => write!(f, "{:+.2}", cp as f64 / 100.0),
            Self::Mate(m) if m >= 0 => write!(f, "+M{}", m),
            Self::Mate(m) => write!(f, "-M{}", m.unsigned_abs()),
        }
    }
}

/// Engine continuation from a position, ready to be written as a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    /// Score from White's point of view.
    pub score: Option<AnalysisScore>,
    pub depth: Option<u32>,
    /// Side to move at the start of `sans`.
    pub side_to_move: PieceColor,
    /// Full-move number of the first move in `sans`.
    pub move_number: u32,
    pub sans: Vec<String>,
}

impl Continuation {
    /// `+0.35 d20 12... Nf6 13. Bg5`
    pub fn to_comment(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(score) = self.score {
            parts.push(score.to_string());
        }
        if let Some(depth) = self.depth {
            parts.push(format!("d{}", depth));
        }
        let entries: Vec<MovetextEntry> = self.sans.iter().map(MovetextEntry::new).collect();
        let line = render_movetext(&entries, self.side_to_move, self.move_number);
        if !line.is_empty() {
            parts.push(line);
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_display() {
        assert_eq!(AnalysisScore::Centipawns(35).to_string(), "+0.35");
        assert_eq!(AnalysisScore::Centipawns(-120).to_string(), "-1.20");
        assert_eq!(AnalysisScore::Centipawns(0).to_string(), "+0.00");
        assert_eq!(AnalysisScore::Mate(3).to_string(), "+M3");
        assert_eq!(AnalysisScore::Mate(-2).to_string(), "-M2");
    }

    #[test]
    fn test_for_white_flips_black_scores() {
        let score = AnalysisScore::Centipawns(50);
        assert_eq!(score.for_white(PieceColor::White), score);
        assert_eq!(
            score.for_white(PieceColor::Black),
            AnalysisScore::Centipawns(-50)
        );
        assert_eq!(
            AnalysisScore::Mate(1).for_white(PieceColor::Black),
            AnalysisScore::Mate(-1)
        );
    }

    #[test]
    fn test_continuation_comment() {
        let cont = Continuation {
            score: Some(AnalysisScore::Centipawns(35)),
            depth: Some(20),
            side_to_move: PieceColor::Black,
            move_number: 12,
            sans: vec!["Nf6".to_string(), "Bg5".to_string(), "Be7".to_string()],
        };
        assert_eq!(cont.to_comment(), "+0.35 d20 12... Nf6 13. Bg5 Be7");
    }

    #[test]
    fn test_continuation_without_line() {
        let cont = Continuation {
            score: Some(AnalysisScore::Mate(-1)),
            depth: None,
            side_to_move: PieceColor::White,
            move_number: 1,
            sans: Vec::new(),
        };
        assert_eq!(cont.to_comment(), "-M1");
    }
}
