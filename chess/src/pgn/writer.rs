
use crate::fen::fen_turn;
use crate::record::GameRecord;
use crate::types::PieceColor;

/// One movetext move, optionally followed by a `{ }` comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovetextEntry {
    pub san: String,
    pub comment: Option<String>,
}

impl MovetextEntry {
    pub fn new(san: impl Into<String>) -> Self {
        Self {
            san: san.into(),
            comment: None,
        }
    }

    pub fn with_comment(san: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            san: san.into(),
            comment: Some(comment.into()),
        }
    }
}

/// Render a record as a PGN game.
pub fn encode_pgn(record: &GameRecord, site_url: &str) -> String {
    let entries: Vec<MovetextEntry> = record
        .moves
        .split_whitespace()
        .map(MovetextEntry::new)
        .collect();
    encode_annotated_pgn(record, &entries, site_url)
}

/// Render a record with caller-supplied movetext, carrying per-move comments.
pub fn encode_annotated_pgn(
    record: &GameRecord,
    entries: &[MovetextEntry],
    site_url: &str,
) -> String {
    let mut pgn = String::new();
    let start = record.start_position();
    let site = format!("{}/{}", site_url.trim_end_matches('/'), record.id);

    push_tag(&mut pgn, "Event", &record.event());
    push_tag(&mut pgn, "Site", &site);
    push_tag(&mut pgn, "Date", &record.pgn_date());
    push_tag(&mut pgn, "Round", "-");
    push_tag(&mut pgn, "White", &record.white.name);
    push_tag(&mut pgn, "Black", &record.black.name);
    push_tag(&mut pgn, "Result", record.winner.result_token());
    push_tag(&mut pgn, "GameId", &record.id);
    push_tag(&mut pgn, "WhiteElo", &record.white.rating.to_string());
    push_tag(&mut pgn, "BlackElo", &record.black.rating.to_string());
    push_tag(&mut pgn, "Opening", &record.opening);
    push_tag(
        &mut pgn,
        "TimeControl",
        &format!("{}+{}", record.clock.initial, record.clock.increment),
    );
    push_tag(&mut pgn, "FEN", start.fen());
    pgn.push('\n');

    let first = fen_turn(start.fen()).unwrap_or(PieceColor::White);
    let movetext = render_movetext(entries, first, 1);
    if !movetext.is_empty() {
        pgn.push_str(&movetext);
        pgn.push(' ');
    }
    pgn.push_str(record.winner.result_token());
    pgn.push('\n');
    pgn
}

/// Number SAN moves starting at `move_number` with `first` to move.
///
/// Black moves get an `N...` prefix when they open the text or follow a
/// comment.
pub fn render_movetext(entries: &[MovetextEntry], first: PieceColor, move_number: u32) -> String {
    let mut out = String::new();
    let mut number = move_number;
    let mut color = first;
    let mut needs_number = true;

    for entry in entries {
        if !out.is_empty() {
            out.push(' ');
        }
        match color {
            PieceColor::White => {
                out.push_str(&format!("{}. ", number));
            }
            PieceColor::Black if needs_number => {
                out.push_str(&format!("{}... ", number));
            }
            PieceColor::Black => {}
        }
        out.push_str(&entry.san);
        needs_number = false;

        if let Some(comment) = &entry.comment {
            let comment: String = comment.chars().filter(|c| !matches!(c, '{' | '}')).collect();
            out.push_str(&format!(" {{ {} }}", comment.trim()));
            needs_number = true;
        }

        if color == PieceColor::Black {
            number += 1;
        }
        color = color.opponent();
    }
    out
}

fn push_tag(pgn: &mut String, key: &str, value: &str) {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    pgn.push_str(&format!("[{} \"{}\"]\n", key, escaped));
}
