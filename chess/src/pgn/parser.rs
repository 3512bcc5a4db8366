use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, warn};

use super::PgnError;
use crate::fen::STANDARD_FEN;
use crate::record::{Clock, GameRecord, Winner};

static MOVE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.+").expect("valid move number regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    /// Unquoted text between structural characters, untrimmed.
    Text(String),
    Quoted(String),
}

/// Decode a single PGN game into a record.
///
/// Malformed tag values are logged and leave the field at its default;
/// only structural problems fail the decode.
pub fn decode_pgn(input: &str) -> Result<GameRecord, PgnError> {
    if input.contains('\t') {
        return Err(PgnError::MalformedInput(
            "PGN must not contain tabs".to_string(),
        ));
    }

    let tokens = tokenize(input)?;
    let mut record = GameRecord::default();
    let mut movetext = String::new();
    let mut tag: Option<Vec<String>> = None;

    for token in tokens {
        match token {
            Token::Open => {
                if tag.is_some() {
                    return Err(PgnError::MalformedInput("nested '['".to_string()));
                }
                tag = Some(Vec::new());
            }
            Token::Close => match tag.take() {
                Some(parts) => apply_tag(&mut record, parts),
                None => return Err(PgnError::MalformedInput("unmatched ']'".to_string())),
            },
            Token::Text(text) => match tag.as_mut() {
                Some(parts) => parts.extend(text.split_whitespace().map(str::to_string)),
                None => {
                    movetext.push(' ');
                    movetext.push_str(&text);
                }
            },
            Token::Quoted(value) => match tag.as_mut() {
                Some(parts) => parts.push(value),
                None => warn!(text = %value, "Ignoring quoted text outside a tag"),
            },
        }
    }

    if tag.is_some() {
        return Err(PgnError::MalformedInput("unterminated tag".to_string()));
    }

    record.moves = clean_movetext(&movetext);
    Ok(record)
}

/// Strip move numbers, comments, NAGs and result tokens from movetext,
/// leaving space-separated SAN.
pub fn clean_movetext(movetext: &str) -> String {
    let stripped = strip_comments(movetext);
    let mut sans: Vec<&str> = Vec::new();
    for token in stripped.split_whitespace() {
        let token = MOVE_NUMBER_RE.find(token).map_or(token, |m| &token[m.end()..]);
        if token.is_empty() || token.starts_with('$') {
            continue;
        }
        if Winner::from_result_token(token).is_some() {
            continue;
        }
        sans.push(token);
    }
    sans.join(" ")
}

fn strip_comments(movetext: &str) -> String {
    let mut out = String::with_capacity(movetext.len());
    let mut depth = 0usize;
    for c in movetext.chars() {
        match c {
            '{' | '(' => {
                depth += 1;
                out.push(' ');
            }
            '}' | ')' if depth > 0 => {
                depth -= 1;
                out.push(' ');
            }
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out
}

/// Split PGN text into bracket, quoted and plain-text tokens.
///
/// Brackets end the current token and stand alone. A quote ends the current
/// token and opens a quoted value, inside which brackets are literal and
/// `\"` escapes a quote. Newlines inside a tag are dropped.
fn tokenize(input: &str) -> Result<Vec<Token>, PgnError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_tag = false;
    let mut chars = input.chars();

    fn flush(current: &mut String, tokens: &mut Vec<Token>) {
        if !current.trim().is_empty() {
            tokens.push(Token::Text(std::mem::take(current)));
        } else {
            current.clear();
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '[' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Open);
                in_tag = true;
            }
            ']' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Close);
                in_tag = false;
            }
            '"' => {
                flush(&mut current, &mut tokens);
                let mut value = String::new();
                let mut closed = false;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        '\n' | '\r' => {}
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err(PgnError::MalformedInput(
                        "unmatched quotation mark".to_string(),
                    ));
                }
                tokens.push(Token::Quoted(value));
            }
            '\n' | '\r' if in_tag => {}
            other => current.push(other),
        }
    }
    flush(&mut current, &mut tokens);

    Ok(tokens)
}

fn apply_tag(record: &mut GameRecord, parts: Vec<String>) {
    let mut parts = parts.into_iter();
    let Some(key) = parts.next() else {
        warn!("Skipping empty tag");
        return;
    };
    let key = key.to_lowercase();
    let rest: Vec<String> = parts.collect();
    if rest.is_empty() {
        warn!(key = %key, "Missing value for tag");
        return;
    }
    let value = rest.join(" ");
    let value = value.trim();

    match key.as_str() {
        "event" => {
            let words: Vec<&str> = value.split_whitespace().collect();
            if let [rated, speed, _] = words.as_slice() {
                record.rated = rated.eq_ignore_ascii_case("rated");
                record.speed = speed.to_lowercase();
            } else {
                warn!(value, "Unrecognized event");
            }
        }
        "site" => {}
        "date" => match parse_date(value) {
            Some(date) => record.set_date(date),
            None => warn!(value, "Unable to parse date"),
        },
        "white" => record.white.name = value.to_string(),
        "black" => record.black.name = value.to_string(),
        "result" => match Winner::from_result_token(value) {
            Some(winner) => record.winner = winner,
            None => warn!(value, "Unknown result"),
        },
        "gameid" => record.id = value.to_string(),
        "opening" => record.opening = value.to_string(),
        "whiteelo" => match value.parse() {
            Ok(elo) => record.white.rating = elo,
            Err(e) => warn!(value, error = %e, "Could not parse rating"),
        },
        "blackelo" => match value.parse() {
            Ok(elo) => record.black.rating = elo,
            Err(e) => warn!(value, error = %e, "Could not parse rating"),
        },
        "timecontrol" => match parse_time_control(value) {
            Some(clock) => record.clock = clock,
            None => warn!(value, "Could not parse time control"),
        },
        "fen" => {
            if !value.is_empty() && value != STANDARD_FEN {
                record.initial_fen = Some(value.to_string());
            }
        }
        other => debug!(key = other, "Ignoring tag"),
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let mut fields = value.split('.');
    let year = fields.next()?.trim().parse().ok()?;
    let month = fields.next()?.trim().parse().ok()?;
    let day = fields.next()?.trim().parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_time_control(value: &str) -> Option<Clock> {
    let (initial, increment) = value.split_once('+')?;
    Some(Clock {
        initial: initial.trim().parse().ok()?,
        increment: increment.trim().parse().ok()?,
    })
}
