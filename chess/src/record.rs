//! Game metadata as downloaded from the game server and stored in PGN files.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::game::StartPosition;

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Winner {
    White,
    Black,
    Draw,
    #[default]
    Unknown,
}

impl Winner {
    /// PGN result token.
    pub fn result_token(self) -> &'static str {
        match self {
            Self::White => "1-0",
            Self::Black => "0-1",
            Self::Draw => "1/2-1/2",
            Self::Unknown => "*",
        }
    }

    pub fn from_result_token(token: &str) -> Option<Self> {
        match token {
            "1-0" => Some(Self::White),
            "0-1" => Some(Self::Black),
            "1/2-1/2" => Some(Self::Draw),
            "*" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Player {
    pub name: String,
    pub rating: u32,
}

/// Time control in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Clock {
    pub initial: u32,
    pub increment: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameRecord {
    pub id: String,
    pub rated: bool,
    /// Speed label such as `blitz` or `rapid`.
    pub speed: String,
    pub white: Player,
    pub black: Player,
    /// Milliseconds since the Unix epoch, UTC.
    pub created_at: i64,
    pub winner: Winner,
    pub opening: String,
    pub clock: Clock,
    pub initial_fen: Option<String>,
    /// Space-separated SAN moves without move numbers or result.
    pub moves: String,
}

impl GameRecord {
    /// Decode one line of the server's NDJSON game export.
    pub fn from_api_json(line: &str) -> Result<Self, RecordError> {
        let api: ApiGame = serde_json::from_str(line)?;
        if api.id.is_empty() {
            return Err(RecordError::MissingId);
        }

        let winner = match (api.winner.as_deref(), api.status.as_deref()) {
            (Some("white"), _) => Winner::White,
            (Some("black"), _) => Winner::Black,
            (None, Some("draw" | "stalemate")) => Winner::Draw,
            _ => Winner::Unknown,
        };

        Ok(Self {
            id: api.id,
            rated: api.rated,
            speed: api.speed,
            white: api.players.white.into(),
            black: api.players.black.into(),
            created_at: api.created_at,
            winner,
            opening: api.opening.map(|o| o.name).unwrap_or_default(),
            clock: api
                .clock
                .map(|c| Clock {
                    initial: c.initial,
                    increment: c.increment,
                })
                .unwrap_or_default(),
            initial_fen: api.initial_fen.filter(|f| !f.trim().is_empty()),
            moves: api.moves.trim().to_string(),
        })
    }

    /// UTC calendar date the game was created on.
    pub fn date(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.created_at)
            .unwrap_or_default()
            .date_naive()
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.created_at = date.and_time(NaiveTime::default()).and_utc().timestamp_millis();
    }

    /// `YYYY.MM.DD`, as used in the PGN `Date` tag.
    pub fn pgn_date(&self) -> String {
        let date = self.date();
        format!("{:04}.{:02}.{:02}", date.year(), date.month(), date.day())
    }

    /// File name the game is stored under.
    pub fn file_name(&self) -> String {
        format!("{}_{}.pgn", self.pgn_date(), self.id)
    }

    pub fn start_position(&self) -> StartPosition {
        StartPosition::from_fen(self.initial_fen.as_deref())
    }

    pub fn event(&self) -> String {
        let rated = if self.rated { "rated" } else { "unrated" };
        format!("{} {} game", rated, self.speed)
    }

    pub fn move_count(&self) -> usize {
        self.moves.split_whitespace().count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Game has no id")]
    MissingId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGame {
    id: String,
    #[serde(default)]
    rated: bool,
    #[serde(default)]
    speed: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    winner: Option<String>,
    #[serde(default)]
    players: ApiPlayers,
    #[serde(default)]
    opening: Option<ApiOpening>,
    #[serde(default)]
    clock: Option<ApiClock>,
    #[serde(default)]
    initial_fen: Option<String>,
    #[serde(default)]
    moves: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPlayers {
    #[serde(default)]
    white: ApiPlayer,
    #[serde(default)]
    black: ApiPlayer,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPlayer {
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    rating: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiOpening {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiClock {
    initial: u32,
    increment: u32,
}

impl From<ApiPlayer> for Player {
    fn from(p: ApiPlayer) -> Self {
        Self {
            name: p.user.map(|u| u.name).unwrap_or_default(),
            rating: p.rating.unwrap_or_default(),
        }
    }
}
