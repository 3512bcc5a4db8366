//! PGN files on disk, one directory per user.
//!
//! ```text
//! <data>/games/<user>/<YYYY.MM.DD>_<id>.pgn
//! <data>/engine/<user>/<yyyy.mm.dd>_<id>_stockfish.pgn
//! ```

use std::path::{Path, PathBuf};

use chess::{encode_annotated_pgn, encode_pgn, GameRecord, MovetextEntry};

const GAMES_DIR: &str = "games";
const ENGINE_DIR: &str = "engine";
const ANALYSIS_SUFFIX: &str = "_stockfish.pgn";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid user name: {0:?}")]
    InvalidUser(String),
    #[error("Invalid game id: {0:?}")]
    InvalidGameId(String),
}

pub struct GameStore {
    data_dir: PathBuf,
    site_url: String,
}

impl GameStore {
    pub fn new(data_dir: PathBuf, site_url: String) -> Self {
        Self { data_dir, site_url }
    }

    pub fn games_dir(&self, user: &str) -> Result<PathBuf, StoreError> {
        Ok(self.data_dir.join(GAMES_DIR).join(checked_segment(user)?))
    }

    pub fn engine_dir(&self, user: &str) -> Result<PathBuf, StoreError> {
        Ok(self.data_dir.join(ENGINE_DIR).join(checked_segment(user)?))
    }

    /// Write a downloaded game as PGN. Returns the file path.
    pub fn save_game(&self, user: &str, record: &GameRecord) -> Result<PathBuf, StoreError> {
        if checked_segment(&record.id).is_err() {
            return Err(StoreError::InvalidGameId(record.id.clone()));
        }
        let dir = self.games_dir(user)?;
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(record.file_name());
        write_atomic(&path, &encode_pgn(record, &self.site_url))?;
        tracing::info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Stored games for `user`, sorted by file name (oldest first).
    pub fn list_games(&self, user: &str) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.games_dir(user)?;
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut games = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_pgn = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pgn"));
            if is_pgn && entry.file_type()?.is_file() {
                games.push(path);
            }
        }
        games.sort();
        Ok(games)
    }

    /// Where the analysis of `game_path` is written.
    pub fn analysis_path(&self, user: &str, game_path: &Path) -> Result<PathBuf, StoreError> {
        let stem = game_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_lowercase();
        Ok(self
            .engine_dir(user)?
            .join(format!("{}{}", stem, ANALYSIS_SUFFIX)))
    }

    /// An existing analysis file marks the game as done.
    pub fn is_analyzed(&self, user: &str, game_path: &Path) -> Result<bool, StoreError> {
        Ok(self.analysis_path(user, game_path)?.exists())
    }

    pub fn save_analysis(
        &self,
        user: &str,
        game_path: &Path,
        record: &GameRecord,
        entries: &[MovetextEntry],
    ) -> Result<PathBuf, StoreError> {
        let path = self.analysis_path(user, game_path)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        write_atomic(&path, &encode_annotated_pgn(record, entries, &self.site_url))?;
        tracing::info!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Reject names that would escape their directory.
fn checked_segment(name: &str) -> Result<&str, StoreError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        Err(StoreError::InvalidUser(name.to_string()))
    } else {
        Ok(name)
    }
}

/// Write through a temporary sibling and rename, so a crash never leaves a
/// half-written file that would mark a game as done.
fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
