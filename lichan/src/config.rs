//! Configuration for lichan runtime.
//!
//! Every tunable has a compile-time default and can be overridden at runtime
//! via a dedicated environment variable. Command-line flags take precedence
//! over both.

use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_DIR: &str = ".config/lichan/data";
const DEV_DATA_DIR: &str = "./data";

/// Default search depth passed to `go depth`.
pub const DEFAULT_SEARCH_DEPTH: u32 = 245;

/// Default search time passed to `go movetime` (in milliseconds).
pub const DEFAULT_SEARCH_MOVETIME_MS: u64 = 60_000;

/// Default timeout for `uciok`/`readyok` (in seconds).
pub const DEFAULT_ENGINE_READY_TIMEOUT_SECS: u64 = 10;

/// Default base URL for the `Site` tag.
pub const DEFAULT_SITE_URL: &str = "https://lichess.org";

/// Get the data directory holding downloaded and analyzed games.
///
/// Priority:
/// 1. `LICHAN_DATA_DIR` env variable if set (`~` is expanded)
/// 2. `$HOME/.config/lichan/data` if HOME is set
/// 3. `./data` as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LICHAN_DATA_DIR") {
        return expand_tilde(&dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Explicit Stockfish binary from `LICHAN_STOCKFISH_PATH`. When unset the
/// engine searches common install locations.
pub fn get_stockfish_path() -> Option<PathBuf> {
    std::env::var("LICHAN_STOCKFISH_PATH")
        .ok()
        .map(|path| expand_tilde(&path))
}

/// `LICHAN_SEARCH_DEPTH`, falling back to the default if unset or unparseable.
pub fn get_search_depth() -> u32 {
    env_or("LICHAN_SEARCH_DEPTH", DEFAULT_SEARCH_DEPTH)
}

/// `LICHAN_SEARCH_MOVETIME_MS`, falling back to the default if unset or
/// unparseable.
pub fn get_search_movetime_ms() -> u64 {
    env_or("LICHAN_SEARCH_MOVETIME_MS", DEFAULT_SEARCH_MOVETIME_MS)
}

pub fn get_engine_ready_timeout_secs() -> u64 {
    env_or(
        "LICHAN_ENGINE_READY_TIMEOUT_SECS",
        DEFAULT_ENGINE_READY_TIMEOUT_SECS,
    )
}

pub fn get_site_url() -> String {
    std::env::var("LICHAN_SITE_URL").unwrap_or_else(|_| DEFAULT_SITE_URL.to_string())
}

/// Directory for rolling log files. Logs go to stderr when unset.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("LICHAN_LOG_DIR")
        .ok()
        .filter(|dir| !dir.is_empty())
        .map(|dir| expand_tilde(&dir))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Expand a leading `~` to `$HOME`.
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = std::env::var("HOME").ok();
    expand_tilde_with(path, home.as_deref().map(Path::new))
}

fn expand_tilde_with(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}
