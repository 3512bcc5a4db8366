//! lichan CLI - import downloaded games as PGN and annotate them with a
//! local UCI engine.
//!
//! Three subcommands share one data directory (see [`config`]):
//!
//! - **`import <user> <file|->`**: reads the game server's NDJSON export and
//!   writes one PGN file per game under `<data>/games/<user>/`.
//! - **`analyze <user>...`**: replays every stored game that has no analysis
//!   yet through Stockfish and writes an annotated copy under
//!   `<data>/engine/<user>/`.
//! - **`replay <pgn>`**: prints the long-algebraic form of every move and the
//!   final position, without an engine.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::{EngineConfig, GoParams, StockfishEngine};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod annotate;
mod config;
mod import;
mod store;

use annotate::analyze_stored_game;
use store::GameStore;

/// Top-level CLI arguments for lichan.
#[derive(Parser)]
#[command(name = "lichan", about = "Chess game archive with engine annotation")]
struct Cli {
    /// Data directory (overrides LICHAN_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Stockfish binary (overrides LICHAN_STOCKFISH_PATH).
    #[arg(long, global = true)]
    stockfish: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store games from an NDJSON export as PGN files.
    Import {
        user: String,
        /// Export file, or `-` for stdin.
        input: String,
    },
    /// Annotate every stored game that has not been analyzed yet.
    Analyze {
        #[arg(required = true)]
        users: Vec<String>,
        /// Search depth (overrides LICHAN_SEARCH_DEPTH).
        #[arg(long)]
        depth: Option<u32>,
        /// Search time per move in milliseconds (overrides
        /// LICHAN_SEARCH_MOVETIME_MS).
        #[arg(long)]
        movetime: Option<u64>,
    },
    /// Print the moves of a PGN file in long algebraic notation.
    Replay { pgn: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging()?;

    let data_dir = cli.data_dir.unwrap_or_else(config::get_data_dir);
    let store = GameStore::new(data_dir, config::get_site_url());

    match cli.command {
        Commands::Import { user, input } => run_import(&store, &user, &input),
        Commands::Analyze {
            users,
            depth,
            movetime,
        } => {
            let go = GoParams {
                depth: Some(depth.unwrap_or_else(config::get_search_depth)),
                movetime: Some(movetime.unwrap_or_else(config::get_search_movetime_ms)),
                infinite: false,
            };
            let engine_config = EngineConfig {
                path: cli.stockfish.or_else(config::get_stockfish_path),
                ready_timeout: Duration::from_secs(config::get_engine_ready_timeout_secs()),
                ..Default::default()
            };
            run_analyze(&store, &users, &go, engine_config).await
        }
        Commands::Replay { pgn } => {
            let text = std::fs::read_to_string(&pgn)
                .with_context(|| format!("failed to read {}", pgn.display()))?;
            for line in replay_lines(&text)? {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

/// Log to stderr, or to a daily rolling file when `LICHAN_LOG_DIR` is set.
/// The returned guard must live until exit so buffered lines are flushed.
fn init_logging() -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_dir) = config::get_log_dir() else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "lichan");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();
    Ok(Some(guard))
}

fn run_import(store: &GameStore, user: &str, input: &str) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(std::io::stdin().lock())
    } else {
        let file = std::fs::File::open(input)
            .with_context(|| format!("failed to open {}", input))?;
        Box::new(std::io::BufReader::new(file))
    };
    let summary = import::import_ndjson(reader, user, store)?;
    println!(
        "{}: {} games written, {} skipped",
        user, summary.written, summary.skipped
    );
    Ok(())
}

/// Annotate pending games for each user. The engine is started on the first
/// pending game and shared by all of them. A game that fails to replay is
/// skipped; an engine or storage failure ends the run.
async fn run_analyze(
    store: &GameStore,
    users: &[String],
    go: &GoParams,
    engine_config: EngineConfig,
) -> anyhow::Result<()> {
    let mut engine: Option<StockfishEngine> = None;
    let result = analyze_users(store, users, go, &engine_config, &mut engine).await;
    if let Some(engine) = engine {
        engine.shutdown().await;
    }
    result
}

async fn analyze_users(
    store: &GameStore,
    users: &[String],
    go: &GoParams,
    engine_config: &EngineConfig,
    engine: &mut Option<StockfishEngine>,
) -> anyhow::Result<()> {
    for user in users {
        let games = store.list_games(user)?;
        let mut pending = Vec::new();
        for game in games {
            if !store.is_analyzed(user, &game)? {
                pending.push(game);
            }
        }
        tracing::info!(user = %user, pending = pending.len(), "Games to analyze");

        if !pending.is_empty() && engine.is_none() {
            let spawned = StockfishEngine::spawn_with_config(engine_config.clone())
                .await
                .context("failed to start Stockfish")?;
            *engine = Some(spawned);
        }

        for game in pending {
            let Some(engine) = engine.as_mut() else {
                break;
            };
            match analyze_stored_game(engine, store, user, &game, go).await {
                Ok(path) => println!("{}", path.display()),
                Err(e) if e.is_game_local() => {
                    tracing::warn!("Skipping {}: {}", game.display(), e);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("while analyzing {}", game.display()))
                }
            }
        }
    }
    Ok(())
}

/// One line per ply (`<ply>. <san> <long>`) followed by the final FEN.
fn replay_lines(text: &str) -> anyhow::Result<Vec<String>> {
    let record = chess::decode_pgn(text)?;
    let game = chess::Game::replay(record.start_position(), &record.moves)?;
    let mut lines: Vec<String> = game
        .history()
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{}. {} {}", i + 1, entry.san, entry.long))
        .collect();
    lines.push(chess::format_fen(game.position()));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_flags() {
        let cli = Cli::try_parse_from([
            "lichan", "--data-dir", "/tmp/d", "analyze", "alice", "bob", "--depth", "20",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/d")));
        match cli.command {
            Commands::Analyze {
                users,
                depth,
                movetime,
            } => {
                assert_eq!(users, ["alice", "bob"]);
                assert_eq!(depth, Some(20));
                assert_eq!(movetime, None);
            }
            _ => panic!("expected analyze"),
        }
        assert!(Cli::try_parse_from(["lichan", "analyze"]).is_err());
    }

    #[test]
    fn test_replay_lines() {
        let pgn = "[Event \"rated blitz game\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 3. O-O 1-0\n";
        let err = replay_lines(pgn).unwrap_err();
        assert!(err.to_string().contains("O-O"));

        let pgn = "[Event \"rated blitz game\"]\n\n1. e4 e5 2. Nf3 Nc6 *\n";
        let lines = replay_lines(pgn).unwrap();
        assert_eq!(
            lines,
            [
                "1. e4 e2e4",
                "2. e5 e7e5",
                "3. Nf3 g1f3",
                "4. Nc6 b8c6",
                "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w - - 0 1",
            ]
        );
    }
}
