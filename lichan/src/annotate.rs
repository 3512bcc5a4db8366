//! Engine annotation of stored games.
//!
//! Each move of a game is replayed on a fresh board, the engine searches the
//! resulting position, and its principal variation is translated back into
//! SAN and attached to the move as a comment.

use std::path::{Path, PathBuf};

use chess::{
    decode_pgn, pv_to_san, Continuation, Game, GameError, GameRecord, MovetextEntry, PgnError,
    PieceColor,
};
use engine::{EngineError, GoParams, StockfishEngine};

use crate::store::{GameStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Pgn(#[from] PgnError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AnalyzeError {
    /// Errors confined to one game. Anything else stops the whole run.
    pub fn is_game_local(&self) -> bool {
        matches!(self, Self::Game(_) | Self::Pgn(_))
    }
}

/// Replay `record` and collect one engine comment per move.
#[tracing::instrument(level = "info", skip_all, fields(game = %record.id))]
pub async fn analyze_game(
    engine: &mut StockfishEngine,
    record: &GameRecord,
    go: &GoParams,
) -> Result<Vec<MovetextEntry>, AnalyzeError> {
    let mut game = Game::from_start(record.start_position())?;
    let mut entries = Vec::with_capacity(record.move_count());
    let mut move_number = 1;

    engine.wait_ready().await?;

    for san in record.moves.split_whitespace() {
        let mover = game.position().turn();
        game.push_san(san)?;
        if mover == PieceColor::Black {
            move_number += 1;
        }

        let position = game.position();
        let result = engine
            .search(game.start_position(), &game.long_moves(), go)
            .await?;
        tracing::debug!(ply = game.history().len(), san, best = ?result.best_move, "Searched");

        let Some(info) = result.info else {
            entries.push(MovetextEntry::new(san));
            continue;
        };
        let sans = match pv_to_san(position, &info.pv) {
            Ok(sans) => sans,
            Err(e) => {
                tracing::warn!(san, "Dropping engine line: {}", e);
                Vec::new()
            }
        };
        let continuation = Continuation {
            score: info.score.map(|s| s.for_white(position.turn())),
            depth: info.depth,
            side_to_move: position.turn(),
            move_number,
            sans,
        };
        entries.push(MovetextEntry::with_comment(san, continuation.to_comment()));
    }

    Ok(entries)
}

/// Analyze one stored game file and write its annotated copy. Nothing is
/// written when any move fails to replay.
pub async fn analyze_stored_game(
    engine: &mut StockfishEngine,
    store: &GameStore,
    user: &str,
    game_path: &Path,
    go: &GoParams,
) -> Result<PathBuf, AnalyzeError> {
    let text = std::fs::read_to_string(game_path).map_err(StoreError::from)?;
    let record = decode_pgn(&text)?;
    tracing::info!(
        "Analyzing {} ({} moves)",
        game_path.display(),
        record.move_count()
    );
    let entries = analyze_game(engine, &record, go).await?;
    Ok(store.save_analysis(user, game_path, &record, &entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    /// Fake engine that answers each `go` with the next scripted search.
    fn scripted_engine(searches: Vec<&'static str>) -> StockfishEngine {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let mut searches: VecDeque<_> = searches.into();
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let reply = match line.split_whitespace().next() {
                    Some("isready") => "readyok\n",
                    Some("go") => searches.pop_front().unwrap_or("bestmove (none)\n"),
                    _ => "",
                };
                if write.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
        });
        let (read, write) = tokio::io::split(client);
        StockfishEngine::from_io(read, write, Duration::from_millis(500))
    }

    fn record(moves: &str) -> GameRecord {
        GameRecord {
            id: "AbC123".into(),
            created_at: 1_710_000_000_000,
            moves: moves.into(),
            ..Default::default()
        }
    }

    fn go() -> GoParams {
        GoParams {
            depth: Some(10),
            movetime: Some(100),
            infinite: false,
        }
    }

    #[tokio::test]
    async fn test_analyze_game_comments_each_move() {
        let mut engine = scripted_engine(vec![
            "info depth 10 score cp -30 pv e7e5 g1f3\nbestmove e7e5\n",
            "info depth 10 score cp 25 pv g1f3\nbestmove g1f3\n",
        ]);
        let entries = analyze_game(&mut engine, &record("e4 e5"), &go())
            .await
            .unwrap();
        assert_eq!(
            entries,
            vec![
                MovetextEntry::with_comment("e4", "+0.30 d10 1... e5 2. Nf3"),
                MovetextEntry::with_comment("e5", "+0.25 d10 2. Nf3"),
            ]
        );
    }

    #[tokio::test]
    async fn test_analyze_game_final_position_without_moves() {
        let mut engine = scripted_engine(vec![
            "info depth 10 score cp 10 pv e7e5\nbestmove e7e5\n",
            "info depth 10 score cp 20 pv g1f3\nbestmove g1f3\n",
            "info depth 10 score cp 30 pv b8c6\nbestmove b8c6\n",
            "info depth 10 score cp 40 pv f1c4\nbestmove f1c4\n",
            "info depth 10 score cp 50 pv g8f6\nbestmove g8f6\n",
            "info depth 10 score cp 60 pv h5f7\nbestmove h5f7\n",
            "info depth 0 score mate 0\nbestmove (none)\n",
        ]);
        let entries = analyze_game(
            &mut engine,
            &record("e4 e5 Qh5 Nc6 Bc4 Nf6 Qxf7#"),
            &go(),
        )
        .await
        .unwrap();
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[6], MovetextEntry::new("Qxf7#"));
        assert_eq!(
            entries[4].comment.as_deref(),
            Some("-0.50 d10 3... Nf6")
        );
    }

    #[tokio::test]
    async fn test_illegal_engine_line_keeps_score() {
        let mut engine = scripted_engine(vec!["info depth 3 score mate 2 pv e2e4\nbestmove e2e4\n"]);
        let entries = analyze_game(&mut engine, &record("d4"), &go()).await.unwrap();
        assert_eq!(entries[0], MovetextEntry::with_comment("d4", "-M2 d3"));
    }

    #[tokio::test]
    async fn test_bad_move_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GameStore::new(tmp.path().to_path_buf(), "https://lichess.org".into());
        let path = store.save_game("alice", &record("e4 Ke5")).unwrap();

        let mut engine = scripted_engine(vec!["info depth 1 score cp 0 pv e7e5\nbestmove e7e5\n"]);
        let err = analyze_stored_game(&mut engine, &store, "alice", &path, &go())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::Game(GameError::Move { ply: 2, .. })));
        assert!(err.is_game_local());
        assert!(!store.is_analyzed("alice", &path).unwrap());
    }

    #[tokio::test]
    async fn test_stored_game_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GameStore::new(tmp.path().to_path_buf(), "https://lichess.org".into());
        let path = store.save_game("alice", &record("e4")).unwrap();

        let mut engine =
            scripted_engine(vec!["info depth 12 score cp -20 pv c7c5\nbestmove c7c5\n"]);
        let out = analyze_stored_game(&mut engine, &store, "alice", &path, &go())
            .await
            .unwrap();
        assert_eq!(out, store.analysis_path("alice", &path).unwrap());

        let pgn = std::fs::read_to_string(out).unwrap();
        assert!(pgn.contains("1. e4 { +0.20 d12 1... c5 } *"));
        assert_eq!(decode_pgn(&pgn).unwrap().moves, "e4");
    }
}
