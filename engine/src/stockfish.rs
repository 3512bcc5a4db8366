use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chess::{LongMove, StartPosition};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::uci::{parse_uci_message, UciMessage};
use crate::{EngineCommand, EngineError, EngineEvent, EngineInfo, GoParams};

const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// A UCI engine driven by two background tasks: one drains engine output
/// into [`EngineEvent`]s, the other writes [`EngineCommand`]s to its input.
///
/// Request methods take `&mut self`, so only one request is outstanding at a
/// time.
pub struct StockfishEngine {
    process: Option<Child>,
    command_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    ready_timeout: Duration,
}

/// Configuration for engine startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit binary path; common install locations are searched when unset.
    pub path: Option<PathBuf>,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
    pub ready_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            threads: None,
            hash_mb: None,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

/// Outcome of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub best_move: Option<LongMove>,
    /// Latest info line that carried a principal variation.
    pub info: Option<EngineInfo>,
}

impl StockfishEngine {
    /// Spawn a Stockfish process and complete the UCI handshake.
    #[tracing::instrument(level = "info")]
    pub async fn spawn_with_config(config: EngineConfig) -> Result<Self, EngineError> {
        let path = match config.path.clone() {
            Some(path) => path,
            None => find_stockfish_path().ok_or(EngineError::NotFound)?,
        };
        tracing::info!("Found Stockfish at: {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn Stockfish: {}", e);
                EngineError::Spawn(e)
            })?;

        let stdin = process.stdin.take().ok_or(EngineError::MissingPipe("stdin"))?;
        let stdout = process.stdout.take().ok_or(EngineError::MissingPipe("stdout"))?;

        let mut engine = Self::from_io(stdout, stdin, config.ready_timeout);
        engine.process = Some(process);
        engine.handshake().await?;

        if let Some(threads) = config.threads {
            let threads = threads.clamp(1, 16);
            tracing::info!("Setting Threads to {}", threads);
            engine.set_option("Threads", Some(threads.to_string())).await?;
        }
        if let Some(hash_mb) = config.hash_mb {
            let hash_mb = hash_mb.clamp(1, 2048);
            tracing::info!("Setting Hash to {} MB", hash_mb);
            engine.set_option("Hash", Some(hash_mb.to_string())).await?;
        }

        tracing::info!("Stockfish engine spawned and initialized successfully");
        Ok(engine)
    }

    /// Drive a UCI engine over an arbitrary byte stream pair. No handshake is
    /// performed.
    pub fn from_io<R, W>(reader: R, writer: W, ready_timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel::<EngineCommand>(32);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(32);

        tokio::spawn(read_output(reader, event_tx));
        tokio::spawn(write_commands(writer, command_rx));

        Self {
            process: None,
            command_tx,
            event_rx,
            ready_timeout,
        }
    }

    /// Send `uci` and wait for `uciok`.
    pub async fn handshake(&mut self) -> Result<(), EngineError> {
        self.send_command(EngineCommand::Uci).await?;
        self.await_ready("uciok").await
    }

    /// Send `isready` and wait for `readyok`.
    pub async fn wait_ready(&mut self) -> Result<(), EngineError> {
        self.send_command(EngineCommand::IsReady).await?;
        self.await_ready("readyok").await
    }

    pub async fn set_option(
        &mut self,
        name: &str,
        value: Option<String>,
    ) -> Result<(), EngineError> {
        self.send_command(EngineCommand::SetOption {
            name: name.to_string(),
            value,
        })
        .await
    }

    /// Set up a position, start a search and block until the best move.
    ///
    /// A `movetime` bounds the wait at the search time plus the ready
    /// timeout; without one the wait is unbounded.
    #[tracing::instrument(level = "debug", skip(self, start, moves), fields(plies = moves.len()))]
    pub async fn search(
        &mut self,
        start: &StartPosition,
        moves: &[LongMove],
        go: &GoParams,
    ) -> Result<SearchResult, EngineError> {
        self.send_command(EngineCommand::SetPosition {
            start: start.clone(),
            moves: moves.to_vec(),
        })
        .await?;
        self.send_command(EngineCommand::Go(go.clone())).await?;

        let limit = go
            .movetime
            .map(|ms| Duration::from_millis(ms) + self.ready_timeout);
        let event_rx = &mut self.event_rx;
        let collect = async {
            let mut last_info: Option<EngineInfo> = None;
            while let Some(event) = event_rx.recv().await {
                match event {
                    EngineEvent::Info(info) => {
                        if !info.pv.is_empty() {
                            last_info = Some(info);
                        }
                    }
                    EngineEvent::BestMove(best_move) => {
                        tracing::debug!("Received bestmove: {:?}", best_move);
                        return Ok(SearchResult {
                            best_move,
                            info: last_info,
                        });
                    }
                    EngineEvent::Error(e) => tracing::warn!("Engine output error: {}", e),
                    EngineEvent::Ready => {}
                }
            }
            Err(EngineError::Closed)
        };

        match limit {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| EngineError::Timeout("bestmove"))?,
            None => collect.await,
        }
    }

    /// Send a command to the engine
    pub async fn send_command(&self, cmd: EngineCommand) -> Result<(), EngineError> {
        tracing::debug!("Queueing command: {:?}", cmd);
        self.command_tx.send(cmd).await.map_err(|_| EngineError::Closed)
    }

    /// Receive an event from the engine (blocking)
    pub async fn recv_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }

    /// Shutdown the engine
    pub async fn shutdown(mut self) {
        let _ = self.send_command(EngineCommand::Quit).await;
        if let Some(mut process) = self.process.take() {
            let _ = tokio::time::timeout(Duration::from_secs(1), process.wait()).await;
            let _ = process.kill().await;
        }
    }

    async fn await_ready(&mut self, what: &'static str) -> Result<(), EngineError> {
        let ready_timeout = self.ready_timeout;
        let event_rx = &mut self.event_rx;
        let wait = async {
            while let Some(event) = event_rx.recv().await {
                match event {
                    EngineEvent::Ready => return Ok(()),
                    other => tracing::trace!("Skipping event while waiting for {}: {:?}", what, other),
                }
            }
            Err(EngineError::Closed)
        };
        match tokio::time::timeout(ready_timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Timeout waiting for {}", what);
                Err(EngineError::Timeout(what))
            }
        }
    }
}

async fn read_output<R>(reader: R, event_tx: mpsc::Sender<EngineEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                tracing::warn!("Engine stdout EOF - engine closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                tracing::trace!("UCI << {}", trimmed);

                let event = match parse_uci_message(trimmed) {
                    Ok(UciMessage::UciOk) | Ok(UciMessage::ReadyOk) => EngineEvent::Ready,
                    Ok(UciMessage::BestMove { mv, .. }) => EngineEvent::BestMove(mv),
                    Ok(UciMessage::Info(info)) if info.currmovenumber.is_some() => continue,
                    Ok(UciMessage::Info(info)) => EngineEvent::Info(info),
                    Ok(msg) => {
                        tracing::trace!("Ignoring UCI message: {:?}", msg);
                        continue;
                    }
                    Err(crate::UciError::UnknownMessage(text)) => {
                        tracing::trace!("Ignoring unknown output: {}", text);
                        continue;
                    }
                    Err(e) => EngineEvent::Error(e.to_string()),
                };

                if event_tx.send(event).await.is_err() {
                    tracing::debug!("Event receiver dropped");
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Error reading from engine stdout: {}", e);
                break;
            }
        }
    }
    tracing::info!("Output reader task exiting");
}

async fn write_commands<W>(mut writer: W, mut command_rx: mpsc::Receiver<EngineCommand>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(cmd) = command_rx.recv().await {
        let line = cmd.to_uci();
        tracing::trace!("UCI >> {}", line);

        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        };
        if let Err(e) = written.await {
            tracing::error!("Failed to write to engine stdin: {}", e);
            break;
        }
        if matches!(cmd, EngineCommand::Quit) {
            break;
        }
    }
    tracing::info!("Stdin writer task exiting");
}

/// Find Stockfish executable in common locations
pub fn find_stockfish_path() -> Option<PathBuf> {
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish", // In PATH
    ];

    for path_str in paths {
        let path = Path::new(path_str);
        if path.exists() || path_str == "stockfish" {
            // Stockfish answers `--help` by exiting; any successful launch will do.
            if std::process::Command::new(path_str)
                .arg("--help")
                .stdin(Stdio::null())
                .output()
                .is_ok()
            {
                return Some(PathBuf::from(path_str));
            }
        }
    }

    None
}
