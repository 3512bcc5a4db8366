pub mod stockfish;
pub mod uci;

pub use stockfish::{find_stockfish_path, EngineConfig, SearchResult, StockfishEngine};
pub use uci::{parse_uci_message, UciError, UciMessage};

use chess::{AnalysisScore, LongMove, StartPosition};

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Uci,
    IsReady,
    SetPosition {
        start: StartPosition,
        moves: Vec<LongMove>,
    },
    SetOption {
        name: String,
        value: Option<String>,
    },
    Go(GoParams),
    Stop,
    Quit,
}

impl EngineCommand {
    /// The UCI line for this command, without the trailing newline.
    pub fn to_uci(&self) -> String {
        match self {
            Self::Uci => "uci".to_string(),
            Self::IsReady => "isready".to_string(),
            Self::SetPosition { start, moves } => {
                let mut cmd = match start {
                    StartPosition::Standard => "position startpos".to_string(),
                    StartPosition::Fen(fen) => format!("position fen {}", fen),
                };
                if !moves.is_empty() {
                    cmd.push_str(" moves");
                    for mv in moves {
                        cmd.push(' ');
                        cmd.push_str(&mv.to_string());
                    }
                }
                cmd
            }
            Self::SetOption { name, value } => match value {
                Some(value) => format!("setoption name {} value {}", name, value),
                None => format!("setoption name {}", name),
            },
            Self::Go(params) => params.to_uci(),
            Self::Stop => "stop".to_string(),
            Self::Quit => "quit".to_string(),
        }
    }
}

/// Parameters for the "go" command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<u32>,
    pub movetime: Option<u64>, // Move time in milliseconds
    pub infinite: bool,        // Search until "stop"
}

impl GoParams {
    fn to_uci(&self) -> String {
        let mut cmd = "go".to_string();
        if let Some(depth) = self.depth {
            cmd.push_str(&format!(" depth {}", depth));
        }
        if let Some(movetime) = self.movetime {
            cmd.push_str(&format!(" movetime {}", movetime));
        }
        if self.infinite {
            cmd.push_str(" infinite");
        }
        cmd
    }
}

/// Events received from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Ready,
    /// `None` when the engine reports `bestmove (none)`.
    BestMove(Option<LongMove>),
    Info(EngineInfo),
    Error(String),
}

/// Engine analysis information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    /// From the side to move's point of view.
    pub score: Option<AnalysisScore>,
    pub pv: Vec<LongMove>, // Principal variation
    pub multipv: Option<u32>,
    pub currmove: Option<LongMove>,
    pub currmovenumber: Option<u32>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Stockfish not found")]
    NotFound,
    #[error("Failed to spawn engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Engine has no {0}")]
    MissingPipe(&'static str),
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("Engine closed its output")]
    Closed,
}
