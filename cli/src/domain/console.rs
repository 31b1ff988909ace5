//! Line commands understood by the interactive console.

use thiserror::Error;

/// Entries shown by `log` when no count is given.
pub const DEFAULT_LOG_TAIL: usize = 20;

/// Usage lines printed by `help`, in display order.
pub const CONSOLE_HELP: &[(&str, &str)] = &[
    ("start <agent>", "launch one agent"),
    ("stop <agent>", "stop one agent (SIGTERM, then kill)"),
    ("start-all", "launch every agent that has a token"),
    ("stop-all", "stop every running agent"),
    ("set <agent> <token>", "store an agent's token"),
    ("clear <agent>", "remove an agent's token"),
    ("status", "list agents"),
    ("log [n]", "show the last n log lines"),
    ("help", "show this help"),
    ("quit", "stop every agent and exit"),
];

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start(String),
    Stop(String),
    StartAll,
    StopAll,
    Set { agent: String, token: String },
    Clear(String),
    Status,
    Log(usize),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Unknown command '{0}'. Type 'help' for a list.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl ConsoleCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] for unknown verbs or wrong arity.
    pub fn parse(line: &str) -> Result<Option<Self>, ConsoleError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((verb, args)) = words.split_first() else {
            return Ok(None);
        };
        let verb = verb.to_ascii_lowercase();
        let command = match (verb.as_str(), args) {
            ("start", [agent]) => Self::Start((*agent).to_string()),
            ("start", _) => return Err(ConsoleError::Usage("start <agent>")),
            ("stop", [agent]) => Self::Stop((*agent).to_string()),
            ("stop", _) => return Err(ConsoleError::Usage("stop <agent>")),
            ("start-all", []) => Self::StartAll,
            ("stop-all", []) => Self::StopAll,
            ("set", [agent, token]) => Self::Set {
                agent: (*agent).to_string(),
                token: (*token).to_string(),
            },
            ("set", _) => return Err(ConsoleError::Usage("set <agent> <token>")),
            ("clear", [agent]) => Self::Clear((*agent).to_string()),
            ("clear", _) => return Err(ConsoleError::Usage("clear <agent>")),
            ("status" | "ls", []) => Self::Status,
            ("log", []) => Self::Log(DEFAULT_LOG_TAIL),
            ("log", [n]) => Self::Log(n.parse().map_err(|_| ConsoleError::Usage("log [n]"))?),
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit" | "q", []) => Self::Quit,
            _ => return Err(ConsoleError::Unknown(line.trim().to_string())),
        };
        Ok(Some(command))
    }
}
