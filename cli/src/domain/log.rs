//! Aggregated agent output.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Default number of lines kept by the supervisor.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Stdout,
    Stderr,
    /// Lifecycle events emitted by the supervisor itself.
    Supervisor,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogSource::Stdout => "out",
            LogSource::Stderr => "err",
            LogSource::Supervisor => "fleet",
        };
        f.write_str(s)
    }
}

/// One line of output, tagged with the agent it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub agent: String,
    pub source: LogSource,
    pub line: String,
    pub at: DateTime<Local>,
}

impl LogEntry {
    #[must_use]
    pub fn new(agent: &str, source: LogSource, line: impl Into<String>) -> Self {
        Self {
            agent: agent.to_string(),
            source,
            line: line.into(),
            at: Local::now(),
        }
    }

    #[must_use]
    pub fn event(agent: &str, line: impl Into<String>) -> Self {
        Self::new(agent, LogSource::Supervisor, line)
    }
}

/// Bounded ring buffer of log entries in arrival order.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    capacity: usize,
    entries: VecDeque<LogEntry>,
}

impl LogBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.clamp(1, DEFAULT_LOG_CAPACITY)),
        }
    }

    /// Appends `entry`, evicting the oldest when full.
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The newest `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
