//! Domain logic for agent slots: pure functions, no I/O, no async.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.

use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Runtime status of one agent slot.
///
/// `Stopped → Starting → Running → Stopping → Stopped`. A process that dies
/// on its own leaves the slot `Running` with an [`ExitRecord`] until the
/// user stops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl AgentStatus {
    /// `true` whenever a process handle may exist.
    #[must_use]
    pub fn is_active(self) -> bool {
        self != AgentStatus::Stopped
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStatus::Stopped => "stopped",
            AgentStatus::Starting => "starting",
            AgentStatus::Running => "running",
            AgentStatus::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Operations a front-end may offer for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentAction {
    #[serde(rename = "set-token")]
    SetCredential,
    #[serde(rename = "clear-token")]
    ClearCredential,
    Start,
    Stop,
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentAction::SetCredential => "set-token",
            AgentAction::ClearCredential => "clear-token",
            AgentAction::Start => "start",
            AgentAction::Stop => "stop",
        };
        f.write_str(s)
    }
}

/// Actions permitted for an agent in the given state.
///
/// Credentials can only change while the agent is stopped, start needs a
/// credential, and transient states permit nothing.
#[must_use]
pub fn allowed_actions(has_credential: bool, status: AgentStatus) -> Vec<AgentAction> {
    match status {
        AgentStatus::Stopped if has_credential => vec![
            AgentAction::SetCredential,
            AgentAction::ClearCredential,
            AgentAction::Start,
        ],
        AgentStatus::Stopped => vec![AgentAction::SetCredential],
        AgentStatus::Running => vec![AgentAction::Stop],
        AgentStatus::Starting | AgentStatus::Stopping => Vec::new(),
    }
}

/// How a stop request concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopOutcome {
    /// Exited within the grace period after SIGTERM.
    Graceful,
    /// Ignored SIGTERM and was killed.
    Killed,
    /// Was already gone when the stop was requested.
    AlreadyExited,
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopOutcome::Graceful => "stopped",
            StopOutcome::Killed => "killed after grace period",
            StopOutcome::AlreadyExited => "had already exited",
        };
        f.write_str(s)
    }
}

/// Exit status of an agent process that ended on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitRecord {
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
    pub at: DateTime<Local>,
}

impl ExitRecord {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ExitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exited with code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Result of one agent within a fleet-wide operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "lowercase")]
pub enum ActionReport {
    Done,
    Skipped(String),
    Failed(String),
}

/// Snapshot of one agent for listings.
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub name: String,
    pub flow: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Masked credential, `None` when unset.
    pub credential: Option<String>,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<ExitRecord>,
    pub allowed_actions: Vec<AgentAction>,
}
