//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::time::Duration;

use anyhow::Result;
use botfleet_common::AgentDescriptor;

use crate::domain::{ExitRecord, LogEntry, StopOutcome};

/// Channel every agent output line and supervisor event travels through.
pub type LogSender = tokio::sync::mpsc::UnboundedSender<LogEntry>;

// ── Credential Port ───────────────────────────────────────────────────────────

/// Persistent map from agent name to secret token.
pub trait CredentialStore {
    /// The stored token, or an empty string when none is set. Never fails.
    fn get(&self, agent: &str) -> String;

    /// Stores the trimmed `token` for `agent`.
    ///
    /// # Errors
    ///
    /// Returns a `CredentialError` for blank tokens, or an I/O error when the
    /// store cannot be persisted. The in-memory map is unchanged on error.
    fn set(&mut self, agent: &str, token: &str) -> Result<()>;

    /// Removes the token for `agent`; a no-op when none is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be persisted.
    fn clear(&mut self, agent: &str) -> Result<()>;
}

// ── Process Ports ─────────────────────────────────────────────────────────────

/// Starts agent processes.
pub trait AgentLauncher {
    type Process: AgentProcess;

    /// Launches `agent` with `token` injected. Every output line is sent on
    /// `log` tagged with the agent name.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn launch(&self, agent: &AgentDescriptor, token: &str, log: LogSender)
    -> Result<Self::Process>;
}

/// A launched agent process.
#[allow(async_fn_in_trait)]
pub trait AgentProcess {
    /// OS process id, when still known.
    fn id(&self) -> Option<u32>;

    /// Non-blocking check whether the process has exited.
    ///
    /// # Errors
    ///
    /// Returns an error if the process status cannot be queried.
    fn try_exit(&mut self) -> Result<Option<ExitRecord>>;

    /// Requests a graceful exit, waits up to `grace`, then kills.
    ///
    /// # Errors
    ///
    /// Returns an error if signalling or reaping the process fails.
    async fn terminate(&mut self, grace: Duration) -> Result<StopOutcome>;
}
