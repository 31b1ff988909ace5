//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

use crate::domain::agent::AgentStatus;

// ── Fleet errors ──────────────────────────────────────────────────────────────

/// Precondition failures of fleet operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FleetError {
    #[error("Agent '{0}' not found. Run 'botfleet agents' to list agents.")]
    NotFound(String),

    #[error("Agent '{0}' has no token. Set one with: botfleet token set {0} <TOKEN>")]
    NoCredential(String),

    #[error("Agent '{agent}' is {status}. Stop it first.")]
    Busy { agent: String, status: AgentStatus },

    #[error("Agent '{0}' is already running.")]
    AlreadyRunning(String),

    #[error("Agent '{0}' is not running.")]
    NotRunning(String),
}

// ── Credential errors ─────────────────────────────────────────────────────────

/// Validation failures of credential input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Token must not be empty.")]
    EmptyToken,
}
