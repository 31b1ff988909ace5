//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod agent;
pub mod console;
pub mod credential;
pub mod error;
pub mod log;

pub use agent::{
    ActionReport, AgentAction, AgentStatus, AgentView, ExitRecord, StopOutcome, allowed_actions,
};
pub use console::{CONSOLE_HELP, ConsoleCommand, ConsoleError, DEFAULT_LOG_TAIL};
pub use credential::{mask_token, validate_token};
pub use error::{CredentialError, FleetError};
pub use log::{LogBuffer, LogEntry, LogSource};
