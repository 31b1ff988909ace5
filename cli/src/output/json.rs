//! JSON output helpers.
//!
//! Listings are printed pretty; streamed log entries are printed one
//! compact object per line so they can be piped into `jq`.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{ActionReport, AgentView, LogEntry, StopOutcome};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Machine-readable renderer for `--json`.
pub struct JsonRenderer;

#[derive(Serialize)]
struct Report<'a> {
    agent: &'a str,
    #[serde(flatten)]
    report: &'a ActionReport,
}

impl JsonRenderer {
    fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<()> {
        let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_agents(&self, agents: &[AgentView]) -> Result<()> {
        Self::pretty(&serde_json::json!({ "agents": agents }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_log_entry(&self, entry: &LogEntry) -> Result<()> {
        let out = serde_json::to_string(entry).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_reports(&self, action: &str, reports: &[(String, ActionReport)]) -> Result<()> {
        let results: Vec<Report<'_>> = reports
            .iter()
            .map(|(agent, report)| Report { agent, report })
            .collect();
        Self::pretty(&serde_json::json!({ "action": action, "results": results }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_token(&self, agent: &str, masked: Option<&str>) -> Result<()> {
        Self::pretty(&serde_json::json!({ "agent": agent, "token": masked }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_done(&self, agent: &str, action: &str) -> Result<()> {
        Self::pretty(&serde_json::json!({ "agent": agent, "action": action, "ok": true }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_stopped(&self, agent: &str, outcome: StopOutcome) -> Result<()> {
        Self::pretty(&serde_json::json!({ "agent": agent, "action": "stop", "outcome": outcome }))
    }
}
