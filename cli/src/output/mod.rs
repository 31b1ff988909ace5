//! Output formatting module

pub mod human;
pub mod json;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use styles::Styles;

use crate::domain::{ActionReport, AgentView, LogEntry, StopOutcome};

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Renders command results in the mode selected by `--json`.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// Render the agent listing.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn agents(&self, agents: &[AgentView]) -> anyhow::Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_agents(agents);
                Ok(())
            }
            Renderer::Json(r) => r.render_agents(agents),
        }
    }

    /// Render one line of the aggregated log.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn log_entry(&self, entry: &LogEntry) -> anyhow::Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_log_entry(entry);
                Ok(())
            }
            Renderer::Json(r) => r.render_log_entry(entry),
        }
    }

    /// Render the per-agent outcome of a fleet-wide action.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn reports(&self, action: &str, reports: &[(String, ActionReport)]) -> anyhow::Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_reports(action, reports);
                Ok(())
            }
            Renderer::Json(r) => r.render_reports(action, reports),
        }
    }

    /// Render the (masked) credential of one agent.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn token(&self, agent: &str, masked: Option<&str>) -> anyhow::Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_token(agent, masked);
                Ok(())
            }
            Renderer::Json(r) => r.render_token(agent, masked),
        }
    }

    /// Render a confirmation for a single-agent change.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn done(&self, agent: &str, action: &str, message: &str) -> anyhow::Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_done(message);
                Ok(())
            }
            Renderer::Json(r) => r.render_done(agent, action),
        }
    }

    /// Render how a stop concluded.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn stopped(&self, agent: &str, outcome: StopOutcome) -> anyhow::Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_done(&format!("{agent} {outcome}"));
                Ok(())
            }
            Renderer::Json(r) => r.render_stopped(agent, outcome),
        }
    }
}
