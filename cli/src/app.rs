//! Application context: unified state passed to every command handler.
//!
//! Commands never construct stores or launchers themselves; they ask the
//! context for a wired [`Fleet`].

use anyhow::Result;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::application::services::fleet::FleetSupervisor;
use crate::domain::LogEntry;
use crate::infra::{FleetPaths, JsonCredentialStore, ProcessLauncher, load_registry};
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Supervisor wired to the on-disk credential store and real processes.
pub type Fleet = FleetSupervisor<JsonCredentialStore, ProcessLauncher>;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `BOTFLEET_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Data directory layout.
    pub paths: FleetPaths,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        Ok(Self::with_paths(flags, FleetPaths::from_env()?))
    }

    /// Same as [`Self::new`] with an explicit data directory.
    #[must_use]
    pub fn with_paths(flags: &AppFlags, paths: FleetPaths) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("BOTFLEET_YES").is_ok();
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            paths,
            non_interactive: flags.behaviour.yes || ci_env,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Loads the registry and credentials and builds a supervisor with every
    /// agent stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry file is invalid or the agent binary
    /// cannot be located.
    pub fn supervisor(&self) -> Result<(Fleet, UnboundedReceiver<LogEntry>)> {
        let registry = load_registry(&self.paths.registry())?;
        let store = JsonCredentialStore::open(self.paths.tokens());
        let launcher = ProcessLauncher::sibling_agent()?;
        tracing::debug!(agents = registry.len(), home = %self.paths.home().display(), "fleet loaded");
        Ok(FleetSupervisor::new(registry, store, launcher))
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `BOTFLEET_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
