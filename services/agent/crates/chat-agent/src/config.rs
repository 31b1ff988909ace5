//! Agent configuration loaded from `BOTFLEET_AGENT_*` environment variables.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use botfleet_common::{defaults, env};
use serde::Deserialize;

use crate::supervise::RestartPolicy;

/// Each field maps to `BOTFLEET_AGENT_<FIELD>`.
#[derive(Clone, Deserialize)]
pub struct AgentConfig {
    /// Agent name used in log lines; falls back to the flow id.
    pub name: Option<String>,

    #[serde(default = "default_flow")]
    pub flow: String,

    /// YAML file replacing the built-in flows.
    pub flow_file: Option<PathBuf>,

    /// Transport credential. A positional CLI argument takes precedence.
    pub token: Option<String>,

    /// Set by the supervisor; switches logs to plain text.
    #[serde(default)]
    pub supervised: bool,

    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,

    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,

    #[serde(default = "default_restart_backoff_secs")]
    pub restart_backoff_secs: u64,

    #[serde(default = "default_restart_max_backoff_secs")]
    pub restart_max_backoff_secs: u64,

    #[serde(default = "default_restart_max_retries")]
    pub restart_max_retries: u32,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Session workers without input for this long hand their session back.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

// Keeps the token out of startup logs.
impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("name", &self.name)
            .field("flow", &self.flow)
            .field("flow_file", &self.flow_file)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("supervised", &self.supervised)
            .field("rate_limit", &self.rate_limit)
            .field("rate_window_secs", &self.rate_window_secs)
            .field("restart_backoff_secs", &self.restart_backoff_secs)
            .field("restart_max_backoff_secs", &self.restart_max_backoff_secs)
            .field("restart_max_retries", &self.restart_max_retries)
            .field("api_base", &self.api_base)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("session_idle_secs", &self.session_idle_secs)
            .finish()
    }
}

impl AgentConfig {
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        envy::prefixed(env::PREFIX)
            .from_env()
            .context("failed to load config from BOTFLEET_AGENT_* env vars")
    }

    /// Same as [`AgentConfig::from_env`] over explicit pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is malformed.
    pub fn from_iter<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(env::PREFIX)
            .from_iter(vars)
            .context("invalid BOTFLEET_AGENT_* configuration")
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.flow)
    }

    #[must_use]
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    #[must_use]
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    #[must_use]
    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy {
            initial: Duration::from_secs(self.restart_backoff_secs),
            max: Duration::from_secs(self.restart_max_backoff_secs),
            max_retries: self.restart_max_retries,
        }
    }
}

fn default_flow() -> String {
    "registration".to_string()
}

fn default_rate_limit() -> usize {
    defaults::RATE_LIMIT
}

fn default_rate_window_secs() -> u64 {
    defaults::RATE_WINDOW.as_secs()
}

fn default_restart_backoff_secs() -> u64 {
    defaults::RESTART_BACKOFF.as_secs()
}

fn default_restart_max_backoff_secs() -> u64 {
    defaults::RESTART_MAX_BACKOFF.as_secs()
}

fn default_restart_max_retries() -> u32 {
    defaults::RESTART_MAX_RETRIES
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_session_idle_secs() -> u64 {
    30 * 60
}
