//! Filesystem locations and the agent registry file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use botfleet_common::{AgentRegistry, builtin_agents, env};

/// Data directory layout (`~/.botfleet` unless `BOTFLEET_HOME` is set).
#[derive(Debug, Clone)]
pub struct FleetPaths {
    home: PathBuf,
}

impl FleetPaths {
    /// Resolves the data directory from `BOTFLEET_HOME` or the user's home.
    ///
    /// # Errors
    ///
    /// Returns an error if neither is available.
    pub fn from_env() -> Result<Self> {
        if let Some(home) = std::env::var_os(env::HOME).filter(|v| !v.is_empty()) {
            return Ok(Self::with_home(PathBuf::from(home)));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_home(home.join(".botfleet")))
    }

    /// Uses an explicit data directory (used in tests).
    #[must_use]
    pub fn with_home(home: PathBuf) -> Self {
        Self { home }
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    #[must_use]
    pub fn tokens(&self) -> PathBuf {
        self.home.join("tokens.json")
    }

    #[must_use]
    pub fn registry(&self) -> PathBuf {
        self.home.join("agents.yaml")
    }
}

/// Loads `path`, or the built-in registry when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed or
/// validated.
pub fn load_registry(path: &Path) -> Result<AgentRegistry> {
    if !path.exists() {
        return Ok(builtin_agents());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading agent registry {}", path.display()))?;
    let registry: AgentRegistry = serde_yaml::from_str(&content)
        .with_context(|| format!("parsing agent registry {}", path.display()))?;
    registry
        .validate()
        .with_context(|| format!("invalid agent registry {}", path.display()))?;
    Ok(registry)
}
