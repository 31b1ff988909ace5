use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Agent names double as credential keys and log tags, so they stay short
/// and shell-safe.
pub static AGENT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex")
});

/// Errors raised while building or querying an agent registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid agent name '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidName(String),

    #[error("Agent '{0}' is registered more than once")]
    Duplicate(String),

    #[error("Agent '{name}' has an empty flow id")]
    EmptyFlow { name: String },
}

/// Static description of one agent the supervisor can launch.
///
/// Immutable once the registry is loaded; never created at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique, human-readable name. Also the credential key.
    pub name: String,
    /// Dialogue flow the agent process runs (e.g. `"crypto"`).
    pub flow: String,
    /// Explicit path to the agent executable. When absent the supervisor
    /// resolves the `chat-agent` binary next to itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    /// Optional one-line description shown in listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AgentDescriptor {
    #[must_use]
    pub fn new(name: &str, flow: &str) -> Self {
        Self {
            name: name.to_string(),
            flow: flow.to_string(),
            program: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }
}

/// Validates an agent name against [`AGENT_NAME_RE`].
///
/// # Errors
///
/// Returns [`RegistryError::InvalidName`] when the name does not match.
pub fn validate_agent_name(name: &str) -> Result<(), RegistryError> {
    if AGENT_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(RegistryError::InvalidName(name.to_string()))
    }
}

/// Ordered set of agent descriptors, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRegistry {
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
}

impl AgentRegistry {
    /// Builds a registry, rejecting invalid or duplicate names.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] found by [`Self::validate`].
    pub fn new(agents: Vec<AgentDescriptor>) -> Result<Self, RegistryError> {
        let registry = Self { agents };
        registry.validate()?;
        Ok(registry)
    }

    /// Checks every descriptor; used after deserializing a registry file.
    ///
    /// # Errors
    ///
    /// Invalid name, empty flow id or a name used twice.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut seen = std::collections::HashSet::new();
        for agent in &self.agents {
            validate_agent_name(&agent.name)?;
            if agent.flow.trim().is_empty() {
                return Err(RegistryError::EmptyFlow {
                    name: agent.name.clone(),
                });
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(RegistryError::Duplicate(agent.name.clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// The four agents shipped with botfleet, one per built-in flow.
#[must_use]
pub fn builtin_agents() -> AgentRegistry {
    AgentRegistry {
        agents: vec![
            AgentDescriptor::new("iq-test", "iq-test")
                .with_description("IQ test sign-up: birth date, then phone"),
            AgentDescriptor::new("registration", "registration")
                .with_description("Service registration: phone only"),
            AgentDescriptor::new("crypto", "crypto")
                .with_description("Crypto desk: buy/sell, instrument, then phone"),
            AgentDescriptor::new("giveaway", "giveaway")
                .with_description("Giveaway entry: phone only"),
        ],
    }
}
