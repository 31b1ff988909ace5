pub mod agent;
pub mod config;

pub use agent::{
    AGENT_NAME_RE, AgentDescriptor, AgentRegistry, RegistryError, builtin_agents,
    validate_agent_name,
};
pub use config::{env, defaults};
