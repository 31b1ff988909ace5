//! Contract between the supervisor and the agent processes it launches.
//!
//! The supervisor injects the credential and flow through environment
//! variables; the agent reads them back with `envy` using [`env::PREFIX`].

/// Environment variable names understood by `chat-agent`.
pub mod env {
    /// Prefix for every agent setting (`envy::prefixed`).
    pub const PREFIX: &str = "BOTFLEET_AGENT_";
    /// Transport credential injected by the supervisor.
    pub const TOKEN: &str = "BOTFLEET_AGENT_TOKEN";
    /// Flow id the agent should run.
    pub const FLOW: &str = "BOTFLEET_AGENT_FLOW";
    /// Agent name, used to tag log output.
    pub const NAME: &str = "BOTFLEET_AGENT_NAME";
    /// Set to `true` when running under the supervisor (plain log output).
    pub const SUPERVISED: &str = "BOTFLEET_AGENT_SUPERVISED";
    /// Overrides the supervisor's data directory (`~/.botfleet`).
    pub const HOME: &str = "BOTFLEET_HOME";
}

/// Defaults shared by both sides of the process boundary.
pub mod defaults {
    use std::time::Duration;

    /// File name of the agent binary the supervisor launches.
    pub const AGENT_BINARY: &str = "chat-agent";

    /// Events admitted per user within one rate window.
    pub const RATE_LIMIT: usize = 5;
    /// Length of the sliding rate window.
    pub const RATE_WINDOW: Duration = Duration::from_secs(60);

    /// How long `stop` waits for a graceful exit before killing.
    pub const STOP_GRACE: Duration = Duration::from_secs(3);

    /// First delay before restarting a failed connection loop.
    pub const RESTART_BACKOFF: Duration = Duration::from_secs(5);
    /// Upper bound for the exponential restart delay.
    pub const RESTART_MAX_BACKOFF: Duration = Duration::from_secs(60);
    /// Consecutive connection failures tolerated before giving up.
    pub const RESTART_MAX_RETRIES: u32 = 5;
}
