//! Shared mock infrastructure for unit tests.
//!
//! In-memory implementations of the credential and process ports so the
//! supervisor can be driven without touching disk or spawning processes.

#![allow(clippy::expect_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use botfleet_cli::application::ports::{AgentLauncher, AgentProcess, CredentialStore, LogSender};
use botfleet_cli::domain::{ExitRecord, LogEntry, LogSource, StopOutcome, validate_token};
use botfleet_common::AgentDescriptor;
use chrono::Local;

/// Pid every mock process reports.
pub const MOCK_PID: u32 = 4242;

// ── Credential store ──────────────────────────────────────────────────────────

/// Token map shared with the test so it can be inspected after the store
/// moved into the supervisor.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    pub tokens: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryCredentialStore {
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.tokens.lock().expect("lock").clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, agent: &str) -> String {
        self.tokens
            .lock()
            .expect("lock")
            .get(agent)
            .cloned()
            .unwrap_or_default()
    }

    fn set(&mut self, agent: &str, token: &str) -> Result<()> {
        let token = validate_token(token)?;
        self.tokens
            .lock()
            .expect("lock")
            .insert(agent.to_string(), token);
        Ok(())
    }

    fn clear(&mut self, agent: &str) -> Result<()> {
        self.tokens.lock().expect("lock").remove(agent);
        Ok(())
    }
}

// ── Launcher ──────────────────────────────────────────────────────────────────

/// Launcher whose processes obey the knobs set by the test.
#[derive(Clone)]
pub struct MockLauncher {
    /// Fail every launch with "spawn failed".
    pub fail: bool,
    /// What `terminate` reports for a live process.
    pub outcome: StopOutcome,
    /// `(agent, token)` of every successful launch.
    pub launches: Arc<Mutex<Vec<(String, String)>>>,
    /// Agents whose process has exited, with the exit code to report.
    pub exits: Arc<Mutex<HashMap<String, Option<i32>>>>,
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self {
            fail: false,
            outcome: StopOutcome::Graceful,
            launches: Arc::default(),
            exits: Arc::default(),
        }
    }
}

impl MockLauncher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn ignoring_sigterm() -> Self {
        Self {
            outcome: StopOutcome::Killed,
            ..Self::default()
        }
    }

    pub fn launched(&self) -> Vec<(String, String)> {
        self.launches.lock().expect("lock").clone()
    }

    /// Simulates the process of `agent` exiting on its own.
    pub fn exit(&self, agent: &str, code: Option<i32>) {
        self.exits
            .lock()
            .expect("lock")
            .insert(agent.to_string(), code);
    }
}

pub struct MockProcess {
    agent: String,
    outcome: StopOutcome,
    exits: Arc<Mutex<HashMap<String, Option<i32>>>>,
}

impl AgentLauncher for MockLauncher {
    type Process = MockProcess;

    fn launch(&self, agent: &AgentDescriptor, token: &str, log: LogSender) -> Result<MockProcess> {
        if self.fail {
            anyhow::bail!("spawn failed");
        }
        self.launches
            .lock()
            .expect("lock")
            .push((agent.name.clone(), token.to_string()));
        self.exits.lock().expect("lock").remove(&agent.name);
        let _ = log.send(LogEntry::new(
            &agent.name,
            LogSource::Stdout,
            format!("{} online", agent.flow),
        ));
        Ok(MockProcess {
            agent: agent.name.clone(),
            outcome: self.outcome,
            exits: Arc::clone(&self.exits),
        })
    }
}

impl AgentProcess for MockProcess {
    fn id(&self) -> Option<u32> {
        Some(MOCK_PID)
    }

    fn try_exit(&mut self) -> Result<Option<ExitRecord>> {
        Ok(self
            .exits
            .lock()
            .expect("lock")
            .get(&self.agent)
            .map(|code| ExitRecord {
                code: *code,
                at: Local::now(),
            }))
    }

    async fn terminate(&mut self, _grace: Duration) -> Result<StopOutcome> {
        if self.exits.lock().expect("lock").contains_key(&self.agent) {
            return Ok(StopOutcome::AlreadyExited);
        }
        Ok(self.outcome)
    }
}
