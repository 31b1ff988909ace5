//! Application service: fleet supervision use-cases.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.
//!
//! `FleetSupervisor` is owned by a single control loop (`&mut self`), so a
//! credential edit can never race a start or stop of the same agent.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use botfleet_common::{AgentDescriptor, AgentRegistry, defaults};
use tokio::sync::mpsc;

use crate::application::ports::{AgentLauncher, AgentProcess, CredentialStore, LogSender};
use crate::domain::{
    ActionReport, AgentStatus, AgentView, ExitRecord, FleetError, LogBuffer, LogEntry,
    StopOutcome, allowed_actions, mask_token, validate_token,
};

struct Slot<P> {
    status: AgentStatus,
    process: Option<P>,
    exit: Option<ExitRecord>,
}

impl<P> Default for Slot<P> {
    fn default() -> Self {
        Self {
            status: AgentStatus::Stopped,
            process: None,
            exit: None,
        }
    }
}

/// Owns every agent slot, the credential store and the aggregated log.
pub struct FleetSupervisor<S, L: AgentLauncher> {
    registry: AgentRegistry,
    store: S,
    launcher: L,
    slots: HashMap<String, Slot<L::Process>>,
    log: LogBuffer,
    log_tx: LogSender,
    grace: Duration,
}

impl<S: CredentialStore, L: AgentLauncher> FleetSupervisor<S, L> {
    /// Creates a supervisor with every agent `Stopped`.
    ///
    /// The returned receiver yields agent output and lifecycle events in
    /// arrival order; feed each entry back through [`Self::record`].
    pub fn new(
        registry: AgentRegistry,
        store: S,
        launcher: L,
    ) -> (Self, mpsc::UnboundedReceiver<LogEntry>) {
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        let slots = registry
            .names()
            .map(|name| (name.to_string(), Slot::default()))
            .collect();
        let supervisor = Self {
            registry,
            store,
            launcher,
            slots,
            log: LogBuffer::default(),
            log_tx,
            grace: defaults::STOP_GRACE,
        };
        (supervisor, log_rx)
    }

    /// Overrides how long `stop` waits before killing.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log = LogBuffer::new(capacity);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] for unknown agents.
    pub fn status(&self, name: &str) -> Result<AgentStatus> {
        Ok(self.slot(name)?.status)
    }

    /// The stored token, empty when none is set.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] for unknown agents.
    pub fn credential(&self, name: &str) -> Result<String> {
        self.descriptor(name)?;
        Ok(self.store.get(name))
    }

    /// Stores a credential for a stopped agent.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Busy`] while the agent is active, a
    /// `CredentialError` for blank tokens, or the store's I/O error.
    pub fn set_credential(&mut self, name: &str, token: &str) -> Result<()> {
        self.ensure_idle(name)?;
        let token = validate_token(token)?;
        self.store
            .set(name, &token)
            .with_context(|| format!("saving token for '{name}'"))?;
        tracing::debug!(agent = name, "credential stored");
        Ok(())
    }

    /// Removes the credential of a stopped agent.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Busy`] while the agent is active, or the
    /// store's I/O error.
    pub fn clear_credential(&mut self, name: &str) -> Result<()> {
        self.ensure_idle(name)?;
        self.store
            .clear(name)
            .with_context(|| format!("removing token for '{name}'"))?;
        tracing::debug!(agent = name, "credential cleared");
        Ok(())
    }

    /// Launches a stopped agent with its credential injected.
    ///
    /// # Errors
    ///
    /// Returns a [`FleetError`] when the agent is unknown, active or has no
    /// credential, or the launcher's error. A failed launch leaves the agent
    /// `Stopped`.
    pub fn start(&mut self, name: &str) -> Result<()> {
        let descriptor = self.descriptor(name)?.clone();
        match self.slot(name)?.status {
            AgentStatus::Stopped => {}
            AgentStatus::Running => return Err(FleetError::AlreadyRunning(name.to_string()).into()),
            status => {
                return Err(FleetError::Busy {
                    agent: name.to_string(),
                    status,
                }
                .into());
            }
        }
        let token = self.store.get(name);
        if token.trim().is_empty() {
            return Err(FleetError::NoCredential(name.to_string()).into());
        }

        self.slot_mut(name)?.status = AgentStatus::Starting;
        let launched = self.launcher.launch(&descriptor, &token, self.log_tx.clone());
        let slot = self.slot_mut(name)?;
        match launched {
            Ok(process) => {
                let pid = process.id();
                slot.process = Some(process);
                slot.exit = None;
                slot.status = AgentStatus::Running;
                let line = match pid {
                    Some(pid) => format!("started (pid {pid})"),
                    None => "started".to_string(),
                };
                self.emit(name, line);
                Ok(())
            }
            Err(error) => {
                slot.status = AgentStatus::Stopped;
                self.emit(name, format!("failed to start: {error:#}"));
                Err(error.context(format!("failed to start agent '{name}'")))
            }
        }
    }

    /// Stops a running agent: SIGTERM, grace period, then kill.
    ///
    /// The agent ends `Stopped` however the process went away.
    ///
    /// # Errors
    ///
    /// Returns a [`FleetError`] when the agent is unknown or not running, or
    /// the error raised while terminating (the slot is `Stopped` anyway).
    pub async fn stop(&mut self, name: &str) -> Result<StopOutcome> {
        match self.slot(name)?.status {
            AgentStatus::Running => {}
            AgentStatus::Stopped => return Err(FleetError::NotRunning(name.to_string()).into()),
            status => {
                return Err(FleetError::Busy {
                    agent: name.to_string(),
                    status,
                }
                .into());
            }
        }

        let grace = self.grace;
        let slot = self.slot_mut(name)?;
        slot.status = AgentStatus::Stopping;
        let process = slot.process.take();

        let result = match process {
            Some(mut process) => process.terminate(grace).await,
            None => Ok(StopOutcome::AlreadyExited),
        };

        self.slot_mut(name)?.status = AgentStatus::Stopped;
        match &result {
            Ok(outcome) => self.emit(name, outcome.to_string()),
            Err(error) => self.emit(name, format!("stop failed: {error:#}")),
        }
        result.with_context(|| format!("stopping agent '{name}'"))
    }

    /// Starts every stopped agent that has a credential.
    pub fn start_all(&mut self) -> Vec<(String, ActionReport)> {
        let names: Vec<String> = self.registry.names().map(String::from).collect();
        names
            .into_iter()
            .map(|name| {
                let report = match self.status(&name) {
                    Ok(AgentStatus::Stopped) if self.store.get(&name).trim().is_empty() => {
                        ActionReport::Skipped("no token".to_string())
                    }
                    Ok(AgentStatus::Stopped) => match self.start(&name) {
                        Ok(()) => ActionReport::Done,
                        Err(error) => ActionReport::Failed(format!("{error:#}")),
                    },
                    Ok(status) => ActionReport::Skipped(status.to_string()),
                    Err(error) => ActionReport::Failed(format!("{error:#}")),
                };
                (name, report)
            })
            .collect()
    }

    /// Stops every running agent.
    pub async fn stop_all(&mut self) -> Vec<(String, ActionReport)> {
        let names: Vec<String> = self.registry.names().map(String::from).collect();
        let mut reports = Vec::with_capacity(names.len());
        for name in names {
            let report = match self.status(&name) {
                Ok(AgentStatus::Running) => match self.stop(&name).await {
                    Ok(_) => ActionReport::Done,
                    Err(error) => ActionReport::Failed(format!("{error:#}")),
                },
                Ok(status) => ActionReport::Skipped(status.to_string()),
                Err(error) => ActionReport::Failed(format!("{error:#}")),
            };
            reports.push((name, report));
        }
        reports
    }

    /// Reaps agents whose process exited on its own.
    ///
    /// Each exit is reported once, recorded on the slot and emitted as an
    /// event. The slot stays `Running` until it is stopped explicitly.
    pub fn refresh(&mut self) -> Vec<(String, ExitRecord)> {
        let mut exits = Vec::new();
        for name in self.registry.names() {
            let Some(slot) = self.slots.get_mut(name) else {
                continue;
            };
            if slot.status != AgentStatus::Running || slot.exit.is_some() {
                continue;
            }
            let Some(process) = slot.process.as_mut() else {
                continue;
            };
            match process.try_exit() {
                Ok(Some(exit)) => {
                    slot.exit = Some(exit.clone());
                    exits.push((name.to_string(), exit));
                }
                Ok(None) => {}
                Err(error) => tracing::warn!(agent = name, "cannot query process: {error:#}"),
            }
        }
        for (name, exit) in &exits {
            self.emit(name, exit.to_string());
        }
        exits
    }

    /// Appends an entry received from the log channel to the ring buffer.
    pub fn record(&mut self, entry: &LogEntry) {
        self.log.push(entry.clone());
    }

    #[must_use]
    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Listing snapshot in registry order.
    #[must_use]
    pub fn views(&self) -> Vec<AgentView> {
        self.registry
            .agents
            .iter()
            .map(|agent| {
                let token = self.store.get(&agent.name);
                let has_credential = !token.trim().is_empty();
                let (status, pid, exit) = match self.slots.get(&agent.name) {
                    Some(slot) => (
                        slot.status,
                        slot.process.as_ref().and_then(AgentProcess::id),
                        slot.exit.clone(),
                    ),
                    None => (AgentStatus::Stopped, None, None),
                };
                AgentView {
                    name: agent.name.clone(),
                    flow: agent.flow.clone(),
                    description: agent.description.clone(),
                    credential: has_credential.then(|| mask_token(&token)),
                    status,
                    pid,
                    exit,
                    allowed_actions: allowed_actions(has_credential, status),
                }
            })
            .collect()
    }

    /// Number of agents currently `Running`.
    #[must_use]
    pub fn running(&self) -> usize {
        self.slots
            .values()
            .filter(|s| s.status == AgentStatus::Running)
            .count()
    }

    fn descriptor(&self, name: &str) -> Result<&AgentDescriptor, FleetError> {
        self.registry
            .get(name)
            .ok_or_else(|| FleetError::NotFound(name.to_string()))
    }

    fn slot(&self, name: &str) -> Result<&Slot<L::Process>, FleetError> {
        self.slots
            .get(name)
            .ok_or_else(|| FleetError::NotFound(name.to_string()))
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut Slot<L::Process>, FleetError> {
        self.slots
            .get_mut(name)
            .ok_or_else(|| FleetError::NotFound(name.to_string()))
    }

    fn ensure_idle(&self, name: &str) -> Result<(), FleetError> {
        let slot = self.slot(name)?;
        if slot.status.is_active() || slot.process.is_some() {
            return Err(FleetError::Busy {
                agent: name.to_string(),
                status: slot.status,
            });
        }
        Ok(())
    }

    fn emit(&self, agent: &str, line: impl Into<String>) {
        // The receiver only goes away at teardown.
        let _ = self.log_tx.send(LogEntry::event(agent, line));
    }
}
