//! Infrastructure implementation of the `AgentLauncher` port.
//!
//! Agents run as child processes of the supervisor. The credential travels
//! in the environment, never on the command line, and both output pipes
//! are forwarded line by line into the shared log channel.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use botfleet_common::{AgentDescriptor, defaults, env};
use chrono::Local;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use crate::application::ports::{AgentLauncher, AgentProcess, LogSender};
use crate::domain::{ExitRecord, LogEntry, LogSource, StopOutcome};

/// Production launcher for `chat-agent` processes.
pub struct ProcessLauncher {
    default_program: PathBuf,
}

impl ProcessLauncher {
    /// Launches `program` for agents that do not name their own executable.
    #[must_use]
    pub fn new(default_program: PathBuf) -> Self {
        Self { default_program }
    }

    /// Uses the `chat-agent` binary installed next to the running executable.
    ///
    /// # Errors
    ///
    /// Returns an error if the current executable path is unavailable.
    pub fn sibling_agent() -> Result<Self> {
        let exe = std::env::current_exe().context("cannot locate current executable")?;
        let dir = exe
            .parent()
            .ok_or_else(|| anyhow::anyhow!("executable has no parent directory"))?;
        Ok(Self::new(dir.join(defaults::AGENT_BINARY)))
    }

    fn program<'a>(&'a self, agent: &'a AgentDescriptor) -> &'a Path {
        agent.program.as_deref().unwrap_or(&self.default_program)
    }
}

impl AgentLauncher for ProcessLauncher {
    type Process = ChildProcess;

    fn launch(&self, agent: &AgentDescriptor, token: &str, log: LogSender) -> Result<ChildProcess> {
        let program = self.program(agent);
        let mut child = Command::new(program)
            .args(["--flow", agent.flow.as_str()])
            .env(env::TOKEN, token)
            .env(env::FLOW, &agent.flow)
            .env(env::NAME, &agent.name)
            .env(env::SUPERVISED, "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", program.display()))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, agent.name.clone(), LogSource::Stdout, log.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, agent.name.clone(), LogSource::Stderr, log));
        }
        tracing::debug!(agent = %agent.name, pid = ?child.id(), "agent process spawned");
        Ok(ChildProcess { child })
    }
}

/// Reads `pipe` until EOF and sends each line, decoded lossily as UTF-8.
async fn forward_lines<R>(pipe: R, agent: String, source: LogSource, log: LogSender)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                if log.send(LogEntry::new(&agent, source, line)).is_err() {
                    break;
                }
            }
            Err(error) => {
                tracing::warn!(agent = %agent, %error, "reading agent output failed");
                break;
            }
        }
    }
}

/// A running `chat-agent` child.
pub struct ChildProcess {
    child: Child,
}

impl ChildProcess {
    async fn kill(&mut self) -> Result<StopOutcome> {
        self.child.kill().await.context("killing agent process")?;
        Ok(StopOutcome::Killed)
    }
}

impl AgentProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit(&mut self) -> Result<Option<ExitRecord>> {
        let status = self.child.try_wait().context("querying agent process")?;
        Ok(status.map(|status| ExitRecord {
            code: status.code(),
            at: Local::now(),
        }))
    }

    async fn terminate(&mut self, grace: Duration) -> Result<StopOutcome> {
        if self.child.try_wait().context("querying agent process")?.is_some() {
            return Ok(StopOutcome::AlreadyExited);
        }
        let Some(pid) = self.child.id() else {
            return Ok(StopOutcome::AlreadyExited);
        };

        if !request_exit(pid)? {
            return self.kill().await;
        }
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => {
                let status = status.context("waiting for agent process")?;
                tracing::debug!(pid, ?status, "agent exited gracefully");
                Ok(StopOutcome::Graceful)
            }
            Err(_) => {
                tracing::debug!(pid, ?grace, "grace period elapsed, killing");
                self.kill().await
            }
        }
    }
}

/// Sends SIGTERM. Returns `false` when graceful termination is unsupported.
#[cfg(unix)]
fn request_exit(pid: u32) -> Result<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).context("pid out of range")?;
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        // Already gone; the wait below returns at once.
        Ok(()) | Err(Errno::ESRCH) => Ok(true),
        Err(errno) => Err(anyhow::anyhow!("sending SIGTERM to {pid}: {errno}")),
    }
}

#[cfg(not(unix))]
fn request_exit(_pid: u32) -> Result<bool> {
    Ok(false)
}
