//! `botfleet run`: start agents and stream the aggregated log.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::app::{AppContext, Fleet};
use crate::commands::{REFRESH_INTERVAL, show};
use crate::domain::{ActionReport, AgentStatus, LogEntry};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Agents to start (default: every agent with a token)
    pub agents: Vec<String>,
}

/// Run `botfleet run`.
///
/// Streams until Ctrl-C or until every started agent has exited, then
/// stops whatever is still running.
///
/// # Errors
///
/// Returns an error if nothing could be started.
pub async fn run(app: &AppContext, args: &RunArgs) -> Result<ExitCode> {
    let (mut fleet, mut log) = app.supervisor()?;

    let started = if args.agents.is_empty() {
        fleet.start_all()
    } else {
        args.agents
            .iter()
            .map(|name| {
                let report = match fleet.start(name) {
                    Ok(()) => ActionReport::Done,
                    Err(error) => ActionReport::Failed(format!("{error:#}")),
                };
                (name.clone(), report)
            })
            .collect()
    };
    app.renderer().reports("start", &started)?;
    if fleet.running() == 0 {
        anyhow::bail!("no agent was started (set one with: botfleet token set <agent> <token>)");
    }
    app.output.info("Streaming agent output. Press Ctrl-C to stop.");

    stream(app, &mut fleet, &mut log).await?;

    let stopped = fleet.stop_all().await;
    while let Ok(entry) = log.try_recv() {
        show(app, &mut fleet, &entry)?;
    }
    app.renderer().reports("stop", &stopped)?;
    Ok(ExitCode::SUCCESS)
}

async fn stream(
    app: &AppContext,
    fleet: &mut Fleet,
    log: &mut UnboundedReceiver<LogEntry>,
) -> Result<()> {
    let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            _ = &mut interrupt => {
                tracing::debug!("interrupt received");
                return Ok(());
            }
            Some(entry) = log.recv() => show(app, fleet, &entry)?,
            _ = refresh.tick() => {
                if !fleet.refresh().is_empty() && all_exited(fleet) {
                    while let Ok(entry) = log.try_recv() {
                        show(app, fleet, &entry)?;
                    }
                    app.output.warn("Every agent has exited.");
                    return Ok(());
                }
            }
        }
    }
}

fn all_exited(fleet: &Fleet) -> bool {
    fleet
        .views()
        .iter()
        .filter(|view| view.status == AgentStatus::Running)
        .all(|view| view.exit.is_some())
}
