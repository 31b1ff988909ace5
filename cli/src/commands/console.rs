//! `botfleet console`: interactive control loop.
//!
//! Reads one command per line from stdin while agent output keeps
//! streaming. Quitting (or end of input, or Ctrl-C) stops every agent.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::{AppContext, Fleet};
use crate::commands::{REFRESH_INTERVAL, show};
use crate::domain::{CONSOLE_HELP, ConsoleCommand};

/// Run `botfleet console`.
///
/// # Errors
///
/// Returns an error if the fleet cannot be loaded or stdin fails.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let (mut fleet, mut log) = app.supervisor()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    app.output
        .info("botfleet console. Type 'help' for commands, 'quit' to exit.");
    loop {
        tokio::select! {
            _ = &mut interrupt => break,
            line = lines.next_line() => {
                let Some(line) = line.context("reading console input")? else {
                    break;
                };
                match ConsoleCommand::parse(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(error) = execute(app, &mut fleet, command).await {
                            app.output.error(&format!("{error:#}"));
                        }
                    }
                    Ok(None) => {}
                    Err(error) => app.output.error(&error.to_string()),
                }
            }
            Some(entry) = log.recv() => show(app, &mut fleet, &entry)?,
            _ = refresh.tick() => {
                fleet.refresh();
            }
        }
    }

    let stopped = fleet.stop_all().await;
    while let Ok(entry) = log.try_recv() {
        show(app, &mut fleet, &entry)?;
    }
    app.renderer().reports("stop", &stopped)?;
    Ok(ExitCode::SUCCESS)
}

async fn execute(app: &AppContext, fleet: &mut Fleet, command: ConsoleCommand) -> Result<()> {
    let renderer = app.renderer();
    match command {
        ConsoleCommand::Start(agent) => {
            fleet.start(&agent)?;
            renderer.done(&agent, "start", &format!("{agent} started"))?;
        }
        ConsoleCommand::Stop(agent) => {
            let outcome = fleet.stop(&agent).await?;
            renderer.stopped(&agent, outcome)?;
        }
        ConsoleCommand::StartAll => renderer.reports("start", &fleet.start_all())?,
        ConsoleCommand::StopAll => renderer.reports("stop", &fleet.stop_all().await)?,
        ConsoleCommand::Set { agent, token } => {
            fleet.set_credential(&agent, &token)?;
            renderer.done(&agent, "token-set", &format!("Token saved for {agent}"))?;
        }
        ConsoleCommand::Clear(agent) => {
            fleet.clear_credential(&agent)?;
            renderer.done(&agent, "token-clear", &format!("Token removed for {agent}"))?;
        }
        ConsoleCommand::Status => renderer.agents(&fleet.views())?,
        ConsoleCommand::Log(n) => {
            for entry in fleet.log().tail(n) {
                renderer.log_entry(entry)?;
            }
        }
        ConsoleCommand::Help => {
            for (usage, about) in CONSOLE_HELP {
                app.output.kv(&format!("{usage:<22}"), about);
            }
        }
        ConsoleCommand::Quit => {}
    }
    Ok(())
}
