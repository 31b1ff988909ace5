//! `botfleet token`: manage the credential each agent authenticates with.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::domain::mask_token;

/// Token subcommands.
#[derive(Subcommand)]
pub enum TokenCommand {
    /// Store an agent's token
    Set {
        /// Agent name
        agent: String,
        /// Bot token issued by the chat platform
        token: String,
    },
    /// Remove an agent's token
    Clear {
        /// Agent name
        agent: String,
    },
    /// Show an agent's token (masked)
    Show {
        /// Agent name
        agent: String,
    },
}

/// Run the token command.
///
/// # Errors
///
/// Returns an error for unknown agents, blank tokens, or when the token
/// file cannot be written.
pub fn run(app: &AppContext, cmd: TokenCommand) -> Result<ExitCode> {
    let (mut fleet, _log) = app.supervisor()?;
    match cmd {
        TokenCommand::Set { agent, token } => {
            fleet.set_credential(&agent, &token)?;
            app.renderer()
                .done(&agent, "token-set", &format!("Token saved for {agent}"))?;
        }
        TokenCommand::Clear { agent } => {
            fleet.credential(&agent)?;
            if !app.confirm(&format!("Remove the token for '{agent}'?"), true)? {
                app.output.info("Cancelled.");
                return Ok(ExitCode::SUCCESS);
            }
            fleet.clear_credential(&agent)?;
            app.renderer()
                .done(&agent, "token-clear", &format!("Token removed for {agent}"))?;
        }
        TokenCommand::Show { agent } => {
            let token = fleet.credential(&agent)?;
            let masked = (!token.is_empty()).then(|| mask_token(&token));
            app.renderer().token(&agent, masked.as_deref())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
