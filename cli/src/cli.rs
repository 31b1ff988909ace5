//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Supervise a fleet of conversational chat agents
#[derive(Parser)]
#[command(
    name = "botfleet",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Assume "yes" for every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List agents with their token, status and allowed actions
    Agents,

    /// Manage agent tokens
    #[command(subcommand)]
    Token(commands::token::TokenCommand),

    /// Start agents and stream their output until Ctrl-C
    Run(commands::run::RunArgs),

    /// Interactive control console
    Console,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
        })?;

        match command {
            Command::Agents => commands::agents::run(&app),
            Command::Token(cmd) => commands::token::run(&app, cmd),
            Command::Run(args) => commands::run::run(&app, &args).await,
            Command::Console => commands::console::run(&app).await,
        }
    }
}
