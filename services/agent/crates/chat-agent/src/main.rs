//! botfleet chat agent entry point.
//!
//! Loads configuration from `BOTFLEET_AGENT_*` env vars, picks a flow,
//! verifies the credential and long-polls the chat transport until
//! SIGTERM/SIGINT. A failing connection is restarted with backoff; when the
//! retry budget runs out the process exits non-zero.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use botfleet_chat_agent::config::AgentConfig;
use botfleet_chat_agent::dispatcher::Dispatcher;
use botfleet_chat_agent::engine::Engine;
use botfleet_chat_agent::flow::{self, Flow};
use botfleet_chat_agent::rate_limit::RateLimiter;
use botfleet_chat_agent::shutdown::signal_listener;
use botfleet_chat_agent::supervise::{run_with_restart, Connection};
use botfleet_chat_agent::transport::telegram::{TelegramClient, TelegramInbox, TelegramOutbox};
use botfleet_chat_agent::transport::{Inbox, TransportError};

// ===================================================================
// Arguments
// ===================================================================

#[derive(Debug, Parser)]
#[command(name = "chat-agent", version, about = "Run one botfleet chat agent")]
struct Args {
    /// Bot token; overrides BOTFLEET_AGENT_TOKEN.
    token: Option<String>,

    /// Flow to run; overrides BOTFLEET_AGENT_FLOW.
    #[arg(long)]
    flow: Option<String>,

    /// Print the available flow ids and exit.
    #[arg(long)]
    list_flows: bool,
}

// ===================================================================
// Connection loop
// ===================================================================

struct AgentLoop {
    client: Arc<TelegramClient>,
    inbox: TelegramInbox,
    dispatcher: Dispatcher,
    shutdown: watch::Receiver<bool>,
}

#[async_trait]
impl Connection for AgentLoop {
    async fn run(&mut self) -> Result<(), TransportError> {
        let me = self.client.get_me().await?;
        tracing::info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or("-"),
            "connected"
        );
        self.dispatcher.run(&mut self.inbox, &mut self.shutdown).await
    }
}

// ===================================================================
// Entry point
// ===================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Configuration first: it decides the log format.
    let config = AgentConfig::from_env()?;

    // 2. Tracing with RUST_LOG env filter; plain text under the supervisor.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(!config.supervised)
        .init();

    // 3. Flows: built-in set unless a flow file is configured.
    let flows = match &config.flow_file {
        Some(path) => flow::load_flows(path)?,
        None => flow::builtin_flows(),
    };
    if args.list_flows {
        for flow in &flows {
            println!("{}", flow.id);
        }
        return Ok(());
    }
    let flow_id = args.flow.as_deref().unwrap_or(&config.flow);
    let flow: Flow = flow::select(flows, flow_id)?;
    flow.validate()?;

    // 4. Credential: positional argument wins over the environment.
    let token = args
        .token
        .or_else(|| config.token.clone())
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    if token.is_empty() {
        bail!("no bot token: pass it as an argument or set BOTFLEET_AGENT_TOKEN");
    }

    tracing::info!(
        agent = config.display_name(),
        flow = %flow.id,
        supervised = config.supervised,
        rate_limit = config.rate_limit,
        "chat agent starting"
    );

    // 5. Wire transport, engine and dispatcher.
    let client = Arc::new(
        TelegramClient::new(&config.api_base, &token, config.poll_timeout())
            .context("failed to build transport client")?,
    );
    let limiter = Arc::new(RateLimiter::new(config.rate_limit, config.rate_window()));
    let engine = Arc::new(Engine::new(flow, limiter));
    let outbox = Arc::new(TelegramOutbox::new(Arc::clone(&client)));
    let dispatcher = Dispatcher::new(engine, outbox, config.session_idle());

    // 6. Shutdown on SIGTERM/SIGINT.
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(error) = signal_listener(shutdown_tx).await {
            tracing::error!(%error, "failed to install signal handlers, only SIGKILL stops the agent");
        }
    });

    let mut agent = AgentLoop {
        inbox: TelegramInbox::new(Arc::clone(&client), config.poll_timeout()),
        client,
        dispatcher,
        shutdown: shutdown_rx.clone(),
    };

    // 7. Serve until shutdown or until the restart budget runs out.
    let result = run_with_restart(&mut agent, config.restart_policy(), &mut shutdown_rx).await;
    agent.dispatcher.shutdown().await;
    if let Err(error) = agent.inbox.acknowledge().await {
        tracing::warn!(%error, "failed to acknowledge consumed updates");
    }

    result.context("chat agent stopped")?;
    tracing::info!(agent = config.display_name(), "chat agent shut down");
    Ok(())
}
