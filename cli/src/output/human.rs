//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::{ActionReport, AgentView, LogEntry, LogSource};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the agent table.
    pub fn render_agents(&self, agents: &[AgentView]) {
        if self.ctx.quiet {
            return;
        }
        if agents.is_empty() {
            self.ctx.info("No agents registered.");
            return;
        }
        let width = agents.iter().map(|a| a.name.len()).max().unwrap_or(0);

        self.ctx.header("Agents:");
        for agent in agents {
            let status = agent.status.to_string();
            let token = agent.credential.as_deref().unwrap_or("not set");
            let actions = agent
                .allowed_actions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "  {:<width$}  {:<8}  {}  {}",
                agent.name.style(self.ctx.styles.bold),
                status.style(self.ctx.styles.status(agent.status)),
                format!("token: {token}").style(self.ctx.styles.dim),
                format!("flow: {}", agent.flow).style(self.ctx.styles.dim),
            );
            if let Some(exit) = &agent.exit {
                println!(
                    "  {:<width$}  {}",
                    "",
                    format!("{exit} at {}", exit.at.format("%H:%M:%S")).style(self.ctx.styles.warning),
                );
            }
            if !actions.is_empty() {
                println!("  {:<width$}  {}", "", format!("actions: {actions}").style(self.ctx.styles.dim));
            }
        }
    }

    /// Render one aggregated log line as `HH:MM:SS name │ line`.
    ///
    /// Log lines are the payload of `run` and `console`, so `quiet` only
    /// hides supervisor events.
    pub fn render_log_entry(&self, entry: &LogEntry) {
        let time = entry.at.format("%H:%M:%S").to_string();
        let tag = entry.agent.style(self.ctx.styles.agent);
        match entry.source {
            LogSource::Stdout => println!("{} {tag} │ {}", time.style(self.ctx.styles.dim), entry.line),
            LogSource::Stderr => println!(
                "{} {tag} │ {}",
                time.style(self.ctx.styles.dim),
                entry.line.style(self.ctx.styles.warning)
            ),
            LogSource::Supervisor if !self.ctx.quiet => println!(
                "{} {tag} {} {}",
                time.style(self.ctx.styles.dim),
                "»".style(self.ctx.styles.info),
                entry.line.style(self.ctx.styles.info)
            ),
            LogSource::Supervisor => {}
        }
    }

    /// Render the per-agent outcome of `start-all` / `stop-all`.
    pub fn render_reports(&self, action: &str, reports: &[(String, ActionReport)]) {
        for (agent, report) in reports {
            match report {
                ActionReport::Done => self.ctx.success(&format!("{agent}: {action}")),
                ActionReport::Skipped(reason) => {
                    if !self.ctx.quiet {
                        println!("  {} {agent}: skipped ({reason})", "-".style(self.ctx.styles.dim));
                    }
                }
                ActionReport::Failed(reason) => self.ctx.error(&format!("{agent}: {reason}")),
            }
        }
    }

    /// Render the masked token of one agent.
    pub fn render_token(&self, agent: &str, masked: Option<&str>) {
        match masked {
            Some(token) => self.ctx.kv(&format!("{agent}:"), token),
            None => self.ctx.kv(&format!("{agent}:"), "not set"),
        }
    }

    /// Render a one-line confirmation.
    pub fn render_done(&self, message: &str) {
        self.ctx.success(message);
    }
}
