//! Command implementations

pub mod agents;
pub mod console;
pub mod run;
pub mod token;

use std::time::Duration;

use anyhow::Result;

use crate::app::{AppContext, Fleet};
use crate::domain::LogEntry;

/// How often long-running commands reap agents that exited on their own.
pub(crate) const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Appends `entry` to the fleet log and renders it.
pub(crate) fn show(app: &AppContext, fleet: &mut Fleet, entry: &LogEntry) -> Result<()> {
    fleet.record(entry);
    app.renderer().log_entry(entry)
}
