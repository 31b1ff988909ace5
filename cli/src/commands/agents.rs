//! `botfleet agents`: list the registry with live status.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;

/// Run `botfleet agents`.
///
/// # Errors
///
/// Returns an error if the registry cannot be loaded.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let (fleet, _log) = app.supervisor()?;
    app.renderer().agents(&fleet.views())?;
    Ok(ExitCode::SUCCESS)
}
