use vigil_core::schedule::MaintenanceScheduler;

use crate::cli::GlobalFlags;
use crate::commands::Outcome;
use crate::output::output;

/// Handle `vgl schedule`. Needs no store.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<Outcome> {
    output(&MaintenanceScheduler::table(), flags.format)?;
    Ok(Outcome::Passed)
}
