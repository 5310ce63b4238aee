use vigil_engine::MaintenanceService;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RunArgs;
use crate::commands::Outcome;
use crate::output::output;

/// Handle `vgl run <cadence>`.
pub async fn handle(
    args: &RunArgs,
    service: &MaintenanceService,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    let report = service.run_cadence(args.cadence.into()).await;
    output(&report, flags.format)?;
    Ok(Outcome::from_failure(report.status.is_failure()))
}
