use vigil_engine::MaintenanceService;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::UsageArgs;
use crate::commands::Outcome;
use crate::output::output;

/// Handle `vgl usage`.
pub fn handle(
    args: &UsageArgs,
    service: &MaintenanceService,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    let report = service.collect_usage(args.period.into());
    output(&report, flags.format)?;
    Ok(Outcome::from_failure(report.status.is_failure()))
}
