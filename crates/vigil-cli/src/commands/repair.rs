use vigil_engine::{MaintenanceService, RepairOptions};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RepairArgs;
use crate::commands::Outcome;
use crate::output::output;

/// Handle `vgl repair`.
///
/// Repair mutates the store, so it needs `--yes` unless the project opted
/// into `repair.auto_repair`.
pub async fn handle(
    args: &RepairArgs,
    service: &MaintenanceService,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    let config = &service.config().repair;
    if !args.yes && !config.auto_repair {
        anyhow::bail!("repair modifies the store; re-run with --yes to confirm");
    }

    let options = RepairOptions {
        strict_safety: config.strict_safety && !args.no_strict,
    };
    if !options.strict_safety {
        tracing::warn!("strict safety disabled; repair proceeds even without a snapshot");
    }

    let report = service.repair_integrity_with(options).await;
    output(&report, flags.format)?;
    Ok(Outcome::from_failure(report.status.is_failure()))
}
