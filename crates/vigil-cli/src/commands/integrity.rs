use vigil_engine::MaintenanceService;

use crate::cli::GlobalFlags;
use crate::commands::Outcome;
use crate::output::output;

/// Handle `vgl integrity`. Read-only.
pub async fn handle(service: &MaintenanceService, flags: &GlobalFlags) -> anyhow::Result<Outcome> {
    let report = service.check_integrity().await;
    if !flags.quiet && report.status == vigil_core::enums::IntegrityStatus::Issues {
        tracing::info!("integrity issues found; run `vgl repair --yes` to fix them");
    }
    output(&report, flags.format)?;
    Ok(Outcome::from_failure(report.status.is_failure()))
}
