use vigil_engine::MaintenanceService;

use crate::cli::GlobalFlags;
use crate::commands::Outcome;
use crate::output::output;

/// Handle `vgl optimize`.
pub async fn handle(service: &MaintenanceService, flags: &GlobalFlags) -> anyhow::Result<Outcome> {
    let report = service.optimize().await;
    output(&report, flags.format)?;
    Ok(Outcome::from_failure(report.status.is_failure()))
}
