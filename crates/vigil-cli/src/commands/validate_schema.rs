use std::path::Path;

use anyhow::Context;
use vigil_core::manifest::SchemaManifest;
use vigil_engine::MaintenanceService;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ValidateSchemaArgs;
use crate::commands::Outcome;
use crate::output::output;

/// Handle `vgl validate-schema`.
pub async fn handle(
    args: &ValidateSchemaArgs,
    service: &MaintenanceService,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    let report = match &args.manifest {
        Some(path) => {
            let manifest = SchemaManifest::load(Path::new(path))
                .with_context(|| format!("failed to load manifest {path}"))?;
            service.validate_schema(&manifest).await
        }
        None => service.validate_configured_schema().await,
    };
    output(&report, flags.format)?;
    Ok(Outcome::from_failure(report.status.is_failure()))
}
