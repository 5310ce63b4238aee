use vigil_engine::MaintenanceService;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands::{self, Outcome};

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    service: &MaintenanceService,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    match command {
        Commands::Health => commands::health::handle(service, flags).await,
        Commands::ValidateSchema(args) => {
            commands::validate_schema::handle(&args, service, flags).await
        }
        Commands::Integrity => commands::integrity::handle(service, flags).await,
        Commands::Repair(args) => commands::repair::handle(&args, service, flags).await,
        Commands::Usage(args) => commands::usage::handle(&args, service, flags),
        Commands::Optimize => commands::optimize::handle(service, flags).await,
        Commands::CleanupLogs => commands::cleanup::handle(service, flags),
        Commands::Run(args) => commands::run::handle(&args, service, flags).await,
        Commands::Schedule | Commands::ReportSchema(_) | Commands::Bootstrap => {
            unreachable!("schedule/report-schema/bootstrap are pre-dispatched in main")
        }
    }
}
