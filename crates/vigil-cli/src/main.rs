use std::time::Instant;

use clap::Parser;
use vigil_core::reports::HealthReport;
use vigil_engine::MaintenanceService;

mod bootstrap;
mod cli;
mod commands;
mod output;
mod repair_lock;
mod ui;

use commands::Outcome;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(Outcome::Passed) => {}
        Ok(Outcome::Failed) => std::process::exit(2),
        Err(error) => {
            eprintln!("vgl error: {error:#}");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<Outcome> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let flags = cli.global_flags();
    ui::init(&flags);

    match &cli.command {
        cli::Commands::Schedule => return commands::schedule::handle(&flags),
        cli::Commands::ReportSchema(args) => return commands::report_schema::handle(args, &flags),
        _ => {}
    }

    let project_root = bootstrap::resolve_project_root(flags.project.as_deref())?;
    let config = bootstrap::load_config(&project_root, &flags)?;

    if matches!(cli.command, cli::Commands::Bootstrap) {
        return commands::bootstrap::handle(&config, &project_root, &flags).await;
    }

    let command = cli.command;
    let repair_lock = if command_requires_repair_lock(&command) {
        Some(repair_lock::acquire_for_project(&project_root)?)
    } else {
        None
    };

    let started = Instant::now();
    let service = match MaintenanceService::open(config, &project_root).await {
        Ok(service) => service,
        Err(error) if matches!(command, cli::Commands::Health) => {
            let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            let report = HealthReport::disconnected(error.to_string(), elapsed);
            output::output(&report, flags.format)?;
            return Ok(Outcome::Failed);
        }
        Err(error) => {
            return Err(anyhow::Error::new(error).context("failed to open the maintenance store"));
        }
    };

    let result = commands::dispatch::dispatch(command, &service, &flags).await;
    drop(repair_lock);
    result
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("VIGIL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

/// Commands that may write repairs take the cross-process repair lock.
const fn command_requires_repair_lock(command: &cli::Commands) -> bool {
    matches!(command, cli::Commands::Repair(_) | cli::Commands::Run(_))
}
