use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `vgl` binary.
#[derive(Debug, Parser)]
#[command(name = "vgl", version, about = "Vigil - database maintenance for educational data stores")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root path (defaults to auto-detect via .vigil)
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Store path, overriding `store.path`
    #[arg(long, global = true)]
    pub db: Option<String>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            project: self.project.clone(),
            db: self.db.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::root_commands::{CadenceArg, PeriodArg};
    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_and_after_subcommand() {
        let cli = Cli::try_parse_from(["vgl", "--format", "table", "health", "--verbose"])
            .expect("cli should parse");
        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Health));
    }

    #[test]
    fn repair_flags() {
        let cli = Cli::try_parse_from(["vgl", "repair", "--yes", "--no-strict"])
            .expect("cli should parse");
        let Commands::Repair(args) = cli.command else {
            panic!("expected repair");
        };
        assert!(args.yes);
        assert!(args.no_strict);
    }

    #[test]
    fn usage_period_defaults_to_daily() {
        let cli = Cli::try_parse_from(["vgl", "usage"]).expect("cli should parse");
        let Commands::Usage(args) = cli.command else {
            panic!("expected usage");
        };
        assert_eq!(args.period, PeriodArg::Daily);

        let cli = Cli::try_parse_from(["vgl", "usage", "--period", "monthly"])
            .expect("cli should parse");
        assert!(matches!(cli.command, Commands::Usage(a) if a.period == PeriodArg::Monthly));
    }

    #[test]
    fn run_requires_a_known_cadence() {
        let cli = Cli::try_parse_from(["vgl", "run", "quarterly"]).expect("cli should parse");
        assert!(matches!(cli.command, Commands::Run(a) if a.cadence == CadenceArg::Quarterly));
        assert!(Cli::try_parse_from(["vgl", "run", "hourly"]).is_err());
        assert!(Cli::try_parse_from(["vgl", "run"]).is_err());
    }

    #[test]
    fn db_override_is_global() {
        let cli = Cli::try_parse_from(["vgl", "integrity", "--db", "/tmp/app.db"])
            .expect("cli should parse");
        assert_eq!(cli.global_flags().db.as_deref(), Some("/tmp/app.db"));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["vgl", "--format", "xml", "health"]).is_err());
    }
}
