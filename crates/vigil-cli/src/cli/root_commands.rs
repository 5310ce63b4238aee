use clap::{Args, Subcommand, ValueEnum};
use vigil_core::enums::{Cadence, UsagePeriod};
use vigil_core::reports::ReportKind;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Probe connectivity, count entities and run orphan/validity probes.
    Health,
    /// Diff the live schema against the expected-schema manifest.
    #[command(name = "validate-schema")]
    ValidateSchema(ValidateSchemaArgs),
    /// Detect orphans, invalid accounts, asymmetric links and duplicate emails.
    Integrity,
    /// Snapshot, then repair the issues an integrity pass detects.
    Repair(RepairArgs),
    /// Replay operation logs into usage statistics.
    Usage(UsageArgs),
    /// Vacuum, analyze and reindex the store.
    Optimize,
    /// Remove operation log partitions past retention.
    #[command(name = "cleanup-logs")]
    CleanupLogs,
    /// Print the maintenance schedule.
    Schedule,
    /// Run every task of one cadence.
    Run(RunArgs),
    /// Create the reference schema in an empty store.
    Bootstrap,
    /// Print the JSON schema of a report type.
    #[command(name = "report-schema")]
    ReportSchema(ReportSchemaArgs),
}

/// Arguments for `vgl validate-schema`.
#[derive(Clone, Debug, Args)]
pub struct ValidateSchemaArgs {
    /// TOML manifest to validate against (defaults to the configured one).
    #[arg(long)]
    pub manifest: Option<String>,
}

/// Arguments for `vgl repair`.
#[derive(Clone, Debug, Args)]
pub struct RepairArgs {
    /// Confirm the repair (not needed when `repair.auto_repair` is set).
    #[arg(short = 'y', long)]
    pub yes: bool,
    /// Continue when the pre-repair snapshot cannot be written.
    #[arg(long)]
    pub no_strict: bool,
}

/// Arguments for `vgl usage`.
#[derive(Clone, Debug, Args)]
pub struct UsageArgs {
    /// Window to replay.
    #[arg(long, value_enum, default_value = "daily")]
    pub period: PeriodArg,
}

/// Arguments for `vgl run`.
#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    /// Cadence to run.
    #[arg(value_enum)]
    pub cadence: CadenceArg,
}

/// Arguments for `vgl report-schema`.
#[derive(Clone, Debug, Args)]
pub struct ReportSchemaArgs {
    /// Report type.
    #[arg(value_enum)]
    pub kind: ReportKindArg,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PeriodArg {
    Daily,
    Weekly,
    Monthly,
}

impl From<PeriodArg> for UsagePeriod {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Daily => Self::Daily,
            PeriodArg::Weekly => Self::Weekly,
            PeriodArg::Monthly => Self::Monthly,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CadenceArg {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl From<CadenceArg> for Cadence {
    fn from(value: CadenceArg) -> Self {
        match value {
            CadenceArg::Daily => Self::Daily,
            CadenceArg::Weekly => Self::Weekly,
            CadenceArg::Monthly => Self::Monthly,
            CadenceArg::Quarterly => Self::Quarterly,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReportKindArg {
    Health,
    Schema,
    Integrity,
    Repair,
    Usage,
    Optimize,
    Cleanup,
    Run,
}

impl From<ReportKindArg> for ReportKind {
    fn from(value: ReportKindArg) -> Self {
        match value {
            ReportKindArg::Health => Self::Health,
            ReportKindArg::Schema => Self::Schema,
            ReportKindArg::Integrity => Self::Integrity,
            ReportKindArg::Repair => Self::Repair,
            ReportKindArg::Usage => Self::Usage,
            ReportKindArg::Optimize => Self::Optimize,
            ReportKindArg::Cleanup => Self::Cleanup,
            ReportKindArg::Run => Self::Run,
        }
    }
}
