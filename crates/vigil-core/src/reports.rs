//! Report envelopes returned by maintenance operations.
//!
//! Every report carries a `status`, a `timestamp`, and an optional `error`.
//! Store unavailability is a reportable state, so callers branch on `status`
//! rather than on `Result`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{
    Cadence, HealthStatus, IntegrityStatus, IssueCategory, OperationStatus, RepairStatus,
    RepairStep, SchemaStatus, Severity, StepStatus, TaskOutcome, UsagePeriod,
};
use crate::schedule::MaintenanceTask;

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// A single finding surfaced by a health pass.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Issue {
    pub category: IssueCategory,
    pub severity: Severity,
    /// Stable machine-readable code, e.g. `orphaned_profiles`.
    pub code: String,
    pub message: String,
    pub count: u64,
}

impl Issue {
    #[must_use]
    pub fn new(
        category: IssueCategory,
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        count: u64,
    ) -> Self {
        Self {
            category,
            severity,
            code: code.into(),
            message: message.into(),
            count,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct HealthStatistics {
    /// Row count per model. Models absent from the store report 0.
    pub entity_counts: BTreeMap<String, u64>,
    pub total_records: u64,
    /// Round trip of the connectivity probe.
    pub probe_latency_ms: u64,
    /// Wall-clock time spent gathering counts.
    pub stats_latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub connection_status: bool,
    /// Absent when the connectivity probe failed.
    pub statistics: Option<HealthStatistics>,
    pub issues: Vec<Issue>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl HealthReport {
    /// Report for a store that failed the connectivity probe.
    #[must_use]
    pub fn disconnected(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            timestamp: Utc::now(),
            connection_status: false,
            statistics: None,
            issues: Vec::new(),
            duration_ms,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Required fields missing from a model that does exist.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ModelFieldGap {
    pub model: String,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SchemaReport {
    pub status: SchemaStatus,
    pub timestamp: DateTime<Utc>,
    pub expected_models: usize,
    pub live_models: usize,
    pub missing_models: Vec<String>,
    pub extra_models: Vec<String>,
    pub missing_fields: Vec<ModelFieldGap>,
    pub error: Option<String>,
}

impl SchemaReport {
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: SchemaStatus::Error,
            timestamp: Utc::now(),
            expected_models: 0,
            live_models: 0,
            missing_models: Vec::new(),
            extra_models: Vec::new(),
            missing_fields: Vec::new(),
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// Result of one integrity sub-check: how many, and a bounded sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SubCheck {
    pub count: u64,
    /// Sample identifiers (emails for duplicate groups), at most the configured limit.
    pub samples: Vec<String>,
}

impl SubCheck {
    #[must_use]
    pub fn from_items<I>(count: u64, items: I, limit: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            count,
            samples: items.into_iter().take(limit).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct IntegrityIssues {
    pub orphaned_profiles: SubCheck,
    pub orphaned_assessment_results: SubCheck,
    pub orphaned_account_links: SubCheck,
    /// Accounts with an empty email or an empty name.
    pub invalid_accounts: SubCheck,
    /// Declared links whose reciprocal edge is missing.
    pub asymmetric_relationships: SubCheck,
    /// Number of email groups shared by more than one account.
    pub duplicate_emails: SubCheck,
}

impl IntegrityIssues {
    /// Sum of every sub-check count.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.orphaned_profiles.count
            + self.orphaned_assessment_results.count
            + self.orphaned_account_links.count
            + self.invalid_accounts.count
            + self.asymmetric_relationships.count
            + self.duplicate_emails.count
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct IntegrityReport {
    pub status: IntegrityStatus,
    pub timestamp: DateTime<Utc>,
    /// Absent when the pass failed; never partially filled.
    pub issues: Option<IntegrityIssues>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl IntegrityReport {
    #[must_use]
    pub fn from_issues(issues: IntegrityIssues, duration_ms: u64) -> Self {
        let status = if issues.total() > 0 {
            IntegrityStatus::Issues
        } else {
            IntegrityStatus::Valid
        };
        Self {
            status,
            timestamp: Utc::now(),
            issues: Some(issues),
            duration_ms,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: IntegrityStatus::Error,
            timestamp: Utc::now(),
            issues: None,
            duration_ms,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StepReport {
    pub step: RepairStep,
    pub status: StepStatus,
    pub affected: u64,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl StepReport {
    #[must_use]
    pub const fn skipped(step: RepairStep) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            affected: 0,
            duration_ms: 0,
            error: None,
        }
    }
}

/// Affected-row counts broken down by what was changed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RepairChanges {
    pub orphaned_profiles_deleted: u64,
    pub orphaned_assessment_results_deleted: u64,
    pub orphaned_account_links_deleted: u64,
    pub emails_backfilled: u64,
    pub names_backfilled: u64,
    pub relationships_restored: u64,
    pub duplicate_accounts_removed: u64,
    /// Profiles, results and links that belonged to removed duplicates.
    pub dependent_rows_removed: u64,
}

impl RepairChanges {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.orphaned_profiles_deleted
            + self.orphaned_assessment_results_deleted
            + self.orphaned_account_links_deleted
            + self.emails_backfilled
            + self.names_backfilled
            + self.relationships_restored
            + self.duplicate_accounts_removed
            + self.dependent_rows_removed
    }
}

impl std::ops::AddAssign for RepairChanges {
    fn add_assign(&mut self, other: Self) {
        self.orphaned_profiles_deleted += other.orphaned_profiles_deleted;
        self.orphaned_assessment_results_deleted += other.orphaned_assessment_results_deleted;
        self.orphaned_account_links_deleted += other.orphaned_account_links_deleted;
        self.emails_backfilled += other.emails_backfilled;
        self.names_backfilled += other.names_backfilled;
        self.relationships_restored += other.relationships_restored;
        self.duplicate_accounts_removed += other.duplicate_accounts_removed;
        self.dependent_rows_removed += other.dependent_rows_removed;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RepairReport {
    pub status: RepairStatus,
    pub timestamp: DateTime<Utc>,
    /// Location of the pre-repair export, when one was written.
    pub snapshot: Option<String>,
    pub steps: Vec<StepReport>,
    pub changes: RepairChanges,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl RepairReport {
    /// Report for a pass that was refused before any mutation.
    #[must_use]
    pub fn rejected(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: RepairStatus::Error,
            timestamp: Utc::now(),
            snapshot: None,
            steps: RepairStep::ALL.into_iter().map(StepReport::skipped).collect(),
            changes: RepairChanges::default(),
            duration_ms,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub const fn total_affected(&self) -> u64 {
        self.changes.total()
    }
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OperationCounts {
    pub total: u64,
    pub read: u64,
    pub write: u64,
    pub delete: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ActorUsage {
    pub operations: u64,
    /// Latest timestamp seen for the actor, regardless of line order.
    pub last_active: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LatencyStats {
    /// Entries that carried a query time.
    pub samples: u64,
    pub average_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub slowest_ms: f64,
    pub slowest_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct UsageReport {
    pub status: OperationStatus,
    pub timestamp: DateTime<Utc>,
    pub period: UsagePeriod,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub files_read: u32,
    /// Well-formed entries inside the window.
    pub entries: u64,
    /// Lines that failed to parse and were ignored.
    pub skipped_lines: u64,
    pub operations: OperationCounts,
    pub by_model: BTreeMap<String, OperationCounts>,
    pub by_actor: BTreeMap<String, ActorUsage>,
    pub latency: LatencyStats,
    pub error: Option<String>,
}

impl UsageReport {
    /// A zero-valued report for `[window_start, window_end]`.
    #[must_use]
    pub fn empty(
        period: UsagePeriod,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Self {
        Self {
            status: OperationStatus::Success,
            timestamp: Utc::now(),
            period,
            window_start,
            window_end,
            files_read: 0,
            entries: 0,
            skipped_lines: 0,
            operations: OperationCounts::default(),
            by_model: BTreeMap::new(),
            by_actor: BTreeMap::new(),
            latency: LatencyStats::default(),
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Optimize / cleanup
// ---------------------------------------------------------------------------

/// Which store-level maintenance commands ran.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OptimizeOperations {
    pub vacuum: bool,
    pub analyze: bool,
    pub reindex: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OptimizeReport {
    pub status: OperationStatus,
    pub timestamp: DateTime<Utc>,
    pub operations: OptimizeOperations,
    pub duration_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CleanupReport {
    pub status: OperationStatus,
    pub timestamp: DateTime<Utc>,
    pub files_removed: Vec<String>,
    pub files_kept: u32,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Cadence runs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TaskRun {
    pub task: MaintenanceTask,
    pub outcome: TaskOutcome,
    /// Status string of the underlying report, when the task produced one.
    pub status: Option<String>,
    pub report: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MaintenanceRunReport {
    pub status: OperationStatus,
    pub timestamp: DateTime<Utc>,
    pub cadence: Cadence,
    pub tasks: Vec<TaskRun>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Report kinds
// ---------------------------------------------------------------------------

/// Report types whose JSON schema is published to operator tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Health,
    Schema,
    Integrity,
    Repair,
    Usage,
    Optimize,
    Cleanup,
    Run,
}

impl ReportKind {
    /// JSON schema of the report type.
    #[must_use]
    pub fn json_schema(self) -> serde_json::Value {
        let schema = match self {
            Self::Health => schemars::schema_for!(HealthReport),
            Self::Schema => schemars::schema_for!(SchemaReport),
            Self::Integrity => schemars::schema_for!(IntegrityReport),
            Self::Repair => schemars::schema_for!(RepairReport),
            Self::Usage => schemars::schema_for!(UsageReport),
            Self::Optimize => schemars::schema_for!(OptimizeReport),
            Self::Cleanup => schemars::schema_for!(CleanupReport),
            Self::Run => schemars::schema_for!(MaintenanceRunReport),
        };
        serde_json::to_value(schema).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_status_follows_counts() {
        let clean = IntegrityReport::from_issues(IntegrityIssues::default(), 3);
        assert_eq!(clean.status, IntegrityStatus::Valid);

        let issues = IntegrityIssues {
            duplicate_emails: SubCheck::from_items(1, ["a@x.com".to_string()], 10),
            ..IntegrityIssues::default()
        };
        let dirty = IntegrityReport::from_issues(issues, 3);
        assert_eq!(dirty.status, IntegrityStatus::Issues);
    }

    #[test]
    fn failed_integrity_has_no_partial_issues() {
        let report = IntegrityReport::failed("store unavailable", 1);
        assert_eq!(report.status, IntegrityStatus::Error);
        assert!(report.issues.is_none());
    }

    #[test]
    fn sub_check_samples_are_bounded() {
        let check = SubCheck::from_items(50, (0..50).map(|i| i.to_string()), 10);
        assert_eq!(check.count, 50);
        assert_eq!(check.samples.len(), 10);
    }

    #[test]
    fn disconnected_health_has_no_statistics() {
        let report = HealthReport::disconnected("connection refused", 2);
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(!report.connection_status);
        assert!(report.statistics.is_none());
    }

    #[test]
    fn rejected_repair_skips_every_step() {
        let report = RepairReport::rejected("repair already in progress", 0);
        assert_eq!(report.status, RepairStatus::Error);
        assert_eq!(report.steps.len(), 4);
        assert!(report.steps.iter().all(|s| s.status == StepStatus::Skipped));
        assert_eq!(report.total_affected(), 0);
    }

    #[test]
    fn every_report_kind_has_a_schema() {
        for kind in [
            ReportKind::Health,
            ReportKind::Schema,
            ReportKind::Integrity,
            ReportKind::Repair,
            ReportKind::Usage,
            ReportKind::Optimize,
            ReportKind::Cleanup,
            ReportKind::Run,
        ] {
            let schema = kind.json_schema();
            assert!(schema.get("properties").is_some(), "{kind:?} schema has no properties");
        }
    }
}
