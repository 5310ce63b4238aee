//! Declarative maintenance schedule.
//!
//! The scheduler performs no work: it only states which tasks belong to each
//! cadence so an external cron/orchestrator (or `vgl run <cadence>`) can
//! trigger them.
//!
//! ```text
//! daily      backup, health_check, log_rotation
//! weekly     vacuum_analyze, integrity_check, usage_collection
//! monthly    full_optimization, schema_validation, storage_cleanup
//! quarterly  comprehensive_audit, archival, index_review
//! ```

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Cadence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceTask {
    Backup,
    HealthCheck,
    LogRotation,
    VacuumAnalyze,
    IntegrityCheck,
    /// Not scheduled on its own; follows an integrity check under auto-repair.
    IntegrityRepair,
    UsageCollection,
    FullOptimization,
    SchemaValidation,
    StorageCleanup,
    ComprehensiveAudit,
    Archival,
    IndexReview,
}

impl MaintenanceTask {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::HealthCheck => "health_check",
            Self::LogRotation => "log_rotation",
            Self::VacuumAnalyze => "vacuum_analyze",
            Self::IntegrityCheck => "integrity_check",
            Self::IntegrityRepair => "integrity_repair",
            Self::UsageCollection => "usage_collection",
            Self::FullOptimization => "full_optimization",
            Self::SchemaValidation => "schema_validation",
            Self::StorageCleanup => "storage_cleanup",
            Self::ComprehensiveAudit => "comprehensive_audit",
            Self::Archival => "archival",
            Self::IndexReview => "index_review",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Backup => "Full store backup",
            Self::HealthCheck => "Connectivity, counts and orphan/validity probes",
            Self::LogRotation => "Prune operation logs past retention",
            Self::VacuumAnalyze => "Refresh planner statistics",
            Self::IntegrityCheck => "Orphans, validity, symmetry and duplicates",
            Self::IntegrityRepair => "Snapshot, then repair the detected issues",
            Self::UsageCollection => "Replay operation logs into usage statistics",
            Self::FullOptimization => "Vacuum, analyze and reindex",
            Self::SchemaValidation => "Diff live schema against the manifest",
            Self::StorageCleanup => "Remove operation log partitions past retention",
            Self::ComprehensiveAudit => "Review audit and educational log streams",
            Self::Archival => "Archive cold records",
            Self::IndexReview => "Review indexes and slow queries",
        }
    }

    /// Tasks owned by operator tooling around the engine rather than the engine itself.
    #[must_use]
    pub const fn is_delegated(self) -> bool {
        matches!(
            self,
            Self::Backup | Self::ComprehensiveAudit | Self::Archival | Self::IndexReview
        )
    }
}

impl fmt::Display for MaintenanceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the schedule table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub cadence: Cadence,
    pub tasks: Vec<MaintenanceTask>,
}

pub struct MaintenanceScheduler;

impl MaintenanceScheduler {
    /// Tasks declared for a cadence, in trigger order.
    #[must_use]
    pub const fn tasks_for(cadence: Cadence) -> &'static [MaintenanceTask] {
        use MaintenanceTask as T;
        match cadence {
            Cadence::Daily => &[T::Backup, T::HealthCheck, T::LogRotation],
            Cadence::Weekly => &[T::VacuumAnalyze, T::IntegrityCheck, T::UsageCollection],
            Cadence::Monthly => &[
                T::FullOptimization,
                T::SchemaValidation,
                T::StorageCleanup,
            ],
            Cadence::Quarterly => &[T::ComprehensiveAudit, T::Archival, T::IndexReview],
        }
    }

    /// The whole schedule, one entry per cadence.
    #[must_use]
    pub fn table() -> Vec<ScheduleEntry> {
        Cadence::ALL
            .into_iter()
            .map(|cadence| ScheduleEntry {
                cadence,
                tasks: Self::tasks_for(cadence).to_vec(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_cadence_has_three_tasks() {
        let table = MaintenanceScheduler::table();
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|e| e.tasks.len() == 3));
    }

    #[test]
    fn each_task_is_scheduled_once() {
        let mut all: Vec<MaintenanceTask> = MaintenanceScheduler::table()
            .into_iter()
            .flat_map(|e| e.tasks)
            .collect();
        let before = all.len();
        all.sort_by_key(|t| t.as_str());
        all.dedup();
        assert_eq!(all.len(), before);
    }

    #[test]
    fn weekly_includes_integrity_check() {
        assert!(
            MaintenanceScheduler::tasks_for(Cadence::Weekly)
                .contains(&MaintenanceTask::IntegrityCheck)
        );
    }

    #[test]
    fn quarterly_is_fully_delegated() {
        assert!(
            MaintenanceScheduler::tasks_for(Cadence::Quarterly)
                .iter()
                .all(|t| t.is_delegated())
        );
    }
}
