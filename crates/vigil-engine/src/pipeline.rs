//! Cadence runs.
//!
//! `run_cadence` triggers the engine-owned tasks of one schedule row, always
//! preceded by a health check. Tasks owned by operator tooling (backup,
//! audit review, archival, index review) are reported as `delegated`.
//!
//! ```text
//! health_check ──disconnected──> remaining tasks skipped, status error
//!      │
//!      └─> task 1 ─> task 2 ─> ...   (a failed task does not stop the run)
//! ```

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use vigil_core::enums::{Cadence, OperationStatus, TaskOutcome, UsagePeriod};
use vigil_core::reports::{MaintenanceRunReport, OptimizeOperations, TaskRun};
use vigil_core::schedule::{MaintenanceScheduler, MaintenanceTask};

use crate::service::{MaintenanceService, elapsed_ms};

impl MaintenanceService {
    /// Run every task declared for `cadence`.
    pub async fn run_cadence(&self, cadence: Cadence) -> MaintenanceRunReport {
        let start = Instant::now();
        let mut tasks = Vec::new();

        let health = self.check_health().await;
        let connected = health.connection_status;
        let error = health.error.clone();
        tasks.push(task_run(
            MaintenanceTask::HealthCheck,
            health.status.as_str(),
            health.status.is_failure(),
            &health,
        ));

        for &task in MaintenanceScheduler::tasks_for(cadence) {
            if task == MaintenanceTask::HealthCheck {
                continue;
            }
            if !connected {
                tasks.push(bare_run(task, TaskOutcome::Skipped));
                continue;
            }
            tracing::info!(%cadence, %task, "running maintenance task");
            self.run_task(task, cadence, &mut tasks).await;
        }

        let status = if !connected {
            OperationStatus::Error
        } else if tasks.iter().any(|t| t.outcome == TaskOutcome::Failed) {
            OperationStatus::Partial
        } else {
            OperationStatus::Success
        };

        let report = MaintenanceRunReport {
            status,
            timestamp: Utc::now(),
            cadence,
            tasks,
            duration_ms: elapsed_ms(start),
            error: if connected { None } else { error },
        };
        self.record(
            "maintenance_run",
            "*",
            json!({
                "cadence": cadence,
                "status": report.status,
                "tasks": report.tasks.len(),
                "duration_ms": report.duration_ms,
            }),
        );
        report
    }

    async fn run_task(&self, task: MaintenanceTask, cadence: Cadence, tasks: &mut Vec<TaskRun>) {
        let run = match task {
            MaintenanceTask::Backup
            | MaintenanceTask::ComprehensiveAudit
            | MaintenanceTask::Archival
            | MaintenanceTask::IndexReview => bare_run(task, TaskOutcome::Delegated),
            // Run ahead of every cadence, or only after an integrity check.
            MaintenanceTask::HealthCheck | MaintenanceTask::IntegrityRepair => return,
            MaintenanceTask::LogRotation | MaintenanceTask::StorageCleanup => {
                let report = self.cleanup_logs();
                task_run(task, report.status.as_str(), report.status.is_failure(), &report)
            }
            MaintenanceTask::VacuumAnalyze | MaintenanceTask::FullOptimization => {
                let full = task == MaintenanceTask::FullOptimization;
                let report = self
                    .optimize_with(OptimizeOperations {
                        vacuum: true,
                        analyze: true,
                        reindex: full,
                    })
                    .await;
                task_run(task, report.status.as_str(), report.status.is_failure(), &report)
            }
            MaintenanceTask::IntegrityCheck => {
                let report = self.check_integrity().await;
                let found = report.issues.as_ref().is_some_and(|i| i.total() > 0);
                tasks.push(task_run(
                    task,
                    report.status.as_str(),
                    report.status.is_failure(),
                    &report,
                ));
                if !(found && self.config().repair.auto_repair) {
                    return;
                }
                let repair = self.repair_integrity().await;
                task_run(
                    MaintenanceTask::IntegrityRepair,
                    repair.status.as_str(),
                    repair.status.is_failure(),
                    &repair,
                )
            }
            MaintenanceTask::UsageCollection => {
                let report = self.collect_usage(usage_period(cadence));
                task_run(task, report.status.as_str(), report.status.is_failure(), &report)
            }
            MaintenanceTask::SchemaValidation => {
                let report = self.validate_configured_schema().await;
                task_run(task, report.status.as_str(), report.status.is_failure(), &report)
            }
        };
        tasks.push(run);
    }
}

/// Usage window matching a cadence.
const fn usage_period(cadence: Cadence) -> UsagePeriod {
    match cadence {
        Cadence::Daily => UsagePeriod::Daily,
        Cadence::Weekly => UsagePeriod::Weekly,
        Cadence::Monthly | Cadence::Quarterly => UsagePeriod::Monthly,
    }
}

fn bare_run(task: MaintenanceTask, outcome: TaskOutcome) -> TaskRun {
    TaskRun {
        task,
        outcome,
        status: None,
        report: None,
        error: None,
    }
}

fn task_run<R: Serialize>(task: MaintenanceTask, status: &str, failed: bool, report: &R) -> TaskRun {
    let (report, error) = match serde_json::to_value(report) {
        Ok(value) => {
            let error = value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            (Some(value), error)
        }
        Err(e) => (None, Some(e.to_string())),
    };
    TaskRun {
        task,
        outcome: if failed {
            TaskOutcome::Failed
        } else {
            TaskOutcome::Completed
        },
        status: Some(status.to_string()),
        report,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_window_follows_cadence() {
        assert_eq!(usage_period(Cadence::Daily), UsagePeriod::Daily);
        assert_eq!(usage_period(Cadence::Weekly), UsagePeriod::Weekly);
        assert_eq!(usage_period(Cadence::Quarterly), UsagePeriod::Monthly);
    }

    #[test]
    fn failed_reports_mark_the_task_failed() {
        let run = task_run(
            MaintenanceTask::SchemaValidation,
            "error",
            true,
            &json!({ "status": "error", "error": "introspection timed out" }),
        );
        assert_eq!(run.outcome, TaskOutcome::Failed);
        assert_eq!(run.status.as_deref(), Some("error"));
        assert_eq!(run.error.as_deref(), Some("introspection timed out"));
    }
}
