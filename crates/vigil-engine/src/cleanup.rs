//! Operation-log retention.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use vigil_core::enums::OperationStatus;
use vigil_core::reports::CleanupReport;

use crate::service::MaintenanceService;

impl MaintenanceService {
    /// Remove log partitions past retention, as of today (UTC).
    pub fn cleanup_logs(&self) -> CleanupReport {
        self.cleanup_logs_at(Utc::now().date_naive())
    }

    /// Remove log partitions older than the configured retention relative
    /// to `today`. Audit partitions use the audit retention.
    pub fn cleanup_logs_at(&self, today: NaiveDate) -> CleanupReport {
        if !self.logger().is_enabled() {
            return CleanupReport {
                status: OperationStatus::Skipped,
                timestamp: Utc::now(),
                files_removed: Vec::new(),
                files_kept: 0,
                error: None,
            };
        }

        let logging = &self.config().logging;
        let report = match self
            .logger()
            .prune(today, logging.retention_days, logging.audit_retention_days)
        {
            Ok(outcome) => CleanupReport {
                status: OperationStatus::Success,
                timestamp: Utc::now(),
                files_removed: outcome.removed,
                files_kept: outcome.kept,
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "log retention pass failed");
                CleanupReport {
                    status: OperationStatus::Error,
                    timestamp: Utc::now(),
                    files_removed: Vec::new(),
                    files_kept: 0,
                    error: Some(e.to_string()),
                }
            }
        };

        tracing::info!(removed = report.files_removed.len(), kept = report.files_kept, "log retention applied");
        self.record(
            "log_cleanup",
            "*",
            json!({
                "status": report.status,
                "removed": report.files_removed,
                "kept": report.files_kept,
            }),
        );
        report
    }
}
