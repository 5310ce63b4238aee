//! Store-level optimization: vacuum, analyze, reindex.
//!
//! Each requested command runs separately under the step timeout. Stores
//! without an optimizer report `skipped`.

use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use vigil_core::enums::OperationStatus;
use vigil_core::reports::{OptimizeOperations, OptimizeReport};

use crate::service::{MaintenanceService, elapsed_ms, within};

impl MaintenanceService {
    /// Run vacuum, analyze and reindex.
    pub async fn optimize(&self) -> OptimizeReport {
        self.optimize_with(OptimizeOperations {
            vacuum: true,
            analyze: true,
            reindex: true,
        })
        .await
    }

    /// Run the requested commands. `operations` in the report records which
    /// ones actually succeeded.
    pub async fn optimize_with(&self, requested: OptimizeOperations) -> OptimizeReport {
        let start = Instant::now();
        let Some(optimizer) = self.repo().optimizer() else {
            tracing::info!("store exposes no optimizer; skipping");
            let report = OptimizeReport {
                status: OperationStatus::Skipped,
                timestamp: Utc::now(),
                operations: OptimizeOperations::default(),
                duration_ms: elapsed_ms(start),
                error: None,
            };
            self.record_optimize(&report);
            return report;
        };

        let limit = self.config().repair.step_timeout();
        let mut done = OptimizeOperations::default();
        let mut errors = Vec::new();
        let mut attempted = 0_u32;
        let mut succeeded = 0_u32;

        if requested.vacuum {
            attempted += 1;
            match within("vacuum", limit, optimizer.vacuum()).await {
                Ok(()) => {
                    done.vacuum = true;
                    succeeded += 1;
                }
                Err(e) => errors.push(format!("vacuum: {e}")),
            }
        }
        if requested.analyze {
            attempted += 1;
            match within("analyze", limit, optimizer.analyze()).await {
                Ok(()) => {
                    done.analyze = true;
                    succeeded += 1;
                }
                Err(e) => errors.push(format!("analyze: {e}")),
            }
        }
        if requested.reindex {
            attempted += 1;
            match within("reindex", limit, optimizer.reindex()).await {
                Ok(()) => {
                    done.reindex = true;
                    succeeded += 1;
                }
                Err(e) => errors.push(format!("reindex: {e}")),
            }
        }

        let status = if attempted == 0 {
            OperationStatus::Skipped
        } else if succeeded == attempted {
            OperationStatus::Success
        } else if succeeded > 0 {
            OperationStatus::Partial
        } else {
            OperationStatus::Error
        };
        for error in &errors {
            tracing::warn!(%error, "optimization command failed");
        }

        let report = OptimizeReport {
            status,
            timestamp: Utc::now(),
            operations: done,
            duration_ms: elapsed_ms(start),
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        };
        self.record_optimize(&report);
        report
    }

    fn record_optimize(&self, report: &OptimizeReport) {
        self.record(
            "optimize",
            "*",
            json!({
                "status": report.status,
                "operations": report.operations,
                "duration_ms": report.duration_ms,
                "error": report.error,
            }),
        );
    }
}
