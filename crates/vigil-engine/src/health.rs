//! Health checker.
//!
//! ```text
//! probe ──fail──> unhealthy, no statistics (fail-fast)
//!   │
//!   ok
//!   ├─ entity counts (concurrent, absent models count 0)
//!   ├─ orphan sub-probe
//!   └─ validity sub-probe
//!        └─> issues ─> severity aggregation ─> status
//! ```
//!
//! A sub-probe that exceeds the check timeout becomes a `performance` issue;
//! any other store failure after a successful probe is a `critical`
//! connectivity issue.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use vigil_core::enums::{HealthStatus, IssueCategory, Severity};
use vigil_core::models::Model;
use vigil_core::reports::{HealthReport, HealthStatistics, Issue};
use vigil_db::Predicate;

use crate::error::EngineError;
use crate::service::{MaintenanceService, elapsed_ms, within};

impl MaintenanceService {
    /// Probe, count and run the orphan/validity sub-probes.
    pub async fn check_health(&self) -> HealthReport {
        let start = Instant::now();
        let limit = self.config().checks.timeout();

        if let Err(e) = within("connectivity probe", limit, self.repo().probe()).await {
            tracing::warn!(error = %e, "store probe failed");
            let report = HealthReport::disconnected(e.to_string(), elapsed_ms(start));
            self.record_health(&report);
            return report;
        }
        let probe_latency_ms = elapsed_ms(start);

        let mut issues = Vec::new();
        if probe_latency_ms > self.config().checks.slow_query_ms {
            issues.push(Issue::new(
                IssueCategory::Performance,
                Severity::Low,
                "slow_probe",
                format!(
                    "connectivity probe took {probe_latency_ms} ms (threshold {} ms)",
                    self.config().checks.slow_query_ms
                ),
                1,
            ));
        }

        let stats_start = Instant::now();
        let counts = join_all(Model::ALL.into_iter().map(|model| async move {
            let result = within(
                format!("count {model}"),
                limit,
                self.repo().count(model.as_str(), &Predicate::All),
            )
            .await;
            (model, result)
        }));
        let orphans = within("orphan sub-probe", limit, self.find_orphans());
        let invalid = within("validity sub-probe", limit, self.find_invalid_accounts());
        let (counts, orphans, invalid) = tokio::join!(counts, orphans, invalid);
        let stats_latency_ms = elapsed_ms(stats_start);

        let mut entity_counts = BTreeMap::new();
        for (model, result) in counts {
            match result {
                Ok(n) => {
                    entity_counts.insert(model.as_str().to_string(), n);
                }
                Err(e) => issues.push(failure_issue(&format!("count_{model}"), &e)),
            }
        }

        match orphans {
            Ok(sets) => {
                for set in sets.iter().filter(|s| !s.ids.is_empty()) {
                    issues.push(Issue::new(
                        IssueCategory::Integrity,
                        Severity::High,
                        format!("orphaned_{}", set.model),
                        format!(
                            "{} {} row(s) reference a missing owner",
                            set.ids.len(),
                            set.model
                        ),
                        set.ids.len() as u64,
                    ));
                }
            }
            Err(e) => issues.push(failure_issue("orphan_probe", &e)),
        }

        match invalid {
            Ok(accounts) if !accounts.is_empty() => issues.push(Issue::new(
                IssueCategory::Integrity,
                Severity::Medium,
                "invalid_accounts",
                format!("{} account(s) with empty email or name", accounts.len()),
                accounts.len() as u64,
            )),
            Ok(_) => {}
            Err(e) => issues.push(failure_issue("validity_probe", &e)),
        }

        let total_records = entity_counts.values().sum();
        let report = HealthReport {
            status: HealthStatus::from_severities(issues.iter().map(|i| i.severity)),
            timestamp: Utc::now(),
            connection_status: true,
            statistics: Some(HealthStatistics {
                entity_counts,
                total_records,
                probe_latency_ms,
                stats_latency_ms,
            }),
            issues,
            duration_ms: elapsed_ms(start),
            error: None,
        };
        self.record_health(&report);
        report
    }

    fn record_health(&self, report: &HealthReport) {
        self.record(
            "health_check",
            "*",
            json!({
                "status": report.status,
                "connection_status": report.connection_status,
                "issues": report.issues.len(),
                "duration_ms": report.duration_ms,
                "error": report.error,
            }),
        );
    }
}

/// Issue for a sub-probe that did not complete.
fn failure_issue(code: &str, error: &EngineError) -> Issue {
    if error.is_timeout() {
        Issue::new(
            IssueCategory::Performance,
            Severity::Medium,
            format!("{code}_timeout"),
            error.to_string(),
            1,
        )
    } else {
        Issue::new(
            IssueCategory::Connectivity,
            Severity::Critical,
            format!("{code}_failed"),
            error.to_string(),
            1,
        )
    }
}
