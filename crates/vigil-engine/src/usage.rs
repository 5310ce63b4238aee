//! Usage statistics collector.
//!
//! Replays the standard operation-log stream over a trailing window and folds
//! it into per-class, per-model and per-actor counts plus latency statistics.
//! Malformed lines are skipped and counted, never fatal.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use vigil_core::enums::{LogStream, OperationClass, OperationStatus, UsagePeriod};
use vigil_core::oplog::LogRecord;
use vigil_core::reports::{ActorUsage, LatencyStats, OperationCounts, UsageReport};
use vigil_db::LogReader;

use crate::service::{MaintenanceService, elapsed_ms};

impl MaintenanceService {
    /// Collect usage for the window ending now.
    pub fn collect_usage(&self, period: UsagePeriod) -> UsageReport {
        self.collect_usage_at(period, Utc::now())
    }

    /// Collect usage for `[now - period, now]`.
    pub fn collect_usage_at(&self, period: UsagePeriod, now: DateTime<Utc>) -> UsageReport {
        let start = Instant::now();
        let window_start = now - Duration::days(i64::from(period.days()));
        let reader = LogReader::new(self.resolve(&self.config().logging.log_dir));

        let report = match reader.read_window(LogStream::Standard, window_start, now) {
            Ok(outcome) if outcome.files_read == 0 => {
                UsageReport::empty(period, window_start, now)
            }
            Ok(outcome) => {
                let mut report = aggregate(period, window_start, now, &outcome.records);
                report.files_read = outcome.files_read;
                report.skipped_lines = outcome.skipped_lines;
                report
            }
            Err(e) => {
                tracing::warn!(error = %e, "operation log replay failed");
                UsageReport {
                    status: OperationStatus::Error,
                    error: Some(e.to_string()),
                    ..UsageReport::empty(period, window_start, now)
                }
            }
        };

        if report.skipped_lines > 0 {
            tracing::warn!(skipped = report.skipped_lines, "malformed operation log lines ignored");
        }
        self.record(
            "usage_collection",
            "*",
            json!({
                "period": period,
                "files_read": report.files_read,
                "entries": report.entries,
                "skipped_lines": report.skipped_lines,
                "duration_ms": elapsed_ms(start),
            }),
        );
        report
    }
}

fn tally(counts: &mut OperationCounts, class: OperationClass) {
    counts.total += 1;
    match class {
        OperationClass::Read => counts.read += 1,
        OperationClass::Write => counts.write += 1,
        OperationClass::Delete => counts.delete += 1,
        OperationClass::Other => {}
    }
}

fn aggregate(
    period: UsagePeriod,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    records: &[LogRecord],
) -> UsageReport {
    let mut report = UsageReport::empty(period, window_start, window_end);
    let mut by_model: BTreeMap<String, OperationCounts> = BTreeMap::new();
    let mut by_actor: BTreeMap<String, ActorUsage> = BTreeMap::new();
    let mut samples: Vec<(f64, &str)> = Vec::new();

    for record in records {
        let class = OperationClass::classify(&record.operation);
        tally(&mut report.operations, class);
        tally(by_model.entry(record.model.clone()).or_default(), class);

        by_actor
            .entry(record.user_id.clone())
            .and_modify(|usage| {
                usage.operations += 1;
                usage.last_active = usage.last_active.max(record.timestamp);
            })
            .or_insert(ActorUsage {
                operations: 1,
                last_active: record.timestamp,
            });

        if let Some(ms) = record.duration_ms().filter(|ms| ms.is_finite() && *ms >= 0.0) {
            samples.push((ms, record.model.as_str()));
        }
    }

    report.entries = records.len() as u64;
    report.by_model = by_model;
    report.by_actor = by_actor;
    report.latency = latency(&samples);
    report
}

/// Average, nearest-rank percentiles and the slowest sample.
fn latency(samples: &[(f64, &str)]) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats::default();
    }
    let mut sorted: Vec<f64> = samples.iter().map(|(ms, _)| *ms).collect();
    sorted.sort_by(f64::total_cmp);

    let slowest = samples
        .iter()
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(ms, model)| (*ms, (*model).to_string()));

    #[allow(clippy::cast_precision_loss)]
    let average_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
    LatencyStats {
        samples: sorted.len() as u64,
        average_ms,
        p50_ms: nearest_rank(&sorted, 50),
        p95_ms: nearest_rank(&sorted, 95),
        slowest_ms: slowest.as_ref().map_or(0.0, |(ms, _)| *ms),
        slowest_model: slowest.map(|(_, model)| model),
    }
}

fn nearest_rank(sorted: &[f64], percentile: usize) -> f64 {
    let rank = (percentile * sorted.len()).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::Value;

    fn record(op: &str, model: &str, actor: &str, at: &str, duration: Option<f64>) -> LogRecord {
        LogRecord {
            timestamp: at.parse().unwrap(),
            operation: op.into(),
            model: model.into(),
            user_id: actor.into(),
            details: duration.map_or(Value::Null, |ms| json!({ "duration_ms": ms })),
        }
    }

    #[rstest]
    #[case(20, 50, 10.0)]
    #[case(20, 95, 19.0)]
    #[case(10, 95, 10.0)]
    #[case(3, 50, 2.0)]
    #[case(1, 95, 1.0)]
    fn nearest_rank_percentiles(#[case] n: u32, #[case] pct: usize, #[case] expected: f64) {
        let sorted: Vec<f64> = (1..=n).map(f64::from).collect();
        assert_eq!(nearest_rank(&sorted, pct), expected);
    }

    #[test]
    fn aggregates_classes_models_and_actors() {
        let records = vec![
            record("findMany", "users", "alice", "2026-03-02T10:00:00Z", Some(12.0)),
            record("update", "users", "alice", "2026-03-01T09:00:00Z", Some(30.0)),
            record("delete_many", "profiles", "maint", "2026-03-02T11:00:00Z", None),
            record("health_check", "*", "maint", "2026-03-02T12:00:00Z", None),
        ];
        let now: DateTime<Utc> = "2026-03-03T00:00:00Z".parse().unwrap();
        let report = aggregate(UsagePeriod::Weekly, now - Duration::days(7), now, &records);

        assert_eq!(report.entries, 4);
        assert_eq!(
            report.operations,
            OperationCounts {
                total: 4,
                read: 1,
                write: 1,
                delete: 1,
            }
        );
        assert_eq!(report.by_model["users"].total, 2);
        assert_eq!(report.by_model["profiles"].delete, 1);

        let alice = &report.by_actor["alice"];
        assert_eq!(alice.operations, 2);
        assert_eq!(alice.last_active, "2026-03-02T10:00:00Z".parse::<DateTime<Utc>>().unwrap());

        assert_eq!(report.latency.samples, 2);
        assert_eq!(report.latency.average_ms, 21.0);
        assert_eq!(report.latency.slowest_ms, 30.0);
        assert_eq!(report.latency.slowest_model.as_deref(), Some("users"));
    }

    #[test]
    fn no_samples_means_zero_latency() {
        let stats = latency(&[]);
        assert_eq!(stats, LatencyStats::default());
    }
}
