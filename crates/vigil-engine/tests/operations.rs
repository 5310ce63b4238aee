//! Health, schema, usage, optimization, log retention and cadence runs.

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use tempfile::TempDir;

use vigil_config::VigilConfig;
use vigil_core::enums::{
    Cadence, HealthStatus, IssueCategory, OperationStatus, SchemaStatus, Severity, TaskOutcome,
    UsagePeriod,
};
use vigil_core::oplog::LogRecord;
use vigil_core::schedule::MaintenanceTask;
use vigil_db::{LibSqlStore, MemoryStore, OperationLogger, Repository, StoreOp};
use vigil_engine::MaintenanceService;

fn service(store: &Arc<MemoryStore>, root: &Path, config: VigilConfig) -> MaintenanceService {
    MaintenanceService::new(Arc::clone(store) as Arc<dyn Repository>, config, root)
}

fn reference_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_reference_schema())
}

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn record(op: &str, model: &str, actor: &str, timestamp: &str, duration_ms: u64) -> LogRecord {
    LogRecord {
        timestamp: at(timestamp),
        operation: op.into(),
        model: model.into(),
        user_id: actor.into(),
        details: json!({ "duration_ms": duration_ms }),
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_store_is_healthy() {
    let tmp = TempDir::new().unwrap();
    let store = reference_store();
    store.seed("users", [json!({"id": "1", "email": "a@x.com", "name": "Ann"})]);
    let svc = service(&store, tmp.path(), VigilConfig::default());

    let report = svc.check_health().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert!(report.connection_status);
    let stats = report.statistics.unwrap();
    assert_eq!(stats.entity_counts.len(), 10);
    assert_eq!(stats.entity_counts["users"], 1);
    assert_eq!(stats.total_records, 1);
}

#[tokio::test]
async fn unreachable_store_fails_fast() {
    let tmp = TempDir::new().unwrap();
    let store = reference_store();
    store.set_available(false);
    let svc = service(&store, tmp.path(), VigilConfig::default());

    let report = svc.check_health().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert!(!report.connection_status);
    assert!(report.statistics.is_none());
    assert!(report.error.is_some());
}

#[tokio::test]
async fn absent_models_count_zero() {
    let tmp = TempDir::new().unwrap();
    let store = reference_store();
    store.drop_model("emotional_patterns");
    let svc = service(&store, tmp.path(), VigilConfig::default());

    let report = svc.check_health().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.statistics.unwrap().entity_counts["emotional_patterns"], 0);
}

#[tokio::test]
async fn orphans_and_invalid_accounts_degrade_health() {
    let tmp = TempDir::new().unwrap();
    let store = reference_store();
    store.seed("users", [json!({"id": "1", "email": "", "name": "Ann"})]);
    store.seed("profiles", [json!({"id": "p1", "user_id": "99"})]);
    let svc = service(&store, tmp.path(), VigilConfig::default());

    let report = svc.check_health().await;
    assert_eq!(report.status, HealthStatus::Warning);
    let codes: Vec<&str> = report.issues.iter().map(|i| i.code.as_str()).collect();
    assert!(codes.contains(&"orphaned_profiles"));
    assert!(codes.contains(&"invalid_accounts"));
}

#[tokio::test]
async fn failing_count_is_critical() {
    let tmp = TempDir::new().unwrap();
    let store = reference_store();
    store.fail_next(StoreOp::Count, Some("users"));
    let svc = service(&store, tmp.path(), VigilConfig::default());

    let report = svc.check_health().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert!(report.connection_status);
    let issue = report
        .issues
        .iter()
        .find(|i| i.code == "count_users_failed")
        .unwrap();
    assert_eq!(issue.severity, Severity::Critical);
    assert_eq!(issue.category, IssueCategory::Connectivity);
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reference_store_matches_reference_manifest() {
    let tmp = TempDir::new().unwrap();
    let svc = service(&reference_store(), tmp.path(), VigilConfig::default());
    let report = svc.validate_configured_schema().await;
    assert_eq!(report.status, SchemaStatus::Valid);
    assert_eq!(report.expected_models, 10);
}

#[tokio::test]
async fn missing_model_is_a_schema_error() {
    let tmp = TempDir::new().unwrap();
    let store = reference_store();
    store.drop_model("profiles");
    store.create_model("legacy_sessions", &["id"]);
    let svc = service(&store, tmp.path(), VigilConfig::default());

    let report = svc.validate_configured_schema().await;
    assert_eq!(report.status, SchemaStatus::Error);
    assert_eq!(report.missing_models, vec!["profiles".to_string()]);
    assert_eq!(report.extra_models, vec!["legacy_sessions".to_string()]);
}

#[tokio::test]
async fn introspection_failure_is_reported() {
    let tmp = TempDir::new().unwrap();
    let store = reference_store();
    store.fail_next(StoreOp::Introspect, None);
    let svc = service(&store, tmp.path(), VigilConfig::default());

    let report = svc.validate_configured_schema().await;
    assert_eq!(report.status, SchemaStatus::Error);
    assert!(report.error.is_some());
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn usage_replays_the_window() {
    let tmp = TempDir::new().unwrap();
    let logger = OperationLogger::new(tmp.path().join(".vigil/logs"));
    for r in [
        record("findMany", "users", "alice", "2026-03-09T08:00:00Z", 10),
        record("update", "users", "alice", "2026-03-08T08:00:00Z", 40),
        record("delete", "profiles", "bob", "2026-03-09T09:00:00Z", 20),
        record("findMany", "users", "carol", "2026-02-01T08:00:00Z", 900),
    ] {
        assert!(logger.log_record(&r));
    }

    let svc = service(&reference_store(), tmp.path(), VigilConfig::default());
    let report = svc.collect_usage_at(UsagePeriod::Weekly, at("2026-03-10T00:00:00Z"));

    assert_eq!(report.status, OperationStatus::Success);
    assert_eq!(report.entries, 3);
    assert_eq!(report.operations.read, 1);
    assert_eq!(report.operations.write, 1);
    assert_eq!(report.operations.delete, 1);
    assert!(!report.by_actor.contains_key("carol"));
    assert_eq!(report.by_actor["alice"].last_active, at("2026-03-09T08:00:00Z"));
    assert_eq!(report.latency.slowest_ms, 40.0);
    assert_eq!(report.latency.slowest_model.as_deref(), Some("users"));
}

#[tokio::test]
async fn malformed_lines_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let log_dir = tmp.path().join(".vigil/logs");
    let logger = OperationLogger::new(&log_dir);
    for i in 0..9 {
        let ts = format!("2026-03-09T08:0{i}:00Z");
        assert!(logger.log_record(&record("findMany", "users", "alice", &ts, 5)));
    }
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(log_dir.join("db-operations-2026-03-09.log"))
        .unwrap();
    writeln!(file, "{{\"timestamp\": \"not a time\", \"operation\":").unwrap();

    let svc = service(&reference_store(), tmp.path(), VigilConfig::default());
    let report = svc.collect_usage_at(UsagePeriod::Daily, at("2026-03-09T23:00:00Z"));

    assert_eq!(report.status, OperationStatus::Success);
    assert_eq!(report.entries, 9);
    assert_eq!(report.skipped_lines, 1);
}

#[tokio::test]
async fn usage_without_logs_is_empty() {
    let tmp = TempDir::new().unwrap();
    let svc = service(&reference_store(), tmp.path(), VigilConfig::default());
    let report = svc.collect_usage_at(UsagePeriod::Monthly, at("2026-03-10T00:00:00Z"));
    assert_eq!(report.status, OperationStatus::Success);
    assert_eq!(report.files_read, 0);
    assert_eq!(report.entries, 0);
}

// ---------------------------------------------------------------------------
// Optimize / cleanup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn optimize_is_skipped_without_optimizer() {
    let tmp = TempDir::new().unwrap();
    let svc = service(&reference_store(), tmp.path(), VigilConfig::default());
    let report = svc.optimize().await;
    assert_eq!(report.status, OperationStatus::Skipped);
    assert!(!report.operations.vacuum);
}

#[tokio::test]
async fn optimize_runs_against_libsql() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("vigil.db");
    let store = LibSqlStore::open_local(path.to_str().unwrap()).await.unwrap();
    store.apply_reference_schema().await.unwrap();
    let svc = MaintenanceService::new(Arc::new(store), VigilConfig::default(), tmp.path());

    let report = svc.optimize().await;
    assert_eq!(report.status, OperationStatus::Success, "{:?}", report.error);
    assert!(report.operations.vacuum && report.operations.analyze && report.operations.reindex);
}

#[tokio::test]
async fn cleanup_applies_per_stream_retention() {
    let tmp = TempDir::new().unwrap();
    let log_dir = tmp.path().join(".vigil/logs");
    std::fs::create_dir_all(&log_dir).unwrap();
    for name in [
        "db-operations-2026-01-01.log",
        "db-operations-2026-03-01.log",
        "audit-log-2026-01-01.log",
        "educational-data-2026-01-01.log",
        "notes.txt",
    ] {
        std::fs::write(log_dir.join(name), "").unwrap();
    }

    let svc = service(&reference_store(), tmp.path(), VigilConfig::default());
    let report = svc.cleanup_logs_at(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());

    assert_eq!(report.status, OperationStatus::Success);
    let mut removed = report.files_removed.clone();
    removed.sort();
    assert_eq!(
        removed,
        vec![
            "db-operations-2026-01-01.log".to_string(),
            "educational-data-2026-01-01.log".to_string(),
        ]
    );
    assert!(log_dir.join("audit-log-2026-01-01.log").exists());
    assert!(log_dir.join("notes.txt").exists());
}

// ---------------------------------------------------------------------------
// Cadence runs
// ---------------------------------------------------------------------------

fn tasks(report: &vigil_core::reports::MaintenanceRunReport) -> Vec<(MaintenanceTask, TaskOutcome)> {
    report.tasks.iter().map(|t| (t.task, t.outcome)).collect()
}

#[tokio::test]
async fn daily_run_delegates_backup() {
    let tmp = TempDir::new().unwrap();
    let svc = service(&reference_store(), tmp.path(), VigilConfig::default());

    let report = svc.run_cadence(Cadence::Daily).await;
    assert_eq!(report.status, OperationStatus::Success);
    assert_eq!(
        tasks(&report),
        vec![
            (MaintenanceTask::HealthCheck, TaskOutcome::Completed),
            (MaintenanceTask::Backup, TaskOutcome::Delegated),
            (MaintenanceTask::LogRotation, TaskOutcome::Completed),
        ]
    );
}

#[tokio::test]
async fn weekly_run_repairs_when_enabled() {
    let tmp = TempDir::new().unwrap();
    let store = reference_store();
    store.seed("users", [json!({"id": "1", "email": "a@x.com", "name": "Ann"})]);
    store.seed("profiles", [json!({"id": "p9", "user_id": "99"})]);
    let mut config = VigilConfig::default();
    config.repair.auto_repair = true;
    let svc = service(&store, tmp.path(), config);

    let report = svc.run_cadence(Cadence::Weekly).await;
    assert_eq!(
        tasks(&report),
        vec![
            (MaintenanceTask::HealthCheck, TaskOutcome::Completed),
            (MaintenanceTask::VacuumAnalyze, TaskOutcome::Completed),
            (MaintenanceTask::IntegrityCheck, TaskOutcome::Completed),
            (MaintenanceTask::IntegrityRepair, TaskOutcome::Completed),
            (MaintenanceTask::UsageCollection, TaskOutcome::Completed),
        ]
    );
    assert_eq!(report.tasks[1].status.as_deref(), Some("skipped"));
    assert!(store.rows("profiles").is_empty());
}

#[tokio::test]
async fn disconnected_run_skips_everything_after_health() {
    let tmp = TempDir::new().unwrap();
    let store = reference_store();
    store.set_available(false);
    let svc = service(&store, tmp.path(), VigilConfig::default());

    let report = svc.run_cadence(Cadence::Monthly).await;
    assert_eq!(report.status, OperationStatus::Error);
    assert!(report.error.is_some());
    assert_eq!(
        tasks(&report),
        vec![
            (MaintenanceTask::HealthCheck, TaskOutcome::Failed),
            (MaintenanceTask::FullOptimization, TaskOutcome::Skipped),
            (MaintenanceTask::SchemaValidation, TaskOutcome::Skipped),
            (MaintenanceTask::StorageCleanup, TaskOutcome::Skipped),
        ]
    );
}
