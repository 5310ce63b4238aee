//! Operation log writer.
//!
//! Appends `LogRecord`s to the standard stream and mirrors them into the
//! audit and educational streams when they qualify. Uses
//! `serde_jsonlines::append_json_lines`, which opens, appends and closes the
//! file on every call.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use vigil_core::enums::LogStream;
use vigil_core::models::is_domain_sensitive_name;
use vigil_core::oplog::{AuditRecord, EducationalRecord, LogRecord, is_sensitive_operation};

use super::{log_file_name, parse_log_file_name};
use crate::error::DatabaseError;

/// Files removed and kept by a retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub removed: Vec<String>,
    pub kept: u32,
}

/// Appends maintenance operations to date-partitioned JSON-line logs.
///
/// Logging never fails the caller: every write error is reported through
/// `tracing` and turned into a `false` return.
#[derive(Debug, Clone)]
pub struct OperationLogger {
    log_dir: PathBuf,
    enabled: bool,
}

impl OperationLogger {
    /// Create a logger writing into `log_dir`. The directory is created lazily
    /// on first write.
    #[must_use]
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            enabled: true,
        }
    }

    /// Create a disabled logger (for tests that do not inspect logs).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            log_dir: PathBuf::new(),
            enabled: false,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The directory where log files are stored.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Record one operation. Returns `false` if any stream could not be written.
    pub fn log_operation(
        &self,
        operation: &str,
        model: &str,
        actor_id: &str,
        details: serde_json::Value,
    ) -> bool {
        self.log_record(&LogRecord::new(operation, model, actor_id, details))
    }

    /// Append a prepared record to every stream it belongs to.
    pub fn log_record(&self, record: &LogRecord) -> bool {
        if !self.enabled {
            return true;
        }
        if let Err(e) = std::fs::create_dir_all(&self.log_dir) {
            tracing::warn!(dir = %self.log_dir.display(), error = %e, "cannot create log directory");
            return false;
        }

        let date = record.timestamp.date_naive();
        let mut ok = self.append(LogStream::Standard, date, record);
        if is_sensitive_operation(&record.operation) {
            ok &= self.append(LogStream::Audit, date, &AuditRecord::from_record(record));
        }
        if is_domain_sensitive_name(&record.model) {
            ok &= self.append(
                LogStream::Educational,
                date,
                &EducationalRecord::from_record(record),
            );
        }
        ok
    }

    /// Path of a stream's partition for `date`.
    #[must_use]
    pub fn stream_path(&self, stream: LogStream, date: NaiveDate) -> PathBuf {
        self.log_dir.join(log_file_name(stream, date))
    }

    /// Delete partitions older than their stream's retention.
    ///
    /// Standard and educational files keep `retention_days`, audit files keep
    /// `audit_retention_days`; a partition dated exactly at the cutoff is kept.
    /// Files whose names are not recognised are never touched.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Io` if the directory cannot be listed or a file
    /// cannot be removed.
    pub fn prune(
        &self,
        today: NaiveDate,
        retention_days: u32,
        audit_retention_days: u32,
    ) -> Result<PruneOutcome, DatabaseError> {
        let mut outcome = PruneOutcome::default();
        if !self.log_dir.exists() {
            return Ok(outcome);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.log_dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        for path in paths {
            let Some((stream, date)) = parse_log_file_name(&path) else {
                continue;
            };
            let keep_days = match stream {
                LogStream::Audit => audit_retention_days,
                LogStream::Standard | LogStream::Educational => retention_days,
            };
            let cutoff = today - Duration::days(i64::from(keep_days));
            if date < cutoff {
                std::fs::remove_file(&path)?;
                tracing::debug!(file = %path.display(), %stream, "pruned log partition");
                outcome
                    .removed
                    .push(path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned()));
            } else {
                outcome.kept += 1;
            }
        }
        Ok(outcome)
    }

    fn append<T: Serialize>(&self, stream: LogStream, date: NaiveDate, line: &T) -> bool {
        let path = self.stream_path(stream, date);
        match serde_jsonlines::append_json_lines(&path, [line]) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(file = %path.display(), %stream, error = %e, "operation log write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        serde_jsonlines::json_lines(path)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn creates_directory_and_appends_standard_line() {
        let tmp = TempDir::new().unwrap();
        let logger = OperationLogger::new(tmp.path().join("logs"));

        assert!(logger.log_operation("count", "users", "system", json!({"duration_ms": 3})));
        assert!(logger.log_operation("count", "profiles", "system", json!({})));

        let today = chrono::Utc::now().date_naive();
        let lines = read_lines(&logger.stream_path(LogStream::Standard, today));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["model"], "users");
        assert_eq!(lines[0]["userId"], "system");
        assert!(!logger.stream_path(LogStream::Audit, today).exists());
        assert!(!logger.stream_path(LogStream::Educational, today).exists());
    }

    #[test]
    fn sensitive_operations_are_mirrored_to_audit() {
        let tmp = TempDir::new().unwrap();
        let logger = OperationLogger::new(tmp.path());

        assert!(logger.log_operation("delete_many", "profiles", "system", json!({"count": 2})));

        let today = chrono::Utc::now().date_naive();
        let audit = read_lines(&logger.stream_path(LogStream::Audit, today));
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0]["auditLevel"], "high");
        assert_eq!(audit[0]["ipAddress"], "unknown");
        assert_eq!(audit[0]["operation"], "delete_many");
    }

    #[test]
    fn wellbeing_models_are_mirrored_to_educational_stream() {
        let tmp = TempDir::new().unwrap();
        let logger = OperationLogger::new(tmp.path());

        assert!(logger.log_operation("delete", "emotional_patterns", "usr-1", json!({})));

        let today = chrono::Utc::now().date_naive();
        let edu = read_lines(&logger.stream_path(LogStream::Educational, today));
        assert_eq!(edu[0]["dataClassification"], "sensitive_educational");
        assert_eq!(edu[0]["retentionPeriod"], "7_years");
        assert_eq!(read_lines(&logger.stream_path(LogStream::Audit, today)).len(), 1);
        assert_eq!(read_lines(&logger.stream_path(LogStream::Standard, today)).len(), 1);
    }

    #[test]
    fn unwritable_directory_returns_false() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let logger = OperationLogger::new(blocker.join("logs"));
        assert!(!logger.log_operation("count", "users", "system", json!({})));
    }

    #[test]
    fn disabled_logger_writes_nothing() {
        let logger = OperationLogger::disabled();
        assert!(logger.log_operation("delete", "users", "system", json!({})));
        assert!(!logger.is_enabled());
    }

    #[test]
    fn prune_respects_per_stream_retention() {
        let tmp = TempDir::new().unwrap();
        let logger = OperationLogger::new(tmp.path());
        let today = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let old = today - Duration::days(40);
        let recent = today - Duration::days(5);

        for (stream, date) in [
            (LogStream::Standard, old),
            (LogStream::Standard, recent),
            (LogStream::Educational, old),
            (LogStream::Audit, old),
        ] {
            std::fs::write(logger.stream_path(stream, date), "{}\n").unwrap();
        }
        std::fs::write(tmp.path().join("README.txt"), "keep me").unwrap();

        let outcome = logger.prune(today, 30, 365).unwrap();
        assert_eq!(
            outcome.removed,
            vec![
                log_file_name(LogStream::Standard, old),
                log_file_name(LogStream::Educational, old),
            ]
        );
        assert_eq!(outcome.kept, 2);
        assert!(tmp.path().join("README.txt").exists());
        assert!(logger.stream_path(LogStream::Audit, old).exists());
    }
}
