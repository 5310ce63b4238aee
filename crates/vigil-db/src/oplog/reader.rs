//! Operation log replay over a time window.
//!
//! Corrupt lines are counted and skipped; they never abort the replay.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use vigil_core::enums::LogStream;
use vigil_core::oplog::LogRecord;

use super::parse_log_file_name;
use crate::error::DatabaseError;

/// Records found in a window, plus how the files parsed.
#[derive(Debug, Clone, Default)]
pub struct ReadOutcome {
    pub files_read: u32,
    /// Well-formed records with `start <= timestamp <= end`.
    pub records: Vec<LogRecord>,
    /// Lines that were not valid records.
    pub skipped_lines: u64,
}

pub struct LogReader {
    log_dir: PathBuf,
}

impl LogReader {
    #[must_use]
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Replay every record of `stream` whose timestamp falls in `[start, end]`.
    ///
    /// Only partitions dated within the window are opened. A missing log
    /// directory yields an empty outcome.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Io` if the directory exists but cannot be listed.
    pub fn read_window(
        &self,
        stream: LogStream,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ReadOutcome, DatabaseError> {
        let mut outcome = ReadOutcome::default();
        if !self.log_dir.is_dir() {
            return Ok(outcome);
        }

        let (first_day, last_day) = (start.date_naive(), end.date_naive());
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.log_dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                parse_log_file_name(path).is_some_and(|(s, date)| {
                    s == stream && date >= first_day && date <= last_day
                })
            })
            .collect();
        files.sort();

        for path in files {
            let lines = match serde_jsonlines::json_lines(&path) {
                Ok(lines) => lines,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "cannot open log partition");
                    continue;
                }
            };
            outcome.files_read += 1;

            for line in lines {
                let line: std::io::Result<LogRecord> = line;
                match line {
                    Ok(record) if record.timestamp >= start && record.timestamp <= end => {
                        outcome.records.push(record);
                    }
                    Ok(_) => {}
                    // Truncated lines surface as UnexpectedEof, bad JSON as InvalidData.
                    Err(e) if matches!(e.kind(), ErrorKind::InvalidData | ErrorKind::UnexpectedEof) => {
                        outcome.skipped_lines += 1;
                    }
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "log partition read aborted");
                        outcome.skipped_lines += 1;
                        break;
                    }
                }
            }
        }

        if outcome.skipped_lines > 0 {
            tracing::debug!(
                skipped = outcome.skipped_lines,
                %stream,
                "skipped malformed log lines"
            );
        }
        Ok(outcome)
    }
}
