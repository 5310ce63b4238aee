//! Date-partitioned JSON-line operation logs.
//!
//! Three streams live side by side in the log directory:
//!
//! ```text
//! db-operations-2026-03-01.log      every operation
//! audit-log-2026-03-01.log          sensitive operations (delete, role change, ...)
//! educational-data-2026-03-01.log   operations on wellbeing models
//! ```
//!
//! [`OperationLogger`] appends; [`LogReader`] replays a time window.

pub mod reader;
pub mod writer;

pub use reader::{LogReader, ReadOutcome};
pub use writer::{OperationLogger, PruneOutcome};

use std::path::Path;

use chrono::NaiveDate;
use vigil_core::enums::LogStream;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// File name of a stream's partition for `date`.
#[must_use]
pub fn log_file_name(stream: LogStream, date: NaiveDate) -> String {
    format!("{}-{}.log", stream.file_prefix(), date.format(DATE_FORMAT))
}

/// Recover the stream and date from a log file name. Unrecognised names yield `None`.
#[must_use]
pub fn parse_log_file_name(path: &Path) -> Option<(LogStream, NaiveDate)> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".log")?;
    LogStream::ALL.into_iter().find_map(|stream| {
        let date = stem.strip_prefix(stream.file_prefix())?.strip_prefix('-')?;
        NaiveDate::parse_from_str(date, DATE_FORMAT)
            .ok()
            .map(|d| (stream, d))
    })
}
