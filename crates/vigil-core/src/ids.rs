//! Identifier, timestamp and placeholder helpers.
//!
//! Rows travel through the engine as JSON objects, so identifiers may arrive
//! as strings or numbers depending on the store binding. These helpers give
//! them one canonical string form and a deterministic order.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Characters a blank value may consist of: space, tab, line feed, vertical
/// tab, form feed and carriage return. Store bindings must trim the same set.
pub const BLANK_CHARS: [char; 6] = [' ', '\t', '\n', '\u{0b}', '\u{0c}', '\r'];

/// Strip leading and trailing [`BLANK_CHARS`].
#[must_use]
pub fn trim_blank(s: &str) -> &str {
    s.trim_matches(&BLANK_CHARS[..])
}

/// Canonical string form of an identifier value.
///
/// Strings are kept verbatim so stores comparing exact text agree with
/// in-process matching. Returns `None` for null, blank strings, and
/// non-scalar values.
#[must_use]
pub fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !trim_blank(s).is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Order identifiers numerically when both are integers, lexically otherwise.
#[must_use]
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i128>(), b.parse::<i128>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// True for null, missing-equivalent, and whitespace-only string values.
#[must_use]
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => trim_blank(s).is_empty(),
        Some(_) => false,
    }
}

/// Deterministic substitute for an empty account email.
///
/// Unique per identifier, and the domain is expected to be a reserved one
/// (`.invalid`) so it never matches a real address.
#[must_use]
pub fn placeholder_email(id: &str, domain: &str) -> String {
    format!("placeholder_{id}@{domain}")
}

/// Deterministic substitute for an empty account name.
#[must_use]
pub fn placeholder_name(id: &str) -> String {
    format!("User {id}")
}

/// Parse a timestamp value as `DateTime<Utc>`.
///
/// Handles RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`). Anything else yields `None`.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
