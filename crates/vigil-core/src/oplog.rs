//! JSON-line operation record envelope.
//!
//! Every maintenance operation is appended as one `LogRecord` per line to a
//! date-partitioned file (`db-operations-YYYY-MM-DD.log`). Sensitive operations
//! are mirrored into the audit stream as `AuditRecord`, and operations on
//! domain-sensitive models into the educational stream as `EducationalRecord`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Audit level stamped on every audit-stream record.
pub const AUDIT_LEVEL_HIGH: &str = "high";
/// Placeholder for caller network/client context when none is supplied.
pub const UNKNOWN_CLIENT: &str = "unknown";
/// Data classification stamped on educational-stream records.
pub const SENSITIVE_EDUCATIONAL: &str = "sensitive_educational";
/// Retention period stamped on educational-stream records.
pub const EDUCATIONAL_RETENTION: &str = "7_years";

/// Operations that are mirrored into the audit stream.
pub const SENSITIVE_OPERATIONS: &[&str] = &[
    "delete",
    "delete_many",
    "bulk_delete",
    "role_change",
    "permission_change",
];

/// Whether an operation name is audit-sensitive. `deleteMany` and
/// `delete_many` are treated alike.
#[must_use]
pub fn is_sensitive_operation(operation: &str) -> bool {
    let normalized = to_snake(operation);
    SENSITIVE_OPERATIONS.contains(&normalized.as_str())
}

fn to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, ch) in s.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch == '-' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
    out
}

/// A single line of the standard operation log.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// ISO 8601 timestamp of the operation.
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub model: String,
    /// Actor that performed the operation.
    pub user_id: String,
    /// Free-form payload. `duration_ms` (number) is read as the query time.
    #[serde(default)]
    pub details: serde_json::Value,
}

impl LogRecord {
    #[must_use]
    pub fn new(
        operation: impl Into<String>,
        model: impl Into<String>,
        user_id: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: operation.into(),
            model: model.into(),
            user_id: user_id.into(),
            details,
        }
    }

    /// Query time recorded in `details.duration_ms`, if any.
    #[must_use]
    pub fn duration_ms(&self) -> Option<f64> {
        self.details.get("duration_ms").and_then(serde_json::Value::as_f64)
    }
}

/// Audit-stream mirror of a sensitive operation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    #[serde(flatten)]
    pub record: LogRecord,
    pub audit_level: String,
    pub ip_address: String,
    pub user_agent: String,
}

impl AuditRecord {
    /// Wrap a record, taking `ip_address`/`user_agent` from its details when present.
    #[must_use]
    pub fn from_record(record: &LogRecord) -> Self {
        let context = |key: &str| {
            record
                .details
                .get(key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or(UNKNOWN_CLIENT)
                .to_string()
        };
        Self {
            ip_address: context("ip_address"),
            user_agent: context("user_agent"),
            audit_level: AUDIT_LEVEL_HIGH.to_string(),
            record: record.clone(),
        }
    }
}

/// Educational-stream mirror of an operation on a domain-sensitive model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EducationalRecord {
    #[serde(flatten)]
    pub record: LogRecord,
    pub data_classification: String,
    pub retention_period: String,
}

impl EducationalRecord {
    #[must_use]
    pub fn from_record(record: &LogRecord) -> Self {
        Self {
            record: record.clone(),
            data_classification: SENSITIVE_EDUCATIONAL.to_string(),
            retention_period: EDUCATIONAL_RETENTION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_uses_wire_field_names() {
        let record = LogRecord::new("delete", "profiles", "system", json!({"count": 2}));
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["timestamp", "operation", "model", "userId", "details"] {
            assert!(keys.contains(&key), "missing key {key}: {keys:?}");
        }
    }

    #[test]
    fn record_roundtrip_through_line() {
        let record = LogRecord::new("find_many", "users", "usr-1", json!({"duration_ms": 12.5}));
        let line = serde_json::to_string(&record).unwrap();
        let recovered: LogRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(recovered, record);
        assert_eq!(recovered.duration_ms(), Some(12.5));
    }

    #[test]
    fn audit_record_flattens_and_defaults_context() {
        let record = LogRecord::new("bulk_delete", "users", "system", json!({}));
        let audit = AuditRecord::from_record(&record);
        let value = serde_json::to_value(&audit).unwrap();
        assert_eq!(value["operation"], "bulk_delete");
        assert_eq!(value["auditLevel"], "high");
        assert_eq!(value["ipAddress"], "unknown");
        assert_eq!(value["userAgent"], "unknown");
    }

    #[test]
    fn audit_record_keeps_supplied_context() {
        let record = LogRecord::new(
            "role_change",
            "users",
            "admin-1",
            json!({"ip_address": "10.0.0.4", "user_agent": "vgl/0.1"}),
        );
        let audit = AuditRecord::from_record(&record);
        assert_eq!(audit.ip_address, "10.0.0.4");
        assert_eq!(audit.user_agent, "vgl/0.1");
    }

    #[test]
    fn sensitive_operation_detection() {
        assert!(is_sensitive_operation("delete"));
        assert!(is_sensitive_operation("deleteMany"));
        assert!(is_sensitive_operation("bulk_delete"));
        assert!(is_sensitive_operation("roleChange"));
        assert!(!is_sensitive_operation("update"));
        assert!(!is_sensitive_operation("find_many"));
    }

    #[test]
    fn educational_record_classification() {
        let record = LogRecord::new("create", "semh_assessments", "usr-9", json!({}));
        let edu = EducationalRecord::from_record(&record);
        let value = serde_json::to_value(&edu).unwrap();
        assert_eq!(value["dataClassification"], "sensitive_educational");
        assert_eq!(value["retentionPeriod"], "7_years");
        assert_eq!(value["model"], "semh_assessments");
    }
}
