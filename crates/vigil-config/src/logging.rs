//! Operation log configuration.

use serde::{Deserialize, Serialize};

fn default_log_dir() -> String {
    ".vigil/logs".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

const fn default_audit_retention_days() -> u32 {
    365
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory holding the date-partitioned operation logs.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Days to keep standard and educational log files.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Days to keep audit log files.
    #[serde(default = "default_audit_retention_days")]
    pub audit_retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            retention_days: default_retention_days(),
            audit_retention_days: default_audit_retention_days(),
        }
    }
}
