//! Health, schema and integrity check configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_slow_query_ms() -> u64 {
    500
}

const fn default_sample_limit() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChecksConfig {
    /// Per sub-check timeout. A check that runs longer is abandoned and
    /// reported as a performance issue.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Probe latency above which a performance issue is raised.
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,

    /// Maximum sample identifiers per integrity sub-check.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Optional TOML manifest replacing the built-in expected schema.
    #[serde(default)]
    pub manifest_path: String,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            slow_query_ms: default_slow_query_ms(),
            sample_limit: default_sample_limit(),
            manifest_path: String::new(),
        }
    }
}

impl ChecksConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn has_manifest(&self) -> bool {
        !self.manifest_path.is_empty()
    }
}
