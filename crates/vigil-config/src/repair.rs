//! Integrity repair policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_strict_safety() -> bool {
    true
}

fn default_placeholder_domain() -> String {
    "placeholder.invalid".to_string()
}

fn default_snapshot_dir() -> String {
    ".vigil/snapshots".to_string()
}

const fn default_step_timeout_secs() -> u64 {
    60
}

fn default_actor_id() -> String {
    "system".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepairConfig {
    /// Refuse to repair when the pre-repair snapshot cannot be written.
    #[serde(default = "default_strict_safety")]
    pub strict_safety: bool,

    /// Repair without operator confirmation when a scheduled run finds issues.
    #[serde(default)]
    pub auto_repair: bool,

    /// Domain used for backfilled emails (`placeholder_<id>@<domain>`).
    #[serde(default = "default_placeholder_domain")]
    pub placeholder_domain: String,

    /// Directory for pre-repair snapshots.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    /// Per-step timeout. A step that runs longer is rolled back.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,

    /// Actor recorded in the operation log for engine-initiated changes.
    #[serde(default = "default_actor_id")]
    pub actor_id: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            strict_safety: default_strict_safety(),
            auto_repair: false,
            placeholder_domain: default_placeholder_domain(),
            snapshot_dir: default_snapshot_dir(),
            step_timeout_secs: default_step_timeout_secs(),
            actor_id: default_actor_id(),
        }
    }
}

impl RepairConfig {
    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}
