//! Engine error types.
//!
//! Components return `Result<_, EngineError>` internally; the public
//! operations fold these into report statuses.

use thiserror::Error;
use vigil_core::errors::CoreError;
use vigil_db::DatabaseError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] DatabaseError),

    /// A check or repair step exceeded its configured duration.
    #[error("{operation} timed out after {limit_ms} ms")]
    TimedOut { operation: String, limit_ms: u64 },

    #[error("repair already in progress")]
    RepairInProgress,

    /// Strict safety refused to repair without a pre-repair snapshot.
    #[error("pre-repair snapshot required: {0}")]
    SnapshotRequired(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the store itself became unreachable.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_connectivity())
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let down = EngineError::from(DatabaseError::Unavailable("gone".into()));
        assert!(down.is_connectivity());
        assert!(!down.is_timeout());

        let slow = EngineError::TimedOut {
            operation: "count users".into(),
            limit_ms: 30_000,
        };
        assert!(slow.is_timeout());
        assert_eq!(slow.to_string(), "count users timed out after 30000 ms");
    }
}
