//! Store error types for vigil-db.

use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A query or mutation failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// A model or field name is not a plain identifier.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Invalid state encountered (e.g., commit without begin).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Filesystem error (operation logs, snapshots).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    /// Whether the error means the store itself is unreachable, as opposed to
    /// a single statement failing.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::LibSql(e) => {
                let msg = e.to_string().to_ascii_lowercase();
                msg.contains("unable to open")
                    || msg.contains("connection")
                    || msg.contains("disk i/o")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_connectivity() {
        assert!(DatabaseError::Unavailable("down".into()).is_connectivity());
        assert!(!DatabaseError::Query("syntax".into()).is_connectivity());
        assert!(!DatabaseError::InvalidIdentifier("a;b".into()).is_connectivity());
    }
}
