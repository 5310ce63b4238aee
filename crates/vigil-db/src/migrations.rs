//! Reference schema bootstrap.
//!
//! Embeds the SQL migration files at compile time. Maintenance never runs
//! them implicitly; `vgl bootstrap` and tests apply them to a fresh store.
//! All statements use `IF NOT EXISTS` so re-running is harmless.

use crate::error::DatabaseError;
use crate::libsql_store::LibSqlStore;

/// Reference schema: 10 tables and their reference indexes.
const MIGRATION_001: &str = include_str!("../migrations/001_reference.sql");

impl LibSqlStore {
    /// Create the reference models if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Query` naming the migration that failed.
    pub async fn apply_reference_schema(&self) -> Result<(), DatabaseError> {
        self.conn()
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| DatabaseError::Query(format!("001_reference: {e}")))?;
        Ok(())
    }
}
