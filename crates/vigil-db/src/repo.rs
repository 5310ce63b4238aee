//! Generic repository capability consumed by the maintenance engine.
//!
//! The engine never issues store-specific statements. Every check and repair
//! is written against [`Repository`], and each store binding implements it.
//! Store-level maintenance commands are an optional [`Optimizer`] capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::predicate::{Predicate, Row};

/// A field exposed by a live model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// NOT NULL or primary key.
    pub required: bool,
}

/// A model present in the live store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ModelDescriptor {
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Store operations the engine relies on.
///
/// Reads against a model the store does not have are not errors: `count`
/// returns 0, `query` an empty list, and `update`/`delete` affect nothing.
/// Transactions are single-level: `begin` while one is open is an
/// `InvalidState` error.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Cheap round trip proving the store is reachable.
    async fn probe(&self) -> Result<(), DatabaseError>;

    /// Every model in the live store with its fields.
    async fn introspect(&self) -> Result<Vec<ModelDescriptor>, DatabaseError>;

    async fn count(&self, model: &str, filter: &Predicate) -> Result<u64, DatabaseError>;

    async fn query(&self, model: &str, filter: &Predicate) -> Result<Vec<Row>, DatabaseError>;

    async fn insert(&self, model: &str, row: Row) -> Result<(), DatabaseError>;

    /// Set `changes` on every row matching `filter`. Returns rows affected.
    async fn update(
        &self,
        model: &str,
        filter: &Predicate,
        changes: &Row,
    ) -> Result<u64, DatabaseError>;

    /// Remove every row matching `filter`. Returns rows affected.
    async fn delete(&self, model: &str, filter: &Predicate) -> Result<u64, DatabaseError>;

    async fn begin(&self) -> Result<(), DatabaseError>;

    async fn commit(&self) -> Result<(), DatabaseError>;

    async fn rollback(&self) -> Result<(), DatabaseError>;

    /// Store-level maintenance commands, when the binding has them.
    fn optimizer(&self) -> Option<&dyn Optimizer> {
        None
    }
}

/// Vacuum/analyze/reindex for stores that expose them.
#[async_trait]
pub trait Optimizer: Send + Sync {
    async fn vacuum(&self) -> Result<(), DatabaseError>;

    async fn analyze(&self) -> Result<(), DatabaseError>;

    async fn reindex(&self) -> Result<(), DatabaseError>;
}
