//! # vigil-db
//!
//! Store access for the Vigil maintenance engine.
//!
//! - [`Repository`]: the generic capability every check and repair is written
//!   against, with an optional [`Optimizer`] for vacuum/analyze/reindex
//! - [`LibSqlStore`]: libSQL binding (the `libsql` crate, v0.9.29)
//! - [`MemoryStore`]: in-process binding with fault injection, used by tests
//! - [`oplog`]: date-partitioned JSON-line operation logs

pub mod error;
pub mod libsql_store;
pub mod memory;
mod migrations;
pub mod oplog;
pub mod predicate;
pub mod repo;

pub use error::DatabaseError;
pub use libsql_store::LibSqlStore;
pub use memory::{MemoryStore, StoreOp};
pub use oplog::{LogReader, OperationLogger};
pub use predicate::{Predicate, Row};
pub use repo::{FieldDescriptor, ModelDescriptor, Optimizer, Repository};
