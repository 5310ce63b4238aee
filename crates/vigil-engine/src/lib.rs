//! # vigil-engine
//!
//! Maintenance operations over a [`vigil_db::Repository`].
//!
//! Every component is an `impl MaintenanceService` block:
//!
//! | Module | Operation |
//! |--------|-----------|
//! | [`health`] | `check_health` |
//! | [`schema`] | `validate_schema`, `validate_configured_schema` |
//! | [`integrity`] | `check_integrity`, `find_integrity_issues` |
//! | [`repair`] | `repair_integrity`, `repair_integrity_with` |
//! | [`usage`] | `collect_usage`, `collect_usage_at` |
//! | [`optimize`] | `optimize`, `optimize_with` |
//! | [`cleanup`] | `cleanup_logs`, `cleanup_logs_at` |
//! | [`pipeline`] | `run_cadence` |
//!
//! Public operations return reports; failures surface as report statuses.

pub mod cleanup;
pub mod error;
pub mod health;
pub mod integrity;
pub mod optimize;
pub mod pipeline;
pub mod repair;
pub mod schema;
pub mod service;
mod snapshot;
pub mod usage;

pub use error::EngineError;
pub use integrity::IntegrityFindings;
pub use repair::RepairOptions;
pub use service::MaintenanceService;
