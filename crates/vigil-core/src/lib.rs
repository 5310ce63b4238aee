//! # vigil-core
//!
//! Core types shared by every Vigil crate.
//!
//! This crate holds the vocabulary of the maintenance engine, independent of
//! any store binding:
//! - Model catalogue and ownership rules for the educational data store
//! - Status, severity and cadence enums
//! - Report envelopes returned by every maintenance operation
//! - The JSON-line operation record written to the operation logs
//! - The expected-schema manifest
//! - The declarative maintenance schedule
//! - Identifier and placeholder helpers
//! - Cross-cutting error types

pub mod enums;
pub mod errors;
pub mod ids;
pub mod manifest;
pub mod models;
pub mod oplog;
pub mod reports;
pub mod schedule;
