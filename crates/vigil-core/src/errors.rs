//! Cross-cutting error types for Vigil.
//!
//! Store, engine and configuration errors live in their own crates
//! (`DatabaseError`, `EngineError`, `ConfigError`). The CLI converges them
//! through `anyhow`.

use thiserror::Error;

/// Errors that can be raised by any Vigil crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The expected-schema manifest could not be parsed or is inconsistent.
    #[error("Invalid schema manifest: {0}")]
    InvalidManifest(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
