//! Service layer tying the store, the operation log and configuration together.
//!
//! `MaintenanceService` owns an injected [`Repository`], the
//! [`OperationLogger`], and the loaded [`VigilConfig`]. Each maintenance
//! component is implemented as `impl MaintenanceService` in its own module.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use vigil_config::VigilConfig;
use vigil_core::manifest::SchemaManifest;
use vigil_db::{LibSqlStore, OperationLogger, Repository};

use crate::error::EngineError;

/// Runs maintenance operations against one store.
///
/// Every public operation returns a report rather than an error: store
/// unavailability is a reportable state. Operations record themselves in the
/// operation log under the configured actor.
pub struct MaintenanceService {
    repo: Arc<dyn Repository>,
    logger: OperationLogger,
    config: VigilConfig,
    manifest: SchemaManifest,
    project_root: PathBuf,
    /// Held for the duration of a repair pass.
    pub(crate) repair_gate: tokio::sync::Mutex<()>,
    pub(crate) snapshot_seq: AtomicU64,
}

impl MaintenanceService {
    /// Build a service over an existing repository.
    ///
    /// Relative paths in `config` (logs, snapshots) resolve against
    /// `project_root`.
    #[must_use]
    pub fn new(
        repo: Arc<dyn Repository>,
        config: VigilConfig,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        let project_root = project_root.into();
        let logger = OperationLogger::new(project_root.join(&config.logging.log_dir));
        Self {
            repo,
            logger,
            config,
            manifest: SchemaManifest::default(),
            project_root,
            repair_gate: tokio::sync::Mutex::new(()),
            snapshot_seq: AtomicU64::new(0),
        }
    }

    /// Open the configured libSQL store and manifest for a project.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the store cannot be opened and
    /// `EngineError::Core` if a configured manifest is invalid.
    pub async fn open(config: VigilConfig, project_root: &Path) -> Result<Self, EngineError> {
        let store_path = if config.store.path == ":memory:" {
            config.store.path.clone()
        } else {
            project_root
                .join(&config.store.path)
                .to_string_lossy()
                .into_owned()
        };
        let store = LibSqlStore::open_local(&store_path).await?;

        let manifest = if config.checks.has_manifest() {
            SchemaManifest::load(&project_root.join(&config.checks.manifest_path))?
        } else {
            SchemaManifest::default()
        };

        tracing::debug!(store = %store_path, models = manifest.models.len(), "maintenance service ready");
        Ok(Self::new(Arc::new(store), config, project_root).with_manifest(manifest))
    }

    /// Replace the expected-schema manifest.
    #[must_use]
    pub fn with_manifest(mut self, manifest: SchemaManifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Replace the operation logger (e.g., `OperationLogger::disabled()` in tests).
    #[must_use]
    pub fn with_logger(mut self, logger: OperationLogger) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn repo(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    #[must_use]
    pub const fn logger(&self) -> &OperationLogger {
        &self.logger
    }

    #[must_use]
    pub const fn config(&self) -> &VigilConfig {
        &self.config
    }

    #[must_use]
    pub const fn manifest(&self) -> &SchemaManifest {
        &self.manifest
    }

    /// Resolve a configured path against the project root.
    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.project_root.join(path)
    }

    /// Record a maintenance step under the configured actor. Never fails.
    pub(crate) fn record(&self, operation: &str, model: &str, details: serde_json::Value) -> bool {
        self.logger
            .log_operation(operation, model, &self.config.repair.actor_id, details)
    }
}

/// Run `fut` under a deadline, mapping expiry to `EngineError::TimedOut`.
pub(crate) async fn within<T, E, F>(
    operation: impl Into<String>,
    limit: Duration,
    fut: F,
) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<EngineError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(EngineError::TimedOut {
            operation: operation.into(),
            limit_ms: millis(limit),
        }),
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    millis(start.elapsed())
}

pub(crate) fn next_seq(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed)
}
