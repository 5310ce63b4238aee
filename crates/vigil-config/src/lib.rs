//! # vigil-config
//!
//! Layered configuration loading for Vigil using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`VIGIL_*` prefix, `__` as separator)
//! 2. Project-level `.vigil/config.toml`
//! 3. User-level `~/.config/vigil/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `VIGIL_REPAIR__AUTO_REPAIR` -> `repair.auto_repair`,
//! `VIGIL_CHECKS__TIMEOUT_SECS` -> `checks.timeout_secs`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use vigil_config::VigilConfig;
//!
//! let config = VigilConfig::load_with_dotenv().expect("config");
//! println!("store: {}", config.store.path);
//! ```

mod checks;
mod error;
mod logging;
mod repair;
mod store;

pub use checks::ChecksConfig;
pub use error::ConfigError;
pub use logging::LoggingConfig;
pub use repair::RepairConfig;
pub use store::StoreConfig;

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub repair: RepairConfig,
}

impl VigilConfig {
    /// Load configuration from all sources, resolving the project file
    /// against the current directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration for the project rooted at `project_root`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load_from(project_root: &Path) -> Result<Self, ConfigError> {
        let config: Self = Self::figment_for(project_root).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain for the current directory.
    #[must_use]
    pub fn figment() -> Figment {
        Self::figment_for(Path::new("."))
    }

    /// Build the figment provider chain for a project root.
    ///
    /// Public so tests can inspect the figment or layer extra providers.
    #[must_use]
    pub fn figment_for(project_root: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = project_root.join(".vigil").join("config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("VIGIL_").split("__"))
    }

    /// Reject values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::invalid("store.path", "must not be empty"));
        }
        if self.checks.timeout_secs == 0 {
            return Err(ConfigError::invalid("checks.timeout_secs", "must be positive"));
        }
        if self.repair.step_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "repair.step_timeout_secs",
                "must be positive",
            ));
        }
        if self.logging.retention_days == 0 || self.logging.audit_retention_days == 0 {
            return Err(ConfigError::invalid(
                "logging.retention_days",
                "retention must be at least one day",
            ));
        }
        let domain = &self.repair.placeholder_domain;
        if domain.is_empty() || domain.contains('@') || domain.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid(
                "repair.placeholder_domain",
                format!("'{domain}' is not a bare domain"),
            ));
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vigil").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = VigilConfig::default();
        config.validate().unwrap();
        assert_eq!(config.store.path, ".vigil/app.db");
        assert_eq!(config.logging.log_dir, ".vigil/logs");
        assert_eq!(config.checks.sample_limit, 10);
        assert!(!config.checks.has_manifest());
    }

    #[test]
    fn rejects_placeholder_domain_with_at_sign() {
        let mut config = VigilConfig::default();
        config.repair.placeholder_domain = "x@y.invalid".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("repair.placeholder_domain"));
    }

    #[test]
    fn rejects_zero_timeouts() {
        let mut config = VigilConfig::default();
        config.checks.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = VigilConfig::default();
        config.repair.step_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
