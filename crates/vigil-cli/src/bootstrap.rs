use std::path::{Path, PathBuf};

use anyhow::Context;
use vigil_config::VigilConfig;

use crate::cli::GlobalFlags;

/// Directory marking a Vigil project.
pub const PROJECT_DIR: &str = ".vigil";

/// Resolve the project root from `--project` or by walking up from the
/// current directory to the nearest `.vigil`. Falls back to the current
/// directory so a fresh project can be bootstrapped.
pub fn resolve_project_root(project_override: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(path) = project_override {
        let explicit = PathBuf::from(path);
        if explicit.file_name().is_some_and(|name| name == PROJECT_DIR) {
            return explicit
                .parent()
                .map(Path::to_path_buf)
                .context("invalid --project path: '.vigil' directory has no parent");
        }
        if explicit.is_dir() {
            return Ok(explicit);
        }
        anyhow::bail!(
            "invalid --project '{}': directory does not exist",
            explicit.display()
        );
    }

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    Ok(cwd
        .ancestors()
        .find(|dir| dir.join(PROJECT_DIR).is_dir())
        .map_or_else(|| cwd.clone(), Path::to_path_buf))
}

/// Load `.env`, then the layered configuration, then apply flag overrides.
pub fn load_config(project_root: &Path, flags: &GlobalFlags) -> anyhow::Result<VigilConfig> {
    let env_path = project_root.join(".env");
    if env_path.exists() {
        dotenvy::from_path(&env_path)
            .with_context(|| format!("failed to load dotenv file at {}", env_path.display()))?;
    }

    let mut config = VigilConfig::load_from(project_root)
        .with_context(|| format!("invalid configuration for {}", project_root.display()))?;
    if let Some(db) = &flags.db {
        config.store.path.clone_from(db);
        config.validate()?;
    }
    tracing::debug!(store = %config.store.path, root = %project_root.display(), "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_vigil_dir_resolves_to_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(PROJECT_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let root = resolve_project_root(dir.to_str()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn missing_explicit_project_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert!(resolve_project_root(missing.to_str()).is_err());
    }
}
