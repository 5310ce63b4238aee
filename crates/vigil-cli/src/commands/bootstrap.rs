use std::path::Path;

use anyhow::Context;
use serde_json::json;
use vigil_config::VigilConfig;
use vigil_db::LibSqlStore;

use crate::bootstrap::PROJECT_DIR;
use crate::cli::GlobalFlags;
use crate::commands::Outcome;
use crate::output::output;

/// Handle `vgl bootstrap`: create `.vigil/` and the reference schema.
pub async fn handle(
    config: &VigilConfig,
    project_root: &Path,
    flags: &GlobalFlags,
) -> anyhow::Result<Outcome> {
    let vigil_dir = project_root.join(PROJECT_DIR);
    std::fs::create_dir_all(&vigil_dir)
        .with_context(|| format!("failed to create {}", vigil_dir.display()))?;

    let store_path = project_root.join(&config.store.path);
    if let Some(parent) = store_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let store_path = store_path.to_string_lossy().into_owned();
    let store = LibSqlStore::open_local(&store_path)
        .await
        .with_context(|| format!("failed to open store {store_path}"))?;
    store
        .apply_reference_schema()
        .await
        .context("failed to apply the reference schema")?;

    tracing::info!(store = %store_path, "reference schema applied");
    output(
        &json!({ "status": "success", "store": store_path }),
        flags.format,
    )?;
    Ok(Outcome::Passed)
}
