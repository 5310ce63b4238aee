//! Expected-schema manifest.
//!
//! An ordered list of models the application depends on, each with the
//! minimal set of fields it must carry. The schema validator diffs the live
//! store against this list.
//!
//! Manifests can be loaded from TOML:
//!
//! ```toml
//! [[models]]
//! name = "users"
//! required_fields = ["id", "email", "name", "role"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::Model;

/// One expected model and its required fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ManifestModel {
    pub name: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

impl ManifestModel {
    fn new(model: Model, fields: &[&str]) -> Self {
        Self {
            name: model.as_str().to_string(),
            required_fields: fields.iter().map(|f| (*f).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SchemaManifest {
    pub models: Vec<ManifestModel>,
}

impl Default for SchemaManifest {
    /// The reference manifest of the educational data store.
    fn default() -> Self {
        Self {
            models: vec![
                ManifestModel::new(Model::Users, &["id", "email", "name", "role", "created_at"]),
                ManifestModel::new(Model::Profiles, &["id", "user_id"]),
                ManifestModel::new(Model::Assessments, &["id", "title"]),
                ManifestModel::new(
                    Model::AssessmentResults,
                    &["id", "assessment_id", "student_id"],
                ),
                ManifestModel::new(
                    Model::AccountLinks,
                    &["id", "account_id", "linked_id", "relation"],
                ),
                ManifestModel::new(Model::Resources, &["id"]),
                ManifestModel::new(Model::CurriculumPlans, &["id"]),
                ManifestModel::new(Model::SemhAssessments, &["id"]),
                ManifestModel::new(Model::BiofeedbackSessions, &["id"]),
                ManifestModel::new(Model::EmotionalPatterns, &["id"]),
            ],
        }
    }
}

impl SchemaManifest {
    /// Parse a manifest from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidManifest` if the TOML is malformed, a model
    /// name is empty, or a model is listed twice.
    pub fn from_toml_str(s: &str) -> Result<Self, CoreError> {
        let manifest: Self =
            toml::from_str(s).map_err(|e| CoreError::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidManifest` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::InvalidManifest(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Names of all expected models, in manifest order.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    fn validate(&self) -> Result<(), CoreError> {
        let mut seen = HashSet::new();
        for model in &self.models {
            if model.name.trim().is_empty() {
                return Err(CoreError::InvalidManifest("empty model name".into()));
            }
            if !seen.insert(model.name.as_str()) {
                return Err(CoreError::InvalidManifest(format!(
                    "model '{}' listed more than once",
                    model.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_manifest_lists_every_model() {
        let manifest = SchemaManifest::default();
        let names: Vec<&str> = manifest.model_names().collect();
        let expected: Vec<&str> = Model::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn parses_toml_manifest() {
        let manifest = SchemaManifest::from_toml_str(
            r#"
[[models]]
name = "users"
required_fields = ["id", "email"]

[[models]]
name = "profiles"
"#,
        )
        .unwrap();
        assert_eq!(manifest.models.len(), 2);
        assert_eq!(manifest.models[0].required_fields, vec!["id", "email"]);
        assert!(manifest.models[1].required_fields.is_empty());
    }

    #[test]
    fn rejects_duplicate_models() {
        let err = SchemaManifest::from_toml_str(
            r#"
[[models]]
name = "users"
[[models]]
name = "users"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(SchemaManifest::from_toml_str("models = 3").is_err());
    }
}
