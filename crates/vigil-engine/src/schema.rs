//! Schema validator: diff the live model inventory against a manifest.
//!
//! Missing models are `error`; extra models or missing required fields on
//! present models are `warning`. Diagnostic only.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use serde_json::json;
use vigil_core::enums::SchemaStatus;
use vigil_core::manifest::SchemaManifest;
use vigil_core::reports::{ModelFieldGap, SchemaReport};
use vigil_db::ModelDescriptor;

use crate::service::{MaintenanceService, within};

impl MaintenanceService {
    /// Validate against the service's configured manifest.
    pub async fn validate_configured_schema(&self) -> SchemaReport {
        self.validate_schema(self.manifest()).await
    }

    /// Introspect the store and diff it against `manifest`.
    pub async fn validate_schema(&self, manifest: &SchemaManifest) -> SchemaReport {
        let limit = self.config().checks.timeout();
        let report = match within("schema introspection", limit, self.repo().introspect()).await {
            Ok(live) => diff(manifest, &live),
            Err(e) => {
                tracing::warn!(error = %e, "schema introspection failed");
                SchemaReport::failed(e.to_string())
            }
        };

        self.record(
            "schema_validation",
            "*",
            json!({
                "status": report.status,
                "missing_models": report.missing_models,
                "extra_models": report.extra_models,
                "error": report.error,
            }),
        );
        report
    }
}

fn diff(manifest: &SchemaManifest, live: &[ModelDescriptor]) -> SchemaReport {
    let by_name: HashMap<&str, &ModelDescriptor> =
        live.iter().map(|m| (m.name.as_str(), m)).collect();

    let mut missing_models = Vec::new();
    let mut missing_fields = Vec::new();
    for expected in &manifest.models {
        let Some(model) = by_name.get(expected.name.as_str()) else {
            missing_models.push(expected.name.clone());
            continue;
        };
        let absent: Vec<String> = expected
            .required_fields
            .iter()
            .filter(|f| !model.has_field(f))
            .cloned()
            .collect();
        if !absent.is_empty() {
            missing_fields.push(ModelFieldGap {
                model: expected.name.clone(),
                missing_fields: absent,
            });
        }
    }

    let expected: BTreeSet<&str> = manifest.model_names().collect();
    let extra_models: Vec<String> = live
        .iter()
        .map(|m| m.name.as_str())
        .filter(|name| !expected.contains(name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let status = if !missing_models.is_empty() {
        SchemaStatus::Error
    } else if !extra_models.is_empty() || !missing_fields.is_empty() {
        SchemaStatus::Warning
    } else {
        SchemaStatus::Valid
    };

    SchemaReport {
        status,
        timestamp: Utc::now(),
        expected_models: manifest.models.len(),
        live_models: live.len(),
        missing_models,
        extra_models,
        missing_fields,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vigil_db::FieldDescriptor;

    fn model(name: &str, fields: &[&str]) -> ModelDescriptor {
        ModelDescriptor {
            name: name.into(),
            fields: fields
                .iter()
                .map(|f| FieldDescriptor {
                    name: (*f).into(),
                    required: *f == "id",
                })
                .collect(),
        }
    }

    fn manifest() -> SchemaManifest {
        SchemaManifest::from_toml_str(
            r#"
[[models]]
name = "users"
required_fields = ["id", "email", "name"]

[[models]]
name = "profiles"
required_fields = ["id", "user_id"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn exact_match_is_valid() {
        let live = [
            model("users", &["id", "email", "name", "role"]),
            model("profiles", &["id", "user_id"]),
        ];
        let report = diff(&manifest(), &live);
        assert_eq!(report.status, SchemaStatus::Valid);
        assert_eq!(report.live_models, 2);
    }

    #[test]
    fn missing_model_is_error_even_with_field_gaps() {
        let live = [model("users", &["id", "email"])];
        let report = diff(&manifest(), &live);
        assert_eq!(report.status, SchemaStatus::Error);
        assert_eq!(report.missing_models, vec!["profiles".to_string()]);
        assert_eq!(
            report.missing_fields,
            vec![ModelFieldGap {
                model: "users".into(),
                missing_fields: vec!["name".into()],
            }]
        );
    }

    #[test]
    fn extra_models_and_field_gaps_are_warnings() {
        let live = [
            model("users", &["id", "email", "name"]),
            model("profiles", &["id"]),
            model("legacy_sessions", &["id"]),
        ];
        let report = diff(&manifest(), &live);
        assert_eq!(report.status, SchemaStatus::Warning);
        assert_eq!(report.extra_models, vec!["legacy_sessions".to_string()]);
        assert_eq!(report.missing_fields[0].missing_fields, vec!["user_id".to_string()]);
    }
}
