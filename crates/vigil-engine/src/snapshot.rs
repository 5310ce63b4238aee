//! Pre-repair snapshot.
//!
//! Before any mutation the repairer writes
//! `{snapshot_dir}/pre-repair-<UTC timestamp>-<seq>.json` holding the
//! findings and a full copy of every row the pass may delete or update.
//! The path is the snapshot reference carried by the repair report.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vigil_core::models::{Model, account_dependents, fields};
use vigil_db::{Predicate, Row};

use crate::error::EngineError;
use crate::integrity::IntegrityFindings;
use crate::service::{MaintenanceService, next_seq};

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    created_at: DateTime<Utc>,
    actor: &'a str,
    findings: &'a IntegrityFindings,
    /// Rows the pass may touch, keyed by model.
    rows: BTreeMap<&'static str, Vec<Row>>,
}

impl MaintenanceService {
    /// Export the rows a repair of `findings` would touch.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the rows cannot be read or the file cannot
    /// be written.
    pub(crate) async fn write_snapshot(
        &self,
        findings: &IntegrityFindings,
    ) -> Result<PathBuf, EngineError> {
        let rows = self.rows_at_risk(findings).await?;
        let created_at = Utc::now();
        let document = SnapshotDocument {
            created_at,
            actor: &self.config().repair.actor_id,
            findings,
            rows,
        };

        let dir = self.resolve(&self.config().repair.snapshot_dir);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!(
            "pre-repair-{}-{}.json",
            created_at.format("%Y%m%dT%H%M%SZ"),
            next_seq(&self.snapshot_seq)
        ));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&document)?).await?;

        tracing::info!(path = %path.display(), "pre-repair snapshot written");
        Ok(path)
    }

    async fn rows_at_risk(
        &self,
        findings: &IntegrityFindings,
    ) -> Result<BTreeMap<&'static str, Vec<Row>>, EngineError> {
        let mut rows: BTreeMap<&'static str, Vec<Row>> = BTreeMap::new();

        for set in findings.orphans.iter().filter(|s| !s.ids.is_empty()) {
            let found = self
                .repo()
                .query(set.model.as_str(), &Predicate::in_ids(fields::ID, set.ids.iter().cloned()))
                .await?;
            rows.entry(set.model.as_str()).or_default().extend(found);
        }

        let mut account_ids: Vec<String> =
            findings.invalid_accounts.iter().map(|a| a.id.clone()).collect();
        let removed: Vec<String> = findings
            .duplicate_groups
            .iter()
            .flat_map(|g| g.remove.iter().cloned())
            .collect();
        account_ids.extend(removed.iter().cloned());
        if !account_ids.is_empty() {
            let found = self
                .repo()
                .query(Model::Users.as_str(), &Predicate::in_ids(fields::ID, account_ids))
                .await?;
            rows.entry(Model::Users.as_str()).or_default().extend(found);
        }

        if !removed.is_empty() {
            for (model, field) in account_dependents() {
                let found = self
                    .repo()
                    .query(model.as_str(), &Predicate::in_ids(field, removed.iter().cloned()))
                    .await?;
                rows.entry(model.as_str()).or_default().extend(found);
            }
        }

        Ok(rows)
    }
}
