//! Integrity repairer.
//!
//! A repair pass acts only on the issues detected immediately before it:
//!
//! ```text
//! try_lock ─> integrity pass ─> snapshot ─> delete_orphans
//!                                        ─> backfill_invalid
//!                                        ─> restore_relationships
//!                                        ─> deduplicate
//! ```
//!
//! Each mutation step runs in its own unit of work under the step timeout and
//! is committed before the next begins. A failed or timed-out step is rolled
//! back, the remaining steps are skipped, and earlier commits stand.
//! Operation-log entries for a step are written only once it commits.

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use serde_json::{Value, json};
use vigil_core::enums::{RepairStatus, RepairStep, StepStatus};
use vigil_core::ids::{placeholder_email, placeholder_name};
use vigil_core::models::{Model, account_dependents, fields};
use vigil_core::reports::{RepairChanges, RepairReport, StepReport};
use vigil_db::{Predicate, Row};

use crate::error::EngineError;
use crate::integrity::IntegrityFindings;
use crate::service::{MaintenanceService, elapsed_ms, within};

/// Per-pass overrides of the configured repair policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairOptions {
    /// Refuse to mutate anything unless the snapshot was written.
    pub strict_safety: bool,
}

/// An operation-log entry held back until its step commits.
struct PendingLog {
    operation: &'static str,
    model: &'static str,
    details: Value,
}

#[derive(Default)]
struct StepOutcome {
    changes: RepairChanges,
    logs: Vec<PendingLog>,
}

impl StepOutcome {
    fn log(&mut self, operation: &'static str, model: Model, details: Value) {
        self.logs.push(PendingLog {
            operation,
            model: model.as_str(),
            details,
        });
    }
}

impl MaintenanceService {
    /// Repair under the configured safety policy.
    pub async fn repair_integrity(&self) -> RepairReport {
        let options = RepairOptions {
            strict_safety: self.config().repair.strict_safety,
        };
        self.repair_integrity_with(options).await
    }

    /// Repair with explicit options. Only one pass runs at a time; a
    /// concurrent call is rejected with status `error`.
    pub async fn repair_integrity_with(&self, options: RepairOptions) -> RepairReport {
        let start = Instant::now();
        let Ok(_guard) = self.repair_gate.try_lock() else {
            tracing::warn!("repair rejected: another pass holds the lock");
            return self.reject(&EngineError::RepairInProgress, start);
        };

        let findings = match self.find_integrity_issues().await {
            Ok(findings) => findings,
            Err(e) => {
                tracing::warn!(error = %e, "pre-repair integrity pass failed");
                return self.reject(&e, start);
            }
        };

        let snapshot = match self.write_snapshot(&findings).await {
            Ok(path) => Some(path.display().to_string()),
            Err(e) if options.strict_safety => {
                return self.reject(&EngineError::SnapshotRequired(e.to_string()), start);
            }
            Err(e) => {
                tracing::warn!(error = %e, "continuing repair without snapshot");
                None
            }
        };

        let mut steps = Vec::with_capacity(RepairStep::ALL.len());
        let mut changes = RepairChanges::default();
        let mut failure: Option<String> = None;

        for step in RepairStep::ALL {
            if failure.is_some() {
                steps.push(StepReport::skipped(step));
                continue;
            }
            let step_start = Instant::now();
            match self.run_step(step, &findings).await {
                Ok(outcome) => {
                    for entry in outcome.logs {
                        self.record(entry.operation, entry.model, entry.details);
                    }
                    changes += outcome.changes;
                    steps.push(StepReport {
                        step,
                        status: StepStatus::Completed,
                        affected: outcome.changes.total(),
                        duration_ms: elapsed_ms(step_start),
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(%step, error = %e, "repair step failed and was rolled back");
                    self.record(
                        "repair_step_failed",
                        "*",
                        json!({ "step": step, "error": e.to_string() }),
                    );
                    failure = Some(format!("{step}: {e}"));
                    steps.push(StepReport {
                        step,
                        status: StepStatus::Failed,
                        affected: 0,
                        duration_ms: elapsed_ms(step_start),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let completed = steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let report = RepairReport {
            status: RepairStatus::from_completed(completed, RepairStep::ALL.len()),
            timestamp: Utc::now(),
            snapshot,
            steps,
            changes,
            duration_ms: elapsed_ms(start),
            error: failure,
        };
        self.record_repair(&report);
        report
    }

    fn reject(&self, error: &EngineError, start: Instant) -> RepairReport {
        let report = RepairReport::rejected(error.to_string(), elapsed_ms(start));
        self.record_repair(&report);
        report
    }

    fn record_repair(&self, report: &RepairReport) {
        self.record(
            "repair",
            "*",
            json!({
                "status": report.status,
                "snapshot": report.snapshot,
                "affected": report.total_affected(),
                "duration_ms": report.duration_ms,
                "error": report.error,
            }),
        );
    }

    /// Run one step in its own unit of work.
    async fn run_step(
        &self,
        step: RepairStep,
        findings: &IntegrityFindings,
    ) -> Result<StepOutcome, EngineError> {
        self.repo().begin().await?;

        let body = async {
            match step {
                RepairStep::DeleteOrphans => self.delete_orphans(findings).await,
                RepairStep::BackfillInvalid => self.backfill_invalid(findings).await,
                RepairStep::RestoreRelationships => self.restore_relationships(findings).await,
                RepairStep::Deduplicate => self.deduplicate(findings).await,
            }
        };
        let limit = self.config().repair.step_timeout();
        let result = within(format!("repair step {step}"), limit, body).await;

        match result {
            Ok(outcome) => match self.repo().commit().await {
                Ok(()) => Ok(outcome),
                Err(e) => {
                    self.rollback_step(step).await;
                    Err(e.into())
                }
            },
            Err(e) => {
                self.rollback_step(step).await;
                Err(e)
            }
        }
    }

    async fn rollback_step(&self, step: RepairStep) {
        if let Err(e) = self.repo().rollback().await {
            tracing::error!(%step, error = %e, "rollback failed");
        }
    }

    async fn delete_orphans(&self, findings: &IntegrityFindings) -> Result<StepOutcome, EngineError> {
        let mut outcome = StepOutcome::default();
        for set in findings.orphans.iter().filter(|s| !s.ids.is_empty()) {
            let deleted = self
                .repo()
                .delete(
                    set.model.as_str(),
                    &Predicate::in_ids(fields::ID, set.ids.iter().cloned()),
                )
                .await?;
            match set.model {
                Model::Profiles => outcome.changes.orphaned_profiles_deleted += deleted,
                Model::AssessmentResults => {
                    outcome.changes.orphaned_assessment_results_deleted += deleted;
                }
                Model::AccountLinks => outcome.changes.orphaned_account_links_deleted += deleted,
                _ => {}
            }
            outcome.log(
                "delete_many",
                set.model,
                json!({ "step": RepairStep::DeleteOrphans, "count": deleted, "ids": set.ids }),
            );
        }
        Ok(outcome)
    }

    async fn backfill_invalid(&self, findings: &IntegrityFindings) -> Result<StepOutcome, EngineError> {
        let domain = &self.config().repair.placeholder_domain;
        let mut outcome = StepOutcome::default();
        for account in &findings.invalid_accounts {
            let mut emails = 0;
            let mut names = 0;
            if account.email_blank {
                emails = self
                    .backfill_field(&account.id, fields::EMAIL, placeholder_email(&account.id, domain))
                    .await?;
            }
            if account.name_blank {
                names = self
                    .backfill_field(&account.id, fields::NAME, placeholder_name(&account.id))
                    .await?;
            }
            outcome.changes.emails_backfilled += emails;
            outcome.changes.names_backfilled += names;
            if emails + names > 0 {
                outcome.log(
                    "backfill",
                    Model::Users,
                    json!({ "id": account.id, "email": emails > 0, "name": names > 0 }),
                );
            }
        }
        Ok(outcome)
    }

    /// Set `field` on account `id` only while it is still blank.
    async fn backfill_field(&self, id: &str, field: &str, value: String) -> Result<u64, EngineError> {
        let filter = Predicate::And(vec![Predicate::eq(fields::ID, id), Predicate::blank(field)]);
        let mut changes = Row::new();
        changes.insert(field.to_string(), Value::String(value));
        Ok(self
            .repo()
            .update(Model::Users.as_str(), &filter, &changes)
            .await?)
    }

    async fn restore_relationships(
        &self,
        findings: &IntegrityFindings,
    ) -> Result<StepOutcome, EngineError> {
        let mut outcome = StepOutcome::default();
        for edge in &findings.missing_edges {
            let relation = edge.relation.as_str();
            let existing = Predicate::And(vec![
                Predicate::eq(fields::ACCOUNT_ID, edge.account_id.as_str()),
                Predicate::eq(fields::LINKED_ID, edge.linked_id.as_str()),
                Predicate::eq(fields::RELATION, relation),
            ]);
            if self
                .repo()
                .count(Model::AccountLinks.as_str(), &existing)
                .await?
                > 0
            {
                continue;
            }

            let mut row = Row::new();
            row.insert(fields::ID.into(), Value::String(edge.row_id()));
            row.insert(fields::ACCOUNT_ID.into(), Value::String(edge.account_id.clone()));
            row.insert(fields::LINKED_ID.into(), Value::String(edge.linked_id.clone()));
            row.insert(fields::RELATION.into(), Value::String(relation.to_string()));
            self.repo().insert(Model::AccountLinks.as_str(), row).await?;

            outcome.changes.relationships_restored += 1;
            outcome.log(
                "restore_edge",
                Model::AccountLinks,
                json!({
                    "account_id": edge.account_id,
                    "linked_id": edge.linked_id,
                    "relation": edge.relation,
                }),
            );
        }
        Ok(outcome)
    }

    /// Keep one account per detected duplicate email and remove the rest
    /// together with their profiles, results and links.
    ///
    /// Groups are re-read inside the step so the keep decision sees
    /// post-backfill emails, but only emails detected before the pass are
    /// considered.
    async fn deduplicate(&self, findings: &IntegrityFindings) -> Result<StepOutcome, EngineError> {
        let mut outcome = StepOutcome::default();
        let detected: HashSet<String> = findings
            .duplicate_groups
            .iter()
            .map(|g| g.email.clone())
            .collect();
        if detected.is_empty() {
            return Ok(outcome);
        }

        let groups = self.find_duplicate_groups(Some(&detected)).await?;
        let remove: Vec<String> = groups.iter().flat_map(|g| g.remove.iter().cloned()).collect();
        if remove.is_empty() {
            return Ok(outcome);
        }

        for (model, field) in account_dependents() {
            let deleted = self
                .repo()
                .delete(model.as_str(), &Predicate::in_ids(field, remove.iter().cloned()))
                .await?;
            if deleted > 0 {
                outcome.changes.dependent_rows_removed += deleted;
                outcome.log(
                    "delete_many",
                    model,
                    json!({ "step": RepairStep::Deduplicate, "field": field, "count": deleted }),
                );
            }
        }

        let deleted = self
            .repo()
            .delete(
                Model::Users.as_str(),
                &Predicate::in_ids(fields::ID, remove.iter().cloned()),
            )
            .await?;
        outcome.changes.duplicate_accounts_removed += deleted;
        outcome.log(
            "delete_many",
            Model::Users,
            json!({
                "step": RepairStep::Deduplicate,
                "count": deleted,
                "kept": groups.iter().map(|g| g.keep.as_str()).collect::<Vec<_>>(),
                "removed": remove,
            }),
        );
        Ok(outcome)
    }
}
