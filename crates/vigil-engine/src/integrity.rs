//! Integrity checker.
//!
//! Four independent read-only sub-checks run concurrently and are joined
//! before anything is reported:
//!
//! ```text
//! orphans      owned rows whose parent reference does not resolve
//! validity     accounts with an empty email or an empty name
//! symmetry     parent/child links missing their reciprocal edge
//! duplicates   email groups shared by more than one account
//! ```
//!
//! The full findings (every identifier, not just samples) feed the repairer;
//! the report keeps counts and bounded samples.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use vigil_core::ids::{compare_ids, id_of, is_blank, parse_timestamp, trim_blank};
use vigil_core::models::{LinkRelation, Model, OWNERSHIP_RULES, OwnershipRule, fields};
use vigil_core::reports::{IntegrityIssues, IntegrityReport, SubCheck};
use vigil_db::{Predicate, Row};

use crate::error::EngineError;
use crate::service::{MaintenanceService, elapsed_ms, within};

/// Owned rows of one model whose parent reference does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanSet {
    pub model: Model,
    pub ids: Vec<String>,
}

/// An account with a blank required field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidAccount {
    pub id: String,
    pub email_blank: bool,
    pub name_blank: bool,
}

/// The reciprocal edge a declared link is missing.
///
/// `(account_id, linked_id, relation)` is the row that must be added.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MissingEdge {
    pub account_id: String,
    pub linked_id: String,
    pub relation: LinkRelation,
}

impl MissingEdge {
    /// Deterministic identifier for the restored row.
    #[must_use]
    pub fn row_id(&self) -> String {
        format!(
            "lnk-{}-{}-{}",
            self.account_id, self.linked_id, self.relation
        )
    }
}

/// Accounts sharing one email, in keep order: `keep` survives deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub email: String,
    pub keep: String,
    pub remove: Vec<String>,
}

/// Everything one integrity pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityFindings {
    /// One entry per ownership rule, in repair order.
    pub orphans: Vec<OrphanSet>,
    pub invalid_accounts: Vec<InvalidAccount>,
    pub missing_edges: Vec<MissingEdge>,
    pub duplicate_groups: Vec<DuplicateGroup>,
}

impl IntegrityFindings {
    #[must_use]
    pub fn orphans_of(&self, model: Model) -> &[String] {
        self.orphans
            .iter()
            .find(|o| o.model == model)
            .map_or(&[], |o| o.ids.as_slice())
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.orphans.iter().all(|o| o.ids.is_empty())
            && self.invalid_accounts.is_empty()
            && self.missing_edges.is_empty()
            && self.duplicate_groups.is_empty()
    }

    /// Fold into report counts with at most `limit` samples per sub-check.
    #[must_use]
    pub fn to_issues(&self, limit: usize) -> IntegrityIssues {
        let orphans = |model| {
            let ids = self.orphans_of(model);
            SubCheck::from_items(ids.len() as u64, ids.iter().cloned(), limit)
        };
        IntegrityIssues {
            orphaned_profiles: orphans(Model::Profiles),
            orphaned_assessment_results: orphans(Model::AssessmentResults),
            orphaned_account_links: orphans(Model::AccountLinks),
            invalid_accounts: SubCheck::from_items(
                self.invalid_accounts.len() as u64,
                self.invalid_accounts.iter().map(|a| a.id.clone()),
                limit,
            ),
            asymmetric_relationships: SubCheck::from_items(
                self.missing_edges.len() as u64,
                self.missing_edges
                    .iter()
                    .map(|e| format!("{}->{}", e.linked_id, e.account_id)),
                limit,
            ),
            duplicate_emails: SubCheck::from_items(
                self.duplicate_groups.len() as u64,
                self.duplicate_groups.iter().map(|g| g.email.clone()),
                limit,
            ),
        }
    }
}

impl MaintenanceService {
    /// Run every integrity sub-check and report counts and samples.
    ///
    /// A failing sub-check fails the whole pass: the report then carries
    /// status `error` and no issues block.
    pub async fn check_integrity(&self) -> IntegrityReport {
        let start = Instant::now();
        let report = match self.find_integrity_issues().await {
            Ok(findings) => IntegrityReport::from_issues(
                findings.to_issues(self.config().checks.sample_limit),
                elapsed_ms(start),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "integrity pass failed");
                IntegrityReport::failed(e.to_string(), elapsed_ms(start))
            }
        };

        self.record(
            "integrity_check",
            "*",
            json!({
                "status": report.status,
                "issues": report.issues.as_ref().map(IntegrityIssues::total),
                "duration_ms": report.duration_ms,
                "error": report.error,
            }),
        );
        report
    }

    /// Run the four sub-checks concurrently and return full findings.
    ///
    /// # Errors
    ///
    /// Returns the first sub-check error (store failure or timeout).
    pub async fn find_integrity_issues(&self) -> Result<IntegrityFindings, EngineError> {
        let limit = self.config().checks.timeout();
        let (orphans, invalid_accounts, missing_edges, duplicate_groups) = tokio::try_join!(
            within("orphan detection", limit, self.find_orphans()),
            within("validity detection", limit, self.find_invalid_accounts()),
            within("relationship symmetry", limit, self.find_missing_edges()),
            within("duplicate detection", limit, self.find_duplicate_groups(None)),
        )?;

        let findings = IntegrityFindings {
            orphans,
            invalid_accounts,
            missing_edges,
            duplicate_groups,
        };
        tracing::debug!(clean = findings.is_clean(), "integrity sub-checks joined");
        Ok(findings)
    }

    /// Orphaned rows for every ownership rule.
    pub(crate) async fn find_orphans(&self) -> Result<Vec<OrphanSet>, EngineError> {
        let mut parent_ids: HashMap<Model, HashSet<String>> = HashMap::new();
        let mut sets = Vec::with_capacity(OWNERSHIP_RULES.len());
        for rule in OWNERSHIP_RULES {
            for r in rule.refs {
                if !parent_ids.contains_key(&r.parent) {
                    let ids = self.live_ids(r.parent).await?;
                    parent_ids.insert(r.parent, ids);
                }
            }
            let rows = self.repo().query(rule.child.as_str(), &Predicate::All).await?;
            sets.push(OrphanSet {
                model: rule.child,
                ids: orphaned_rows(rule, &rows, &parent_ids),
            });
        }
        Ok(sets)
    }

    /// Accounts with an empty email or an empty name.
    pub(crate) async fn find_invalid_accounts(&self) -> Result<Vec<InvalidAccount>, EngineError> {
        let filter = Predicate::Or(vec![
            Predicate::blank(fields::EMAIL),
            Predicate::blank(fields::NAME),
        ]);
        let rows = self.repo().query(Model::Users.as_str(), &filter).await?;
        let mut invalid: Vec<InvalidAccount> = rows
            .iter()
            .filter_map(|row| {
                Some(InvalidAccount {
                    id: row_id(row)?,
                    email_blank: is_blank(row.get(fields::EMAIL)),
                    name_blank: is_blank(row.get(fields::NAME)),
                })
            })
            .collect();
        invalid.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(invalid)
    }

    /// Reciprocal edges missing between live accounts.
    pub(crate) async fn find_missing_edges(&self) -> Result<Vec<MissingEdge>, EngineError> {
        let accounts = self.live_ids(Model::Users).await?;
        let links = self
            .repo()
            .query(Model::AccountLinks.as_str(), &Predicate::All)
            .await?;

        let declared: HashSet<(String, String, LinkRelation)> =
            links.iter().filter_map(parse_link).collect();

        let missing: BTreeSet<MissingEdge> = declared
            .iter()
            .filter(|(a, b, _)| accounts.contains(a) && accounts.contains(b) && a != b)
            .filter(|(a, b, rel)| !declared.contains(&(b.clone(), a.clone(), rel.reciprocal())))
            .map(|(a, b, rel)| MissingEdge {
                account_id: b.clone(),
                linked_id: a.clone(),
                relation: rel.reciprocal(),
            })
            .collect();
        Ok(missing.into_iter().collect())
    }

    /// Email groups with more than one account.
    ///
    /// With `only`, groups are restricted to those emails.
    pub(crate) async fn find_duplicate_groups(
        &self,
        only: Option<&HashSet<String>>,
    ) -> Result<Vec<DuplicateGroup>, EngineError> {
        let rows = self
            .repo()
            .query(Model::Users.as_str(), &Predicate::All)
            .await?;

        let mut groups: BTreeMap<String, Vec<(Option<DateTime<Utc>>, String)>> = BTreeMap::new();
        for row in &rows {
            let Some(email) = row.get(fields::EMAIL).and_then(Value::as_str) else {
                continue;
            };
            let email = trim_blank(email);
            if email.is_empty() || only.is_some_and(|set| !set.contains(email)) {
                continue;
            }
            let Some(id) = row_id(row) else { continue };
            let created = row.get(fields::CREATED_AT).and_then(parse_timestamp);
            groups.entry(email.to_string()).or_default().push((created, id));
        }

        Ok(groups
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .filter_map(|(email, mut members)| {
                members.sort_by(keep_order);
                let mut ids = members.into_iter().map(|(_, id)| id);
                let keep = ids.next()?;
                Some(DuplicateGroup {
                    email,
                    keep,
                    remove: ids.collect(),
                })
            })
            .collect())
    }

    async fn live_ids(&self, model: Model) -> Result<HashSet<String>, EngineError> {
        let rows = self.repo().query(model.as_str(), &Predicate::All).await?;
        Ok(rows.iter().filter_map(row_id).collect())
    }
}

/// Earliest creation first (unknown last), then lowest identifier.
fn keep_order(
    a: &(Option<DateTime<Utc>>, String),
    b: &(Option<DateTime<Utc>>, String),
) -> Ordering {
    let by_created = match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_created.then_with(|| compare_ids(&a.1, &b.1))
}

fn row_id(row: &Row) -> Option<String> {
    row.get(fields::ID).and_then(id_of)
}

fn orphaned_rows(
    rule: &OwnershipRule,
    rows: &[Row],
    parent_ids: &HashMap<Model, HashSet<String>>,
) -> Vec<String> {
    let mut ids: Vec<String> = rows
        .iter()
        .filter(|row| {
            rule.refs.iter().any(|r| {
                let resolved = row
                    .get(r.field)
                    .and_then(id_of)
                    .is_some_and(|id| parent_ids.get(&r.parent).is_some_and(|set| set.contains(&id)));
                !resolved
            })
        })
        .filter_map(|row| {
            let id = row_id(row);
            if id.is_none() {
                tracing::debug!(model = %rule.child, "orphaned row without identifier");
            }
            id
        })
        .collect();
    ids.sort_by(|a, b| compare_ids(a, b));
    ids
}

fn parse_link(row: &Row) -> Option<(String, String, LinkRelation)> {
    let account = row.get(fields::ACCOUNT_ID).and_then(id_of)?;
    let linked = row.get(fields::LINKED_ID).and_then(id_of)?;
    let relation = row
        .get(fields::RELATION)
        .and_then(Value::as_str)
        .and_then(LinkRelation::parse)?;
    Some((account, linked, relation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(created: Option<&str>, id: &str) -> (Option<DateTime<Utc>>, String) {
        (
            created.and_then(|c| parse_timestamp(&Value::String(c.into()))),
            id.to_string(),
        )
    }

    #[test]
    fn keep_order_prefers_earliest_then_lowest_id() {
        let mut members = vec![
            entry(None, "1"),
            entry(Some("2026-01-02 00:00:00"), "5"),
            entry(Some("2026-01-01 00:00:00"), "9"),
            entry(Some("2026-01-01 00:00:00"), "10"),
        ];
        members.sort_by(keep_order);
        let ids: Vec<&str> = members.iter().map(|(_, id)| id.as_str()).collect();
        assert_eq!(ids, vec!["9", "10", "5", "1"]);
    }

    #[test]
    fn findings_fold_into_counts() {
        let findings = IntegrityFindings {
            orphans: vec![
                OrphanSet {
                    model: Model::Profiles,
                    ids: vec!["p1".into(), "p2".into()],
                },
                OrphanSet {
                    model: Model::AssessmentResults,
                    ids: vec![],
                },
            ],
            duplicate_groups: vec![DuplicateGroup {
                email: "a@x.com".into(),
                keep: "1".into(),
                remove: vec!["2".into(), "3".into()],
            }],
            ..IntegrityFindings::default()
        };
        let issues = findings.to_issues(1);
        assert_eq!(issues.orphaned_profiles.count, 2);
        assert_eq!(issues.orphaned_profiles.samples, vec!["p1".to_string()]);
        assert_eq!(issues.orphaned_account_links.count, 0);
        // One group, however many members it has.
        assert_eq!(issues.duplicate_emails.count, 1);
        assert!(!findings.is_clean());
    }

    #[test]
    fn restored_edge_ids_are_deterministic() {
        let edge = MissingEdge {
            account_id: "P".into(),
            linked_id: "S".into(),
            relation: LinkRelation::Child,
        };
        assert_eq!(edge.row_id(), "lnk-P-S-child");
        assert_eq!(edge.row_id(), edge.clone().row_id());
    }
}
