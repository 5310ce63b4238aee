//! In-process `Repository` binding.
//!
//! Holds models as vectors of JSON rows behind a mutex. Transactions snapshot
//! the whole table map on `begin` and restore it on `rollback`. The store also
//! carries fault injection (`set_available`, `fail_next`, `set_latency`) so the
//! engine's failure paths can be exercised without a real backend.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use vigil_core::manifest::SchemaManifest;
use vigil_core::models::fields;

use crate::error::DatabaseError;
use crate::predicate::{Predicate, Row};
use crate::repo::{FieldDescriptor, ModelDescriptor, Repository};

/// Repository operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Probe,
    Introspect,
    Count,
    Query,
    Insert,
    Update,
    Delete,
    Begin,
    Commit,
}

impl StoreOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Introspect => "introspect",
            Self::Count => "count",
            Self::Query => "query",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Begin => "begin",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
struct Table {
    fields: Vec<FieldDescriptor>,
    rows: Vec<Row>,
}

#[derive(Debug)]
struct Fault {
    op: StoreOp,
    /// `None` matches any model.
    model: Option<String>,
}

#[derive(Debug)]
struct State {
    tables: BTreeMap<String, Table>,
    snapshot: Option<BTreeMap<String, Table>>,
    available: bool,
    faults: Vec<Fault>,
    latency: Duration,
}

/// Mutex-guarded in-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store with no models.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                tables: BTreeMap::new(),
                snapshot: None,
                available: true,
                faults: Vec::new(),
                latency: Duration::ZERO,
            }),
        }
    }

    /// A store with every model of the reference manifest, all empty.
    #[must_use]
    pub fn with_reference_schema() -> Self {
        let store = Self::new();
        for model in SchemaManifest::default().models {
            let names: Vec<&str> = model.required_fields.iter().map(String::as_str).collect();
            store.create_model(&model.name, &names);
        }
        store
    }

    /// Create (or replace) a model with the given fields. `id` is marked required.
    pub fn create_model(&self, name: &str, field_names: &[&str]) {
        let fields = field_names
            .iter()
            .map(|f| FieldDescriptor {
                name: (*f).to_string(),
                required: *f == fields::ID,
            })
            .collect();
        self.lock().tables.insert(
            name.to_string(),
            Table {
                fields,
                rows: Vec::new(),
            },
        );
    }

    /// Drop a model entirely.
    pub fn drop_model(&self, name: &str) {
        self.lock().tables.remove(name);
    }

    /// Append rows to an existing model, creating it from the first row's
    /// keys if it does not exist. Non-object values are ignored.
    pub fn seed<I>(&self, model: &str, rows: I)
    where
        I: IntoIterator<Item = Value>,
    {
        let mut state = self.lock();
        for value in rows {
            let Value::Object(row) = value else { continue };
            let table = state.tables.entry(model.to_string()).or_insert_with(|| Table {
                fields: row
                    .keys()
                    .map(|k| FieldDescriptor {
                        name: k.clone(),
                        required: k == fields::ID,
                    })
                    .collect(),
                rows: Vec::new(),
            });
            table.rows.push(row);
        }
    }

    /// Current rows of a model (empty if absent).
    #[must_use]
    pub fn rows(&self, model: &str) -> Vec<Row> {
        self.lock()
            .tables
            .get(model)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent operation fail with `Unavailable` (or recover).
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Fail the next `op` against `model` (or against any model for probe,
    /// introspect and transaction control) with a query error.
    pub fn fail_next(&self, op: StoreOp, model: Option<&str>) {
        self.lock().faults.push(Fault {
            op,
            model: model.map(str::to_string),
        });
    }

    /// Delay every operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Whether a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.lock().snapshot.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-operation; the data is still usable.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Apply latency, availability and one-shot faults for an operation.
    async fn enter(&self, op: StoreOp, model: Option<&str>) -> Result<(), DatabaseError> {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        if !state.available {
            return Err(DatabaseError::Unavailable(format!(
                "in-memory store is offline ({op})"
            )));
        }
        let hit = state.faults.iter().position(|f| {
            f.op == op && (f.model.is_none() || f.model.as_deref() == model)
        });
        if let Some(idx) = hit {
            state.faults.remove(idx);
            return Err(DatabaseError::Query(format!(
                "injected {op} failure on {}",
                model.unwrap_or("store")
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn probe(&self) -> Result<(), DatabaseError> {
        self.enter(StoreOp::Probe, None).await
    }

    async fn introspect(&self) -> Result<Vec<ModelDescriptor>, DatabaseError> {
        self.enter(StoreOp::Introspect, None).await?;
        Ok(self
            .lock()
            .tables
            .iter()
            .map(|(name, table)| ModelDescriptor {
                name: name.clone(),
                fields: table.fields.clone(),
            })
            .collect())
    }

    async fn count(&self, model: &str, filter: &Predicate) -> Result<u64, DatabaseError> {
        self.enter(StoreOp::Count, Some(model)).await?;
        let state = self.lock();
        let count = state
            .tables
            .get(model)
            .map_or(0, |t| t.rows.iter().filter(|r| filter.matches(r)).count());
        Ok(count as u64)
    }

    async fn query(&self, model: &str, filter: &Predicate) -> Result<Vec<Row>, DatabaseError> {
        self.enter(StoreOp::Query, Some(model)).await?;
        let state = self.lock();
        Ok(state
            .tables
            .get(model)
            .map(|t| t.rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, model: &str, row: Row) -> Result<(), DatabaseError> {
        self.enter(StoreOp::Insert, Some(model)).await?;
        let mut state = self.lock();
        let table = state
            .tables
            .get_mut(model)
            .ok_or_else(|| DatabaseError::Query(format!("no such model: {model}")))?;
        table.rows.push(row);
        Ok(())
    }

    async fn update(
        &self,
        model: &str,
        filter: &Predicate,
        changes: &Row,
    ) -> Result<u64, DatabaseError> {
        self.enter(StoreOp::Update, Some(model)).await?;
        let mut state = self.lock();
        let Some(table) = state.tables.get_mut(model) else {
            return Ok(0);
        };
        let mut affected = 0;
        for row in table.rows.iter_mut().filter(|r| filter.matches(r)) {
            for (key, value) in changes {
                row.insert(key.clone(), value.clone());
            }
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, model: &str, filter: &Predicate) -> Result<u64, DatabaseError> {
        self.enter(StoreOp::Delete, Some(model)).await?;
        let mut state = self.lock();
        let Some(table) = state.tables.get_mut(model) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|r| !filter.matches(r));
        Ok((before - table.rows.len()) as u64)
    }

    async fn begin(&self) -> Result<(), DatabaseError> {
        self.enter(StoreOp::Begin, None).await?;
        let mut state = self.lock();
        if state.snapshot.is_some() {
            return Err(DatabaseError::InvalidState(
                "transaction already open".into(),
            ));
        }
        state.snapshot = Some(state.tables.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        self.enter(StoreOp::Commit, None).await?;
        let mut state = self.lock();
        if state.snapshot.take().is_none() {
            return Err(DatabaseError::InvalidState("commit without begin".into()));
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        // Rollback bypasses fault injection so a failed step can always be undone.
        let mut state = self.lock();
        match state.snapshot.take() {
            Some(tables) => {
                state.tables = tables;
                Ok(())
            }
            None => Err(DatabaseError::InvalidState(
                "rollback without begin".into(),
            )),
        }
    }
}
