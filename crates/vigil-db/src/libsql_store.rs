//! libSQL `Repository` binding.
//!
//! Predicates compile to parameterised `WHERE` clauses with `?N`
//! placeholders. Model and field names are validated as plain identifiers
//! and double-quoted before they are interpolated. Introspection reads
//! `sqlite_master` and `PRAGMA table_info`.
//!
//! Local statements do their work inside `poll`, so every statement runs on
//! the blocking pool. Callers awaiting a store future under
//! `tokio::time::timeout` therefore see the deadline; a statement whose future
//! is dropped keeps running to completion on its own thread.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use libsql::Builder;
use serde_json::Value;
use vigil_core::ids::BLANK_CHARS;

use crate::error::DatabaseError;
use crate::predicate::{Predicate, Row, validate_identifier};
use crate::repo::{FieldDescriptor, ModelDescriptor, Optimizer, Repository};

/// Store handle wrapping a libSQL database and one connection.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    in_transaction: AtomicBool,
}

impl LibSqlStore {
    /// Open a local database file (or `:memory:`).
    ///
    /// The parent directory is created if needed. Migrations are not run.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Unavailable` if the database cannot be opened.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Unavailable(format!("{path}: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Unavailable(format!("{path}: {e}")))?;

        tracing::debug!(path, "opened libSQL store");
        Ok(Self {
            db,
            conn,
            in_transaction: AtomicBool::new(false),
        })
    }

    /// Access the underlying libSQL connection for direct statements.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Run `work` against a clone of the connection on the blocking pool.
    async fn offload<T, F, Fut>(&self, work: F) -> Result<T, DatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(libsql::Connection) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, DatabaseError>>,
    {
        let conn = self.conn.clone();
        let handle = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || handle.block_on(work(conn)))
            .await
            .map_err(|e| DatabaseError::Other(anyhow::anyhow!("libSQL worker failed: {e}")))?
    }

    async fn fetch(&self, sql: String, params: Vec<libsql::Value>) -> Result<Vec<Row>, DatabaseError> {
        self.offload(move |conn| fetch_rows(conn, sql, params)).await
    }

    async fn run(&self, sql: String, params: Vec<libsql::Value>) -> Result<u64, DatabaseError> {
        self.offload(move |conn| async move {
            let affected = conn.execute(&sql, libsql::params_from_iter(params)).await?;
            Ok::<_, DatabaseError>(affected)
        })
        .await
    }

    async fn table_exists(&self, model: &str) -> Result<bool, DatabaseError> {
        let rows = self
            .fetch(
                "SELECT 1 AS present FROM sqlite_master WHERE type = 'table' AND name = ?1".into(),
                vec![libsql::Value::Text(model.to_string())],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Validate the model name and report whether it exists.
    async fn resolve(&self, model: &str, filter: &Predicate) -> Result<bool, DatabaseError> {
        validate_identifier(model)?;
        for field in filter.fields() {
            validate_identifier(field)?;
        }
        self.table_exists(model).await
    }

    async fn table_fields(&self, model: &str) -> Result<Vec<FieldDescriptor>, DatabaseError> {
        validate_identifier(model)?;
        // cid, name, type, notnull, dflt_value, pk
        let rows = self
            .fetch(format!("PRAGMA table_info(\"{model}\")"), Vec::new())
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.get("name")?.as_str()?.to_string();
                let flag = |key: &str| row.get(key).and_then(Value::as_i64).unwrap_or(0) != 0;
                Some(FieldDescriptor {
                    required: flag("notnull") || flag("pk"),
                    name,
                })
            })
            .collect())
    }

    async fn exec(&self, sql: &'static str) -> Result<(), DatabaseError> {
        self.run(sql.to_string(), Vec::new())
            .await
            .map_err(|e| DatabaseError::Query(format!("{sql}: {e}")))?;
        Ok(())
    }
}

async fn fetch_rows(
    conn: libsql::Connection,
    sql: String,
    params: Vec<libsql::Value>,
) -> Result<Vec<Row>, DatabaseError> {
    let mut rows = conn.query(&sql, libsql::params_from_iter(params)).await?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        let mut map = Row::new();
        for idx in 0..row.column_count() {
            let Some(name) = row.column_name(idx) else {
                continue;
            };
            map.insert(name.to_string(), to_json(row.get_value(idx)?));
        }
        out.push(map);
    }
    Ok(out)
}

#[async_trait]
impl Repository for LibSqlStore {
    async fn probe(&self) -> Result<(), DatabaseError> {
        let rows = self
            .fetch("SELECT 1 AS ok".into(), Vec::new())
            .await
            .map_err(|e| DatabaseError::Unavailable(e.to_string()))?;
        if rows.is_empty() {
            return Err(DatabaseError::Unavailable("probe returned no row".into()));
        }
        Ok(())
    }

    async fn introspect(&self) -> Result<Vec<ModelDescriptor>, DatabaseError> {
        let rows = self
            .fetch(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name"
                    .into(),
                Vec::new(),
            )
            .await?;
        let names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("name").and_then(Value::as_str).map(str::to_string))
            .collect();

        let mut models = Vec::with_capacity(names.len());
        for name in names {
            // Tables created outside the engine may carry names we refuse to quote.
            if validate_identifier(&name).is_err() {
                tracing::warn!(table = %name, "skipping table with non-identifier name");
                continue;
            }
            let fields = self.table_fields(&name).await?;
            models.push(ModelDescriptor { name, fields });
        }
        Ok(models)
    }

    async fn count(&self, model: &str, filter: &Predicate) -> Result<u64, DatabaseError> {
        if !self.resolve(model, filter).await? {
            return Ok(0);
        }
        let mut params = Vec::new();
        let where_clause = compile(filter, &mut params);
        let rows = self
            .fetch(
                format!("SELECT COUNT(*) AS n FROM \"{model}\" WHERE {where_clause}"),
                params,
            )
            .await?;
        let count = rows
            .first()
            .and_then(|row| row.get("n"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn query(&self, model: &str, filter: &Predicate) -> Result<Vec<Row>, DatabaseError> {
        if !self.resolve(model, filter).await? {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        let where_clause = compile(filter, &mut params);
        self.fetch(format!("SELECT * FROM \"{model}\" WHERE {where_clause}"), params)
            .await
    }

    async fn insert(&self, model: &str, row: Row) -> Result<(), DatabaseError> {
        validate_identifier(model)?;
        if row.is_empty() {
            return Err(DatabaseError::Query(format!("empty insert into {model}")));
        }
        let mut columns = Vec::with_capacity(row.len());
        let mut placeholders = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (key, value) in row {
            validate_identifier(&key)?;
            columns.push(format!("\"{key}\""));
            params.push(to_sql(&value));
            placeholders.push(format!("?{}", params.len()));
        }
        let sql = format!(
            "INSERT INTO \"{model}\" ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        self.run(sql, params).await?;
        Ok(())
    }

    async fn update(
        &self,
        model: &str,
        filter: &Predicate,
        changes: &Row,
    ) -> Result<u64, DatabaseError> {
        if changes.is_empty() || !self.resolve(model, filter).await? {
            return Ok(0);
        }
        let mut params = Vec::new();
        let mut assignments = Vec::with_capacity(changes.len());
        for (key, value) in changes {
            validate_identifier(key)?;
            params.push(to_sql(value));
            assignments.push(format!("\"{key}\" = ?{}", params.len()));
        }
        let where_clause = compile(filter, &mut params);
        let sql = format!(
            "UPDATE \"{model}\" SET {} WHERE {where_clause}",
            assignments.join(", ")
        );
        self.run(sql, params).await
    }

    async fn delete(&self, model: &str, filter: &Predicate) -> Result<u64, DatabaseError> {
        if !self.resolve(model, filter).await? {
            return Ok(0);
        }
        let mut params = Vec::new();
        let where_clause = compile(filter, &mut params);
        self.run(format!("DELETE FROM \"{model}\" WHERE {where_clause}"), params)
            .await
    }

    async fn begin(&self) -> Result<(), DatabaseError> {
        if self.in_transaction.swap(true, Ordering::SeqCst) {
            return Err(DatabaseError::InvalidState(
                "transaction already open".into(),
            ));
        }
        if let Err(e) = self.exec("BEGIN").await {
            self.in_transaction.store(false, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        if !self.in_transaction.load(Ordering::SeqCst) {
            return Err(DatabaseError::InvalidState("commit without begin".into()));
        }
        self.exec("COMMIT").await?;
        self.in_transaction.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        if !self.in_transaction.swap(false, Ordering::SeqCst) {
            return Err(DatabaseError::InvalidState(
                "rollback without begin".into(),
            ));
        }
        self.exec("ROLLBACK").await
    }

    fn optimizer(&self) -> Option<&dyn Optimizer> {
        Some(self)
    }
}

#[async_trait]
impl Optimizer for LibSqlStore {
    async fn vacuum(&self) -> Result<(), DatabaseError> {
        self.exec("VACUUM").await
    }

    async fn analyze(&self) -> Result<(), DatabaseError> {
        self.exec("ANALYZE").await
    }

    async fn reindex(&self) -> Result<(), DatabaseError> {
        self.exec("REINDEX").await
    }
}

/// Compile a predicate to a `WHERE` expression, pushing its parameters.
///
/// Field names must already be validated.
fn compile(predicate: &Predicate, params: &mut Vec<libsql::Value>) -> String {
    match predicate {
        Predicate::All => "1".to_string(),
        Predicate::Eq(field, value) => {
            params.push(to_sql(value));
            format!("\"{field}\" = ?{}", params.len())
        }
        Predicate::In(field, values) => {
            if values.is_empty() {
                return "0".to_string();
            }
            let placeholders: Vec<String> = values
                .iter()
                .map(|v| {
                    params.push(to_sql(v));
                    format!("?{}", params.len())
                })
                .collect();
            format!("\"{field}\" IN ({})", placeholders.join(", "))
        }
        Predicate::Blank(field) => format!(
            "(\"{field}\" IS NULL OR TRIM(CAST(\"{field}\" AS TEXT), {}) = '')",
            blank_chars_sql()
        ),
        Predicate::And(parts) => join(parts, " AND ", "1", params),
        Predicate::Or(parts) => join(parts, " OR ", "0", params),
    }
}

/// `BLANK_CHARS` as a SQL string expression (`' ' || char(9) || ...`).
fn blank_chars_sql() -> String {
    BLANK_CHARS
        .iter()
        .map(|c| {
            if *c == ' ' {
                "' '".to_string()
            } else {
                format!("char({})", u32::from(*c))
            }
        })
        .collect::<Vec<_>>()
        .join(" || ")
}

fn join(
    parts: &[Predicate],
    separator: &str,
    empty: &str,
    params: &mut Vec<libsql::Value>,
) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let compiled: Vec<String> = parts
        .iter()
        .map(|p| format!("({})", compile(p, params)))
        .collect();
    compiled.join(separator)
}

fn to_sql(value: &Value) -> libsql::Value {
    match value {
        Value::Null => libsql::Value::Null,
        Value::Bool(b) => libsql::Value::Integer(i64::from(*b)),
        Value::Number(n) => n.as_i64().map_or_else(
            || libsql::Value::Real(n.as_f64().unwrap_or_default()),
            libsql::Value::Integer,
        ),
        Value::String(s) => libsql::Value::Text(s.clone()),
        other => libsql::Value::Text(other.to_string()),
    }
}

fn to_json(value: libsql::Value) -> Value {
    match value {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(i) => Value::from(i),
        libsql::Value::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        libsql::Value::Text(s) => Value::String(s),
        libsql::Value::Blob(bytes) => {
            Value::String(bytes.iter().map(|b| format!("{b:02x}")).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn test_store() -> LibSqlStore {
        let store = LibSqlStore::open_local(":memory:").await.unwrap();
        store.apply_reference_schema().await.unwrap();
        store
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn reference_schema_is_introspectable() {
        let store = test_store().await;
        let models = store.introspect().await.unwrap();
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        for expected in [
            "users",
            "profiles",
            "assessments",
            "assessment_results",
            "account_links",
            "semh_assessments",
        ] {
            assert!(names.contains(&expected), "missing {expected}: {names:?}");
        }
        let users = models.iter().find(|m| m.name == "users").unwrap();
        assert!(users.has_field("email"));
        assert!(users.fields.iter().any(|f| f.name == "id" && f.required));
        assert!(users.fields.iter().any(|f| f.name == "email" && !f.required));
    }

    #[tokio::test]
    async fn absent_table_counts_zero() {
        let store = LibSqlStore::open_local(":memory:").await.unwrap();
        assert_eq!(store.count("users", &Predicate::All).await.unwrap(), 0);
        assert!(store.query("users", &Predicate::All).await.unwrap().is_empty());
        assert_eq!(store.delete("users", &Predicate::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn crud_through_predicates() {
        let store = test_store().await;
        store
            .insert("users", row(json!({"id": "1", "email": "a@x.com", "name": "Ann"})))
            .await
            .unwrap();
        store
            .insert("users", row(json!({"id": "2", "email": " ", "name": null})))
            .await
            .unwrap();

        assert_eq!(store.count("users", &Predicate::blank("email")).await.unwrap(), 1);
        assert_eq!(store.count("users", &Predicate::in_ids("id", ["1", "2"])).await.unwrap(), 2);
        assert_eq!(store.count("users", &Predicate::in_ids("id", Vec::<String>::new())).await.unwrap(), 0);

        let mut changes = Row::new();
        changes.insert("name".into(), json!("User 2"));
        let updated = store
            .update("users", &Predicate::blank("name"), &changes)
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let rows = store.query("users", &Predicate::eq("id", "2")).await.unwrap();
        assert_eq!(rows[0]["name"], json!("User 2"));

        let deleted = store.delete("users", &Predicate::eq("id", "1")).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count("users", &Predicate::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rollback_discards_changes() {
        let store = test_store().await;
        store
            .insert("assessments", row(json!({"id": "a1", "title": "Maths"})))
            .await
            .unwrap();
        store.begin().await.unwrap();
        store.delete("assessments", &Predicate::All).await.unwrap();
        store.rollback().await.unwrap();
        assert_eq!(store.count("assessments", &Predicate::All).await.unwrap(), 1);
        assert!(store.commit().await.is_err());
    }

    #[tokio::test]
    async fn rejects_unsafe_identifiers() {
        let store = test_store().await;
        let err = store
            .count("users\"; DROP TABLE users; --", &Predicate::All)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidIdentifier(_)));
        let err = store
            .count("users", &Predicate::eq("email = '' OR 1", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidIdentifier(_)));
    }

    #[tokio::test]
    async fn optimizer_runs_maintenance_commands() {
        let store = test_store().await;
        let optimizer = store.optimizer().unwrap();
        optimizer.analyze().await.unwrap();
        optimizer.reindex().await.unwrap();
        optimizer.vacuum().await.unwrap();
    }

    #[test]
    fn blank_trims_every_ascii_whitespace_char() {
        let mut params = Vec::new();
        let sql = compile(&Predicate::blank("email"), &mut params);
        assert_eq!(
            sql,
            "(\"email\" IS NULL OR TRIM(CAST(\"email\" AS TEXT), \
             ' ' || char(9) || char(10) || char(11) || char(12) || char(13)) = '')"
        );
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn control_whitespace_counts_as_blank() {
        let store = test_store().await;
        for (id, email) in [("1", "\t"), ("2", "\n"), ("3", " \r\n "), ("4", "a@x.com")] {
            store
                .insert("users", row(json!({"id": id, "email": email, "name": "Ann"})))
                .await
                .unwrap();
        }
        assert_eq!(store.count("users", &Predicate::blank("email")).await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn statements_yield_to_timeouts() {
        let store = test_store().await;
        store
            .conn()
            .execute(
                "INSERT INTO profiles (id, user_id)
                 WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 400000)
                 SELECT 'p' || x, 'u' || x FROM n",
                (),
            )
            .await
            .unwrap();

        let started = std::time::Instant::now();
        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            store.query("profiles", &Predicate::All),
        )
        .await;
        assert!(outcome.is_err(), "query should not finish within 50ms");
        assert!(started.elapsed() < std::time::Duration::from_millis(500));
    }

    #[test]
    fn compile_numbers_parameters_in_order() {
        let mut params = Vec::new();
        let sql = compile(
            &Predicate::And(vec![
                Predicate::eq("relation", "parent"),
                Predicate::in_ids("account_id", ["1", "2"]),
            ]),
            &mut params,
        );
        assert_eq!(sql, "(\"relation\" = ?1) AND (\"account_id\" IN (?2, ?3))");
        assert_eq!(params.len(), 3);
    }
}
