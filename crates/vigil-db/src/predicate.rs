//! Store-independent row predicates.
//!
//! The engine expresses every selection as a `Predicate`. `MemoryStore`
//! evaluates predicates directly against rows; `LibSqlStore` compiles them to
//! parameterised SQL.

use serde_json::Value;
use vigil_core::ids::{id_of, is_blank};

use crate::error::DatabaseError;

/// A row as seen by the engine: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Every row.
    All,
    /// `field == value` (identifiers compare loosely, see [`values_match`]).
    Eq(String, Value),
    /// `field` is one of `values`. An empty list matches nothing.
    In(String, Vec<Value>),
    /// `field` is null, missing, or a whitespace-only string.
    Blank(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    #[must_use]
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::Eq(field.to_string(), value.into())
    }

    /// `field IN ids`, with identifiers passed as strings.
    #[must_use]
    pub fn in_ids<I, S>(field: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::In(
            field.to_string(),
            ids.into_iter().map(|id| Value::String(id.into())).collect(),
        )
    }

    #[must_use]
    pub fn blank(field: &str) -> Self {
        Self::Blank(field.to_string())
    }

    /// Evaluate the predicate against a row.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::All => true,
            Self::Eq(field, value) => row.get(field).is_some_and(|v| values_match(v, value)),
            Self::In(field, values) => row
                .get(field)
                .is_some_and(|v| values.iter().any(|candidate| values_match(v, candidate))),
            Self::Blank(field) => is_blank(row.get(field)),
            Self::And(parts) => parts.iter().all(|p| p.matches(row)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(row)),
        }
    }

    /// Every field name the predicate references.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::All => Vec::new(),
            Self::Eq(field, _) | Self::In(field, _) | Self::Blank(field) => vec![field.as_str()],
            Self::And(parts) | Self::Or(parts) => parts.iter().flat_map(Self::fields).collect(),
        }
    }
}

/// Loose equality: identical values, or two scalars with the same identifier
/// form (`"42"` matches `42`).
#[must_use]
pub fn values_match(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (id_of(a), id_of(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Model and field names must be plain identifiers before they reach SQL.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidIdentifier` for empty names or names with
/// characters outside `[A-Za-z0-9_]`.
pub fn validate_identifier(name: &str) -> Result<(), DatabaseError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn eq_matches_ids_loosely() {
        let r = row(json!({"id": 42, "email": "a@x.com"}));
        assert!(Predicate::eq("id", "42").matches(&r));
        assert!(Predicate::eq("email", "a@x.com").matches(&r));
        assert!(!Predicate::eq("email", "b@x.com").matches(&r));
        assert!(!Predicate::eq("missing", "x").matches(&r));
    }

    #[test]
    fn in_with_empty_list_matches_nothing() {
        let r = row(json!({"id": "1"}));
        assert!(!Predicate::in_ids("id", Vec::<String>::new()).matches(&r));
        assert!(Predicate::in_ids("id", ["2", "1"]).matches(&r));
    }

    #[test]
    fn blank_covers_null_missing_and_whitespace() {
        assert!(Predicate::blank("email").matches(&row(json!({"email": null}))));
        assert!(Predicate::blank("email").matches(&row(json!({}))));
        assert!(Predicate::blank("email").matches(&row(json!({"email": "  "}))));
        assert!(!Predicate::blank("email").matches(&row(json!({"email": "a@x.com"}))));
    }

    #[test]
    fn combinators() {
        let r = row(json!({"email": "", "name": "Ann"}));
        let either = Predicate::Or(vec![Predicate::blank("email"), Predicate::blank("name")]);
        let both = Predicate::And(vec![Predicate::blank("email"), Predicate::blank("name")]);
        assert!(either.matches(&r));
        assert!(!both.matches(&r));
        assert_eq!(either.fields(), vec!["email", "name"]);
    }

    #[rstest]
    #[case("assessment_results", true)]
    #[case("Users2", true)]
    #[case("users; DROP TABLE users", false)]
    #[case("", false)]
    #[case("name\"", false)]
    #[case("semh-assessments", false)]
    fn identifiers_are_restricted(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_identifier(name).is_ok(), valid);
    }
}
