use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

/// Render a report in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
        OutputFormat::Table => {
            let prefs = ui::prefs();
            let options = table::TableOptions {
                max_width: prefs.term_width,
                color: prefs.table_color,
            };
            Ok(render_table(&serde_json::to_value(value)?, options))
        }
    }
}

/// Print a report to stdout.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render(value, format)?);
    Ok(())
}

/// Objects become `field / value` rows with nested objects flattened to
/// dotted paths; arrays of objects become one row per element.
fn render_table(value: &Value, options: table::TableOptions) -> String {
    match value {
        Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
            let mut headers: Vec<String> = Vec::new();
            for key in items.iter().filter_map(Value::as_object).flat_map(|m| m.keys()) {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
            let rows: Vec<Vec<String>> = items
                .iter()
                .filter_map(Value::as_object)
                .map(|map| {
                    headers
                        .iter()
                        .map(|h| map.get(h).map_or_else(|| "-".to_string(), cell))
                        .collect()
                })
                .collect();
            let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
            table::render_table(&header_refs, &rows, options)
        }
        Value::Array(items) if items.is_empty() => "(no rows)".to_string(),
        Value::Object(_) => {
            let mut rows = Vec::new();
            flatten("", value, &mut rows);
            table::render_table(&["field", "value"], &rows, options)
        }
        other => table::render_table(&["value"], &[vec![cell(other)]], options),
    }
}

fn flatten(prefix: &str, value: &Value, rows: &mut Vec<Vec<String>>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, nested, rows);
            }
        }
        leaf => rows.push(vec![prefix.to_string(), cell(leaf)]),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => {
            items.iter().map(cell).collect::<Vec<_>>().join(", ")
        }
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const PLAIN: table::TableOptions = table::TableOptions {
        max_width: None,
        color: false,
    };

    #[test]
    fn raw_is_single_line_json() {
        let out = render(&json!({"status": "healthy", "issues": []}), OutputFormat::Raw).unwrap();
        assert!(!out.contains('\n'));
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["status"], "healthy");
    }

    #[test]
    fn nested_objects_flatten_to_dotted_fields() {
        let out = render_table(
            &json!({"status": "success", "changes": {"emails_backfilled": 2}}),
            PLAIN,
        );
        assert!(out.contains("changes.emails_backfilled"));
        assert!(out.lines().next().is_some_and(|l| l.starts_with("field")));
    }

    #[test]
    fn arrays_of_objects_get_one_row_each() {
        let out = render_table(
            &json!([
                {"cadence": "daily", "tasks": ["backup", "health_check"]},
                {"cadence": "weekly", "tasks": ["vacuum_analyze"]},
            ]),
            PLAIN,
        );
        assert_eq!(out.lines().count(), 4);
        assert!(out.contains("backup, health_check"));
    }
}
