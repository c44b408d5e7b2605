//! Destination naming and typing heuristics

use crate::analysis::JsonKind;
use serde_json::Value;

const BIGINT_THRESHOLD: f64 = 1_000_000_000.0;

/// Table for a path: derived from the parent segment, or the base table for
/// top-level paths. `eventData.x` -> `events`, `user.x` -> `user_data`.
pub fn suggest_table_name(path: &str, base_table_name: &str) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() < 2 {
        return base_table_name.to_string();
    }

    let parent = parts[parts.len() - 2].to_lowercase();
    match parent.strip_suffix("data") {
        Some(stem) => format!("{}s", stem),
        None => format!("{}_data", parent),
    }
}

/// Column for a path: the last segment, camelCase turned into snake_case
pub fn suggest_column_name(path: &str) -> String {
    let last = path.rsplit('.').next().unwrap_or(path);
    let mut column = String::with_capacity(last.len() + 4);
    for c in last.chars() {
        if c.is_ascii_uppercase() {
            column.push('_');
            column.push(c.to_ascii_lowercase());
        } else {
            column.push(c);
        }
    }
    column
}

/// SQL type by priority: number > boolean > string > object/array > TEXT
pub fn suggest_sql_type(types: &[JsonKind], samples: &[Value], max_length: Option<usize>) -> String {
    if types.contains(&JsonKind::Number) {
        let large = samples
            .iter()
            .filter_map(Value::as_f64)
            .any(|n| n > BIGINT_THRESHOLD);
        return if large { "BIGINT" } else { "INT" }.to_string();
    }

    if types.contains(&JsonKind::Boolean) {
        return "TINYINT(1)".to_string();
    }

    if types.contains(&JsonKind::String) {
        let max_len = max_length.unwrap_or(0);
        return if max_len > 1000 {
            "TEXT"
        } else if max_len > 255 {
            "VARCHAR(500)"
        } else {
            "VARCHAR(255)"
        }
        .to_string();
    }

    if types.contains(&JsonKind::Object) || types.contains(&JsonKind::Array) {
        return "JSON".to_string();
    }

    "TEXT".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_names() {
        assert_eq!(suggest_table_name("name", "events"), "events");
        assert_eq!(suggest_table_name("user.name", "events"), "user_data");
        assert_eq!(suggest_table_name("payload.eventData.kind", "events"), "events");
        assert_eq!(suggest_table_name("OrderDATA.total", "events"), "orders");
        assert_eq!(suggest_table_name("Customer.id", "events"), "customer_data");
    }

    #[test]
    fn test_column_names() {
        assert_eq!(suggest_column_name("eventName"), "event_name");
        assert_eq!(suggest_column_name("meta.createdAt"), "created_at");
        assert_eq!(suggest_column_name("a.b.plain"), "plain");
    }

    #[test]
    fn test_string_widths() {
        let s = [JsonKind::String];
        assert_eq!(suggest_sql_type(&s, &[], Some(1500)), "TEXT");
        assert_eq!(suggest_sql_type(&s, &[], Some(400)), "VARCHAR(500)");
        assert_eq!(suggest_sql_type(&s, &[], Some(50)), "VARCHAR(255)");
    }

    #[test]
    fn test_numbers() {
        let n = [JsonKind::Number];
        assert_eq!(suggest_sql_type(&n, &[json!(1700000000000_i64)], None), "BIGINT");
        assert_eq!(suggest_sql_type(&n, &[json!(42)], None), "INT");
    }

    #[test]
    fn test_priority() {
        assert_eq!(
            suggest_sql_type(&[JsonKind::String, JsonKind::Number], &[json!("x"), json!(1)], Some(3)),
            "INT"
        );
        assert_eq!(
            suggest_sql_type(&[JsonKind::String, JsonKind::Boolean], &[], Some(3)),
            "TINYINT(1)"
        );
        assert_eq!(suggest_sql_type(&[JsonKind::Array], &[], None), "JSON");
        assert_eq!(suggest_sql_type(&[JsonKind::Object], &[], None), "JSON");
        assert_eq!(suggest_sql_type(&[], &[], None), "TEXT");
    }
}
