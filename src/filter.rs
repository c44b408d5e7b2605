//! WHERE clause over the JSON `content` column

use crate::store::Dialect;
use crate::types::{ConditionOperator, WhereCondition};
use serde_json::Value;
use tracing::debug;

/// Rendered filter: `clause` is empty or starts with `WHERE`, and its `?`
/// placeholders are bound from `params` in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub clause: String,
    pub params: Vec<Value>,
}

/// Build the filter for `conditions`, AND-ed together. Unsupported
/// operators, and `IN` without an array value, are left out.
///
/// Comparisons are textual: `{"n": 42}` matches both `42` and `"42"`, and
/// booleans match `"true"`/`"false"`.
pub fn build_predicate(conditions: &[WhereCondition], dialect: Dialect) -> Predicate {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    for condition in conditions {
        let path = Value::String(format!("$.{}", condition.field));
        let value = condition.value.clone().unwrap_or(Value::Null);

        match condition.operator {
            ConditionOperator::Eq | ConditionOperator::NotEq => {
                let op = if condition.operator == ConditionOperator::Eq { "=" } else { "!=" };
                clauses.push(format!("{} {} ?", dialect.json_text(), op));
                push_text_path(&mut params, path, dialect);
                params.push(as_text(value));
            }
            ConditionOperator::Like => {
                let needle = match as_text(value) {
                    Value::String(s) => s,
                    _ => String::new(),
                };
                clauses.push(format!("{} LIKE ?", dialect.json_text()));
                push_text_path(&mut params, path, dialect);
                params.push(Value::String(format!("%{}%", needle)));
            }
            ConditionOperator::In => {
                let Value::Array(items) = value else {
                    debug!(field = %condition.field, "IN condition without array value dropped");
                    continue;
                };
                if items.is_empty() {
                    clauses.push("1 = 0".to_string());
                    continue;
                }
                let placeholders = vec!["?"; items.len()].join(", ");
                clauses.push(format!("{} IN ({})", dialect.json_text(), placeholders));
                push_text_path(&mut params, path, dialect);
                params.extend(items.into_iter().map(as_text));
            }
            ConditionOperator::IsNull => {
                clauses.push(format!("{} IS NULL", dialect.json_raw()));
                params.push(path);
            }
            ConditionOperator::IsNotNull => {
                clauses.push(format!("{} IS NOT NULL", dialect.json_raw()));
                params.push(path);
            }
            ConditionOperator::Unsupported => {
                debug!(field = %condition.field, "unsupported operator dropped from filter");
            }
        }
    }

    if clauses.is_empty() {
        return Predicate::default();
    }

    Predicate {
        clause: format!("WHERE {}", clauses.join(" AND ")),
        params,
    }
}

/// Bind `path` once per placeholder of the dialect's text expression
pub(crate) fn push_text_path(params: &mut Vec<Value>, path: Value, dialect: Dialect) {
    for _ in 1..dialect.json_text_binds() {
        params.push(path.clone());
    }
    params.push(path);
}

/// Comparison operand in the form the text expression produces
fn as_text(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s),
        other => Value::String(other.to_string()),
    }
}
