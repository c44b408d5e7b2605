//! Field discovery and type analysis over sampled JSON documents
//!
//! Both passes walk every key/value pair of each document and key their
//! statistics by dot-joined path (`parent.child`). Arrays are represented by
//! their first element only: documents are assumed to be structurally
//! homogeneous across array entries.
//!
//! ```rust
//! use json_flattener::analysis::{analyze, AnalyzerConfig};
//! use serde_json::json;
//!
//! let docs = vec![json!({"user": {"firstName": "Alice", "age": 30}})];
//! let fields = analyze(&docs, "events", &AnalyzerConfig::default());
//!
//! let age = fields.iter().find(|f| f.path == "user.age").unwrap();
//! assert_eq!(age.suggested_table, "user_data");
//! assert_eq!(age.suggested_type, "INT");
//! ```

pub mod analyzer;
pub mod discover;
pub mod format;
pub mod suggest;

pub use analyzer::{analyze, FieldAnalysis, FieldAnalyzer};
pub use discover::{discover, FieldMetadata};
pub use format::detect_format;
pub use suggest::{suggest_column_name, suggest_sql_type, suggest_table_name};

use crate::document::parse_content;
use crate::error::{FlattenError, Result};
use crate::filter::{build_predicate, push_text_path};
use crate::store::{Store, StoreError};
use crate::types::{pending_table_name, WhereCondition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Type tag of a non-null JSON value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(JsonKind::Boolean),
            Value::Number(_) => Some(JsonKind::Number),
            Value::String(_) => Some(JsonKind::String),
            Value::Array(_) => Some(JsonKind::Array),
            Value::Object(_) => Some(JsonKind::Object),
        }
    }
}

/// Limits applied while walking sampled documents
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Nesting depth beyond which a document is not descended
    pub max_depth: usize,

    /// Distinct values kept per path by `discover`
    pub max_unique_values: usize,

    /// Raw sample values kept per path by `analyze`
    pub max_samples: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            max_depth: 20,
            max_unique_values: 100,
            max_samples: 5,
        }
    }
}

/// Visit every `(path, value)` pair of one document.
///
/// The visited set is keyed by object address and lives for this document
/// only, so identical sibling subtrees never collide.
pub(crate) fn walk<F>(document: &Value, max_depth: usize, visit: &mut F)
where
    F: FnMut(&str, &Value),
{
    let mut visited: HashSet<*const Map<String, Value>> = HashSet::new();
    walk_value(document, "", 0, max_depth, &mut visited, visit);
}

fn walk_value<F>(
    value: &Value,
    prefix: &str,
    depth: usize,
    max_depth: usize,
    visited: &mut HashSet<*const Map<String, Value>>,
    visit: &mut F,
) where
    F: FnMut(&str, &Value),
{
    if depth > max_depth {
        warn!(path = prefix, max_depth, "max depth reached, not descending");
        return;
    }

    match value {
        Value::Array(items) => {
            if let Some(first) = items.first() {
                walk_value(first, prefix, depth + 1, max_depth, visited, visit);
            }
        }
        Value::Object(map) => {
            if !visited.insert(map as *const Map<String, Value>) {
                warn!(path = prefix, "circular reference detected");
                return;
            }

            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };

                visit(&path, child);

                match child {
                    Value::Object(_) => {
                        walk_value(child, &path, depth + 1, max_depth, visited, visit);
                    }
                    Value::Array(items) => {
                        if let Some(first) = items.first() {
                            walk_value(first, &path, depth + 1, max_depth, visited, visit);
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

/// Documents read from a table, with the filtered row count
#[derive(Debug, Clone)]
pub struct Sample {
    pub documents: Vec<Value>,
    pub total_records: u64,
}

/// Read the filtered row count and up to `limit` parsed documents from the
/// `content` column of `table`. Rows whose content is not valid JSON are
/// skipped.
pub fn load_sample<S: Store + ?Sized>(
    store: &S,
    table: &str,
    limit: usize,
    conditions: &[WhereCondition],
) -> Result<Sample> {
    let dialect = store.dialect();
    let predicate = build_predicate(conditions, dialect);
    let quoted = dialect.quote_ident(table);
    let to_error = |source: StoreError| FlattenError::Sample {
        table: table.to_string(),
        source,
    };

    let count_sql = format!("SELECT COUNT(*) AS total FROM {} {}", quoted, predicate.clause);
    let total_records = store
        .query(&count_sql, &predicate.params)
        .map_err(to_error)?
        .first()
        .and_then(|row| row.get("total"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let sample_sql = format!(
        "SELECT content FROM {} {} LIMIT {}",
        quoted, predicate.clause, limit
    );
    let rows = store.query(&sample_sql, &predicate.params).map_err(to_error)?;

    let mut documents = Vec::with_capacity(rows.len());
    for row in rows {
        match row.get("content").map(parse_content) {
            Some(Ok(doc)) => documents.push(doc),
            Some(Err(e)) => warn!(table, error = %e, "skipping unparseable document"),
            None => warn!(table, "row has no content column"),
        }
    }

    debug!(table, sampled = documents.len(), total_records, "loaded sample");
    Ok(Sample {
        documents,
        total_records,
    })
}

/// Analysis of a stored table, as returned to callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub base_table_name: String,
    pub to_process_table: String,
    pub total_records_in_table: u64,
    pub sampled_records: usize,
    pub applied_filters: Vec<WhereCondition>,
    pub fields: Vec<FieldAnalysis>,
    pub analyzed_at: DateTime<Utc>,
}

/// Sample `base_table_name` through `conditions` and analyze the documents
pub fn analyze_table<S: Store + ?Sized>(
    store: &S,
    base_table_name: &str,
    sample_size: usize,
    conditions: &[WhereCondition],
    config: &AnalyzerConfig,
) -> Result<AnalysisReport> {
    let sample = load_sample(store, base_table_name, sample_size, conditions)?;
    let fields = analyze(&sample.documents, base_table_name, config);

    Ok(AnalysisReport {
        base_table_name: base_table_name.to_string(),
        to_process_table: pending_table_name(base_table_name),
        total_records_in_table: sample.total_records,
        sampled_records: sample.documents.len(),
        applied_filters: conditions.to_vec(),
        fields,
        analyzed_at: Utc::now(),
    })
}

/// Field discovery over a stored table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    pub table_name: String,
    pub sample_size: usize,
    pub fields: Vec<FieldMetadata>,
}

pub fn discover_table<S: Store + ?Sized>(
    store: &S,
    table: &str,
    sample_size: usize,
    config: &AnalyzerConfig,
) -> Result<Discovery> {
    let sample = load_sample(store, table, sample_size, &[])?;
    Ok(Discovery {
        table_name: table.to_string(),
        sample_size: sample.documents.len(),
        fields: discover(&sample.documents, config),
    })
}

/// Distinct values found at one JSON path
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValues {
    pub field_path: String,
    pub values: Vec<Value>,
}

/// Up to `limit` distinct non-null values at `field_path`, as text, for
/// building filter conditions
pub fn field_values<S: Store + ?Sized>(
    store: &S,
    table: &str,
    field_path: &str,
    limit: usize,
) -> Result<FieldValues> {
    let dialect = store.dialect();
    let path = Value::String(format!("$.{}", field_path));
    let sql = format!(
        "SELECT DISTINCT {} AS value FROM {} WHERE {} IS NOT NULL LIMIT {}",
        dialect.json_text(),
        dialect.quote_ident(table),
        dialect.json_raw(),
        limit
    );

    let mut params = Vec::new();
    push_text_path(&mut params, path.clone(), dialect);
    params.push(path);

    let rows = store
        .query(&sql, &params)
        .map_err(|source| FlattenError::Sample {
            table: table.to_string(),
            source,
        })?;

    let values: Vec<Value> = rows
        .into_iter()
        .filter_map(|mut row| row.remove("value"))
        .filter(|value| !value.is_null())
        .collect();
    debug!(table, path = field_path, count = values.len(), "loaded field values");

    Ok(FieldValues {
        field_path: field_path.to_string(),
        values,
    })
}
