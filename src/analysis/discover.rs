use crate::analysis::{walk, AnalyzerConfig};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Occurrence statistics and distinct values for one JSON path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub path: String,
    /// Distinct non-null values, capped; arrays and objects are kept as
    /// their JSON text
    pub unique_values: Vec<Value>,
    pub null_count: usize,
    pub total_count: usize,
}

/// Discover every path in the sample, sorted by path
pub fn discover(documents: &[Value], config: &AnalyzerConfig) -> Vec<FieldMetadata> {
    let mut fields: Vec<FieldMetadata> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let max_unique = config.max_unique_values;

    for document in documents {
        walk(document, config.max_depth, &mut |path: &str, value: &Value| {
            let slot = *index.entry(path.to_string()).or_insert_with(|| {
                fields.push(FieldMetadata {
                    path: path.to_string(),
                    unique_values: Vec::new(),
                    null_count: 0,
                    total_count: 0,
                });
                fields.len() - 1
            });

            let field = &mut fields[slot];
            field.total_count += 1;

            if value.is_null() {
                field.null_count += 1;
                return;
            }

            if field.unique_values.len() < max_unique {
                let distinct = match value {
                    Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
                    scalar => scalar.clone(),
                };
                if !field.unique_values.contains(&distinct) {
                    field.unique_values.push(distinct);
                }
            }
        });
    }

    fields.sort_by(|a, b| a.path.cmp(&b.path));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_counts() {
        let fields = discover(&[json!({"a": {"b": 1, "c": null}})], &AnalyzerConfig::default());

        let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "a.b", "a.c"]);

        let c = &fields[2];
        assert_eq!(c.total_count, 1);
        assert_eq!(c.null_count, 1);
        assert!(c.unique_values.is_empty());
    }

    #[test]
    fn test_unique_values_are_distinct_and_capped() {
        let docs: Vec<Value> = (0..10).map(|i| json!({"n": i % 4, "tags": ["x", i]})).collect();
        let config = AnalyzerConfig {
            max_unique_values: 3,
            ..AnalyzerConfig::default()
        };
        let fields = discover(&docs, &config);

        let n = fields.iter().find(|f| f.path == "n").unwrap();
        assert_eq!(n.total_count, 10);
        assert_eq!(n.unique_values, vec![json!(0), json!(1), json!(2)]);

        let tags = fields.iter().find(|f| f.path == "tags").unwrap();
        assert_eq!(tags.unique_values[0], json!("[\"x\",0]"));
    }

    #[test]
    fn test_sorted_by_path() {
        let fields = discover(&[json!({"z": 1, "b": {"y": 2}, "a": 3})], &AnalyzerConfig::default());
        let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b", "b.y", "z"]);
    }

    #[test]
    fn test_empty_documents() {
        assert!(discover(&[], &AnalyzerConfig::default()).is_empty());
        assert!(discover(&[Value::Null], &AnalyzerConfig::default()).is_empty());
    }
}
