use crate::analysis::format::StringStats;
use crate::analysis::suggest::{suggest_column_name, suggest_sql_type, suggest_table_name};
use crate::analysis::{walk, AnalyzerConfig, JsonKind};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// What the sample says about one JSON path, with suggested destination
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnalysis {
    pub path: String,
    /// Non-null types observed, in first-seen order
    pub types: Vec<JsonKind>,
    pub is_array: bool,
    pub is_nullable: bool,
    pub samples: Vec<Value>,
    pub occurrence: usize,
    /// Longest string seen, in characters; absent when no string was seen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub suggested_table: String,
    pub suggested_column: String,
    pub suggested_type: String,
}

#[derive(Debug)]
struct FieldStats {
    path: String,
    types: Vec<JsonKind>,
    is_array: bool,
    is_nullable: bool,
    samples: Vec<Value>,
    occurrence: usize,
    max_length: Option<usize>,
    strings: StringStats,
}

impl FieldStats {
    fn new(path: &str, first: &Value) -> Self {
        FieldStats {
            path: path.to_string(),
            types: Vec::new(),
            is_array: first.is_array(),
            is_nullable: false,
            samples: Vec::new(),
            occurrence: 0,
            max_length: None,
            strings: StringStats::default(),
        }
    }

    fn record(&mut self, value: &Value, max_samples: usize) {
        self.occurrence += 1;

        let Some(kind) = JsonKind::of(value) else {
            self.is_nullable = true;
            return;
        };

        if !self.types.contains(&kind) {
            self.types.push(kind);
        }
        if self.samples.len() < max_samples {
            self.samples.push(value.clone());
        }
        if let Value::String(s) = value {
            let len = s.chars().count();
            self.max_length = Some(self.max_length.map_or(len, |m| m.max(len)));
            self.strings.add_string(s);
        }
    }

    fn finish(self, base_table_name: &str) -> FieldAnalysis {
        let suggested_type = suggest_sql_type(&self.types, &self.samples, self.max_length);
        FieldAnalysis {
            suggested_table: suggest_table_name(&self.path, base_table_name),
            suggested_column: suggest_column_name(&self.path),
            suggested_type,
            format: self.strings.format(),
            path: self.path,
            types: self.types,
            is_array: self.is_array,
            is_nullable: self.is_nullable,
            samples: self.samples,
            occurrence: self.occurrence,
            max_length: self.max_length,
        }
    }
}

/// Accumulates per-path statistics one document at a time
#[derive(Debug)]
pub struct FieldAnalyzer {
    config: AnalyzerConfig,
    fields: Vec<FieldStats>,
    index: HashMap<String, usize>,
    documents: usize,
}

impl FieldAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        FieldAnalyzer {
            config,
            fields: Vec::new(),
            index: HashMap::new(),
            documents: 0,
        }
    }

    pub fn add_document(&mut self, document: &Value) {
        self.documents += 1;

        let max_samples = self.config.max_samples;
        let fields = &mut self.fields;
        let index = &mut self.index;

        walk(document, self.config.max_depth, &mut |path: &str, value: &Value| {
            let slot = match index.get(path) {
                Some(&slot) => slot,
                None => {
                    fields.push(FieldStats::new(path, value));
                    index.insert(path.to_string(), fields.len() - 1);
                    fields.len() - 1
                }
            };
            fields[slot].record(value, max_samples);
        });
    }

    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Per-path analysis in first-seen order
    pub fn finish(self, base_table_name: &str) -> Vec<FieldAnalysis> {
        self.fields
            .into_iter()
            .map(|field| field.finish(base_table_name))
            .collect()
    }
}

/// Analyze a sample of documents. Top-level paths are suggested into
/// `base_table_name`.
pub fn analyze(documents: &[Value], base_table_name: &str, config: &AnalyzerConfig) -> Vec<FieldAnalysis> {
    let mut analyzer = FieldAnalyzer::new(config.clone());
    for document in documents {
        analyzer.add_document(document);
    }
    analyzer.finish(base_table_name)
}
