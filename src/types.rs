use crate::error::FlattenError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// One column of a destination table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,

    /// Declared SQL type, e.g. "VARCHAR(255)", "DATETIME"
    #[serde(rename = "type", alias = "sqlType")]
    pub sql_type: String,

    #[serde(default = "default_true")]
    pub nullable: bool,

    #[serde(default)]
    pub is_primary_key: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        ColumnDefinition {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            is_primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A destination table - identity is its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,

    /// Whether the table must be created before use
    #[serde(default)]
    pub is_new: bool,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        TableDefinition {
            name: name.into(),
            columns,
            is_new: false,
        }
    }

    pub fn marked_new(mut self) -> Self {
        self.is_new = true;
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Routes one dot-delimited JSON path into one destination column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub source_path: String,
    pub target_table: String,
    pub target_column: String,
}

impl FieldMapping {
    pub fn new(
        source_path: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        FieldMapping {
            source_path: source_path.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
        }
    }
}

/// Parent -> child foreign-key dependency between two destination tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRelationship {
    pub parent_table: String,
    pub child_table: String,
    /// Column in the child table
    pub foreign_key_column: String,
    /// Column in the parent table, conventionally its primary key
    pub parent_key_column: String,
}

/// Operators accepted in a WHERE condition. Anything else deserializes to
/// `Unsupported` and is dropped from the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
    #[serde(other)]
    Unsupported,
}

/// Filter on a path inside the pending document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereCondition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl WhereCondition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Option<Value>) -> Self {
        WhereCondition {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Everything one flattening run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenJob {
    /// Archive table; pending rows live in `{base_table_name}_toprocess`
    pub base_table_name: String,

    pub tables: Vec<TableDefinition>,

    pub mappings: Vec<FieldMapping>,

    #[serde(default)]
    pub where_conditions: Vec<WhereCondition>,

    /// Empty means auto-detect from `_id` column naming
    #[serde(default)]
    pub relationships: Vec<TableRelationship>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl FlattenJob {
    pub fn new(
        base_table_name: impl Into<String>,
        tables: Vec<TableDefinition>,
        mappings: Vec<FieldMapping>,
    ) -> Self {
        FlattenJob {
            base_table_name: base_table_name.into(),
            tables,
            mappings,
            where_conditions: Vec::new(),
            relationships: Vec::new(),
            batch_size: default_batch_size(),
        }
    }

    pub fn with_relationships(mut self, relationships: Vec<TableRelationship>) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn with_conditions(mut self, where_conditions: Vec<WhereCondition>) -> Self {
        self.where_conditions = where_conditions;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Load a job document from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, FlattenError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FlattenError::InvalidJob(format!("{}: {}", path.display(), e)))?;
        let job: FlattenJob = serde_json::from_str(&text)
            .map_err(|e| FlattenError::InvalidJob(format!("{}: {}", path.display(), e)))?;
        job.validate()?;
        Ok(job)
    }

    pub fn validate(&self) -> Result<(), FlattenError> {
        if self.base_table_name.trim().is_empty() {
            return Err(FlattenError::InvalidJob("baseTableName is required".to_string()));
        }
        if self.batch_size == 0 {
            return Err(FlattenError::InvalidJob("batchSize must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn pending_table(&self) -> String {
        pending_table_name(&self.base_table_name)
    }
}

/// Outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub tables_created: Vec<String>,

    /// Records inserted into every target table without error
    #[serde(rename = "recordsProcessed")]
    pub processed: usize,

    /// Records relocated from the pending table to the archive table
    #[serde(rename = "recordsMoved")]
    pub moved: u64,

    pub errors: Vec<String>,
}

pub fn pending_table_name(base_table_name: &str) -> String {
    format!("{}_toprocess", base_table_name)
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_job_wire_shape() {
        let job: FlattenJob = serde_json::from_value(json!({
            "baseTableName": "events",
            "tables": [
                {
                    "name": "users",
                    "isNew": true,
                    "columns": [
                        {"name": "id", "type": "INT", "nullable": false, "isPrimaryKey": true},
                        {"name": "name", "sqlType": "VARCHAR(255)"}
                    ]
                }
            ],
            "mappings": [
                {"sourcePath": "user.name", "targetTable": "users", "targetColumn": "name"}
            ],
            "whereConditions": [
                {"field": "type", "operator": "=", "value": "signup"},
                {"field": "type", "operator": "BETWEEN", "value": [1, 2]}
            ]
        }))
        .unwrap();

        assert_eq!(job.batch_size, 100);
        assert!(job.relationships.is_empty());
        assert!(job.tables[0].is_new);
        assert_eq!(job.tables[0].columns[1].sql_type, "VARCHAR(255)");
        assert!(job.tables[0].columns[1].nullable);
        assert_eq!(job.where_conditions[0].operator, ConditionOperator::Eq);
        assert_eq!(job.where_conditions[1].operator, ConditionOperator::Unsupported);
        assert_eq!(job.pending_table(), "events_toprocess");
    }

    #[test]
    fn test_job_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"baseTableName": "events", "tables": [], "mappings": [], "batchSize": 5}}"#
        )
        .unwrap();

        let job = FlattenJob::from_path(file.path()).unwrap();
        assert_eq!(job.base_table_name, "events");
        assert_eq!(job.batch_size, 5);
    }

    #[test]
    fn test_job_rejects_zero_batch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"baseTableName": "events", "tables": [], "mappings": [], "batchSize": 0}}"#
        )
        .unwrap();

        assert!(matches!(
            FlattenJob::from_path(file.path()),
            Err(FlattenError::InvalidJob(_))
        ));
    }

    #[test]
    fn test_result_wire_names() {
        let result = ExecutionResult {
            tables_created: vec!["users".to_string()],
            processed: 2,
            moved: 3,
            errors: vec![],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["recordsProcessed"], 2);
        assert_eq!(value["recordsMoved"], 3);
        assert_eq!(value["tablesCreated"][0], "users");
    }
}
