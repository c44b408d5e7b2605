//! # json-flattener - JSON to relational tables
//!
//! Flattens JSON documents staged in a `{base}_toprocess` table into
//! normalized relational tables, then archives them into `{base}`.
//!
//! ## Modules
//!
//! - **relationship**: parent/child detection and insert ordering
//! - **analysis**: field discovery, type analysis and schema suggestions
//! - **engine**: table creation and batch flattening
//! - **translate**: database errors into actionable diagnostics
//! - **store**: backing store contract, SQL dialects and SQLite
//!
//! ## Quick Start
//!
//! ```rust
//! use json_flattener::{ColumnDefinition, Executor, FieldMapping, FlattenJob, SqliteStore, TableDefinition};
//! use json_flattener::store::Store;
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = SqliteStore::open_in_memory()?;
//! store.raw_query("CREATE TABLE events_toprocess (id INTEGER PRIMARY KEY, content TEXT)")?;
//! store.raw_query("CREATE TABLE events (id INTEGER PRIMARY KEY, content TEXT)")?;
//! store.query(
//!     "INSERT INTO events_toprocess (content) VALUES (?)",
//!     &[json!(r#"{"user": {"name": "Alice"}}"#)],
//! )?;
//!
//! let users = TableDefinition::new(
//!     "users",
//!     vec![
//!         ColumnDefinition::new("id", "INTEGER").primary_key(),
//!         ColumnDefinition::new("name", "VARCHAR(255)"),
//!     ],
//! )
//! .marked_new();
//! let job = FlattenJob::new("events", vec![users], vec![FieldMapping::new("user.name", "users", "name")]);
//!
//! let result = Executor::new(&store).execute(&job)?;
//! assert_eq!(result.processed, 1);
//! assert_eq!(result.moved, 1);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod relationship;
pub mod store;
pub mod translate;
pub mod types;

pub use analysis::{analyze, discover, field_values, AnalyzerConfig, FieldAnalysis, FieldMetadata, FieldValues};
pub use engine::Executor;
pub use error::{FlattenError, Result};
pub use relationship::{auto_detect, insert_order};
pub use store::{Dialect, SqliteStore, Store, StoreError};
pub use translate::{translate_error, Diagnostic, ErrorCategory};
pub use types::{
    ColumnDefinition, ConditionOperator, ExecutionResult, FieldMapping, FlattenJob, TableDefinition,
    TableRelationship, WhereCondition,
};
