//! Flattening execution engine
//!
//! One call to [`Executor::flatten_records`] processes one bounded batch of
//! pending documents:
//!
//! 1. resolve the insert order (auto-detecting relationships when none are
//!    given); a cycle aborts the run before anything is read
//! 2. read up to `batch_size` rows from `{base}_toprocess` through the filter
//! 3. per record, insert one row per mapped table in dependency order,
//!    feeding generated parent keys into child foreign-key columns; the first
//!    failing insert ends that record and is reported as a translated error
//! 4. copy every record read, failed or not, into the archive table
//!    `{base}` and delete it from the pending table
//! 5. archive whatever is still pending, since it no longer matches the filter
//!
//! Rows inserted for a record before one of its inserts fails are kept.

pub mod extract;

pub use extract::{extract_value, is_date_time_type, normalize_timestamp};

use crate::document::parse_content;
use crate::error::{FlattenError, Result};
use crate::filter::build_predicate;
use crate::relationship::{auto_detect, insert_order};
use crate::store::{Dialect, Store, StoreError};
use crate::translate::translate_error;
use crate::types::{ExecutionResult, FieldMapping, FlattenJob, TableDefinition, TableRelationship};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// One row read from the pending table
#[derive(Debug, Clone)]
struct PendingRecord {
    id: Value,
    content: Value,
}

/// Per-table insert recipe, resolved once per run
struct TablePlan<'a> {
    name: &'a str,
    mappings: Vec<&'a FieldMapping>,
    definition: Option<&'a TableDefinition>,
    parents: Vec<&'a TableRelationship>,
}

/// Runs table creation and batch flattening against a [`Store`]
pub struct Executor<'s, S: Store + ?Sized> {
    store: &'s S,
}

impl<'s, S: Store + ?Sized> Executor<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Executor { store }
    }

    fn dialect(&self) -> Dialect {
        self.store.dialect()
    }

    /// Create every table flagged `is_new` if it does not exist yet.
    ///
    /// Creations are independent; the first failure aborts the rest and
    /// already-created tables stay. Returns the names of the tables targeted.
    pub fn create_tables(&self, tables: &[TableDefinition]) -> Result<Vec<String>> {
        let dialect = self.dialect();
        let mut created = Vec::new();

        for table in tables.iter().filter(|t| t.is_new) {
            let columns: Vec<String> = table
                .columns
                .iter()
                .map(|col| {
                    if col.is_primary_key {
                        dialect.primary_key_column(&col.name, &col.sql_type)
                    } else if col.nullable {
                        format!("{} {}", dialect.quote_ident(&col.name), col.sql_type)
                    } else {
                        format!("{} {} NOT NULL", dialect.quote_ident(&col.name), col.sql_type)
                    }
                })
                .collect();

            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
                dialect.quote_ident(&table.name),
                columns.join(",\n  ")
            );

            self.store
                .raw_query(&sql)
                .map_err(|source| FlattenError::TableCreation {
                    table: table.name.clone(),
                    source,
                })?;
            info!(table = %table.name, "table ready");
            created.push(table.name.clone());
        }

        Ok(created)
    }

    /// Create flagged tables, then flatten one batch
    pub fn execute(&self, job: &FlattenJob) -> Result<ExecutionResult> {
        job.validate()?;
        let tables_created = self.create_tables(&job.tables)?;
        let mut result = self.flatten_records(job)?;
        result.tables_created = tables_created;
        Ok(result)
    }

    /// Flatten one batch of pending records into the job's tables and move
    /// the batch to the archive table.
    pub fn flatten_records(&self, job: &FlattenJob) -> Result<ExecutionResult> {
        job.validate()?;
        let pending_table = job.pending_table();
        let archive_table = job.base_table_name.as_str();

        let relationships = if job.relationships.is_empty() {
            let detected = auto_detect(&job.tables);
            info!(count = detected.len(), "auto-detected relationships");
            for rel in &detected {
                debug!(
                    parent = %rel.parent_table,
                    child = %rel.child_table,
                    column = %rel.foreign_key_column,
                    "relationship"
                );
            }
            detected
        } else {
            job.relationships.clone()
        };

        let table_names: Vec<String> = job.tables.iter().map(|t| t.name.clone()).collect();
        let order = insert_order(&table_names, &relationships)?;
        info!(order = ?order, "insert order");

        for mapping in &job.mappings {
            if !table_names.contains(&mapping.target_table) {
                warn!(
                    table = %mapping.target_table,
                    path = %mapping.source_path,
                    "mapping targets a table outside the job; ignored"
                );
            }
        }

        let plans = build_plans(&order, job, &relationships);
        let records = self.read_batch(job, &pending_table)?;
        info!(count = records.len(), table = %pending_table, "retrieved records to process");

        let mut result = ExecutionResult::default();
        for record in &records {
            if self.process_record(record, &plans, &mut result.errors) {
                result.processed += 1;
            }
        }

        info!(
            processed = result.processed,
            total = records.len(),
            "batch processed"
        );

        if !records.is_empty() {
            let ids: Vec<Value> = records.iter().map(|r| r.id.clone()).collect();
            result.moved = self.archive_batch(&pending_table, archive_table, &ids)?;
            if result.processed < records.len() {
                info!(
                    moved = result.moved,
                    archive = archive_table,
                    failed = records.len() - result.processed,
                    "moved batch to archive, including failed records"
                );
            } else {
                info!(moved = result.moved, archive = archive_table, "moved batch to archive");
            }
        }

        result.moved += self.archive_remaining(&pending_table, archive_table)?;

        if !result.errors.is_empty() {
            error!(
                failed = records.len() - result.processed,
                archive = archive_table,
                "some records failed and were archived anyway"
            );
        }

        Ok(result)
    }

    fn read_batch(&self, job: &FlattenJob, pending_table: &str) -> Result<Vec<PendingRecord>> {
        let dialect = self.dialect();
        let predicate = build_predicate(&job.where_conditions, dialect);
        let sql = format!(
            "SELECT id, content FROM {} {} LIMIT {}",
            dialect.quote_ident(pending_table),
            predicate.clause,
            job.batch_size
        );
        debug!(sql = %sql, "select pending");

        let rows = self
            .store
            .query(&sql, &predicate.params)
            .map_err(|source| FlattenError::BatchRead {
                table: pending_table.to_string(),
                source,
            })?;

        Ok(rows
            .into_iter()
            .map(|mut row| PendingRecord {
                id: row.remove("id").unwrap_or(Value::Null),
                content: row.remove("content").unwrap_or(Value::Null),
            })
            .collect())
    }

    /// Insert one record into every mapped table. Returns whether all inserts
    /// succeeded; failures are appended to `errors`.
    fn process_record(&self, record: &PendingRecord, plans: &[TablePlan<'_>], errors: &mut Vec<String>) -> bool {
        let record_id = display_id(&record.id);

        let document = match parse_content(&record.content) {
            Ok(doc) => doc,
            Err(e) => {
                let message = format!("Record {}: content is not valid JSON: {}", record_id, e);
                error!("{}", message);
                errors.push(message);
                return false;
            }
        };

        let mut generated_ids: HashMap<&str, i64> = HashMap::new();

        for plan in plans {
            if plan.mappings.is_empty() {
                debug!(table = plan.name, "skipping table with no field mappings");
                continue;
            }

            let columns = row_values(plan, &document, &generated_ids);

            match self.insert_row(plan.name, &columns) {
                Ok(Some(id)) => {
                    debug!(table = plan.name, id, record = %record_id, "inserted");
                    generated_ids.insert(plan.name, id);
                }
                Ok(None) => {
                    debug!(table = plan.name, record = %record_id, "inserted without generated id");
                }
                Err(e) => {
                    let diagnostic = translate_error(&e.message, plan.name);
                    error!(record = %record_id, table = plan.name, "{}", diagnostic);
                    errors.push(format!("Record {}: {}", record_id, diagnostic));
                    return false;
                }
            }
        }

        true
    }

    fn insert_row(&self, table: &str, columns: &[(String, Value)]) -> std::result::Result<Option<i64>, StoreError> {
        let dialect = self.dialect();
        let names: Vec<String> = columns.iter().map(|(c, _)| dialect.quote_ident(c)).collect();
        let values: Vec<String> = columns.iter().map(|(_, v)| dialect.literal(v)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dialect.quote_ident(table),
            names.join(", "),
            values.join(", ")
        );

        Ok(self.store.raw_query(&sql)?.insert_id())
    }

    /// Copy `ids` into the archive (skipping ids already there) and delete
    /// them from the pending table. Returns the number of rows deleted.
    fn archive_batch(&self, pending_table: &str, archive_table: &str, ids: &[Value]) -> Result<u64> {
        let dialect = self.dialect();
        let id_list = dialect.literal_list(ids);
        let to_error = |source: StoreError| FlattenError::Archive {
            table: archive_table.to_string(),
            source,
        };

        let copy = format!(
            "{} {} (id, content) SELECT id, content FROM {} WHERE id IN ({})",
            dialect.insert_ignore(),
            dialect.quote_ident(archive_table),
            dialect.quote_ident(pending_table),
            id_list
        );
        self.store.raw_query(&copy).map_err(to_error)?;

        let delete = format!(
            "DELETE FROM {} WHERE id IN ({})",
            dialect.quote_ident(pending_table),
            id_list
        );
        Ok(self.store.raw_query(&delete).map_err(to_error)?.affected_rows())
    }

    /// Archive everything left in the pending table. Returns rows deleted.
    fn archive_remaining(&self, pending_table: &str, archive_table: &str) -> Result<u64> {
        let dialect = self.dialect();
        let to_error = |source: StoreError| FlattenError::Archive {
            table: archive_table.to_string(),
            source,
        };

        let count_sql = format!("SELECT COUNT(*) AS count FROM {}", dialect.quote_ident(pending_table));
        let remaining = self
            .store
            .raw_query(&count_sql)
            .map_err(to_error)?
            .into_rows()
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        if remaining == 0 {
            return Ok(0);
        }

        info!(remaining, "archiving records that did not match the filter");
        let copy = format!(
            "{} {} (id, content) SELECT id, content FROM {}",
            dialect.insert_ignore(),
            dialect.quote_ident(archive_table),
            dialect.quote_ident(pending_table)
        );
        self.store.raw_query(&copy).map_err(to_error)?;

        let delete = format!("DELETE FROM {}", dialect.quote_ident(pending_table));
        let archived = self.store.raw_query(&delete).map_err(to_error)?.affected_rows();
        info!(archived, archive = archive_table, "archived unmatched records");
        Ok(archived)
    }
}

fn build_plans<'a>(
    order: &'a [String],
    job: &'a FlattenJob,
    relationships: &'a [TableRelationship],
) -> Vec<TablePlan<'a>> {
    order
        .iter()
        .map(|name| TablePlan {
            name: name.as_str(),
            mappings: job.mappings.iter().filter(|m| &m.target_table == name).collect(),
            definition: job.tables.iter().find(|t| &t.name == name),
            parents: relationships.iter().filter(|r| &r.child_table == name).collect(),
        })
        .collect()
}

/// Column values for one table of one record, mapped values first and
/// foreign keys after (a foreign key overrides a mapping on the same column)
fn row_values(plan: &TablePlan<'_>, document: &Value, generated_ids: &HashMap<&str, i64>) -> Vec<(String, Value)> {
    let mut columns: Vec<(String, Value)> = Vec::new();

    for mapping in &plan.mappings {
        let mut value = extract_value(document, &mapping.source_path);

        let is_temporal = plan
            .definition
            .and_then(|t| t.column(&mapping.target_column))
            .map(|c| is_date_time_type(&c.sql_type))
            .unwrap_or(false);
        if is_temporal {
            value = normalize_timestamp(value);
        }

        set_column(&mut columns, &mapping.target_column, value);
    }

    for rel in &plan.parents {
        match generated_ids.get(rel.parent_table.as_str()) {
            Some(&parent_id) => {
                debug!(
                    table = plan.name,
                    column = %rel.foreign_key_column,
                    parent = %rel.parent_table,
                    parent_id,
                    "setting foreign key"
                );
                set_column(&mut columns, &rel.foreign_key_column, Value::from(parent_id));
            }
            None => {
                warn!(
                    parent = %rel.parent_table,
                    child = plan.name,
                    "missing parent id, foreign key column omitted"
                );
            }
        }
    }

    columns
}

fn set_column(columns: &mut Vec<(String, Value)>, name: &str, value: Value) {
    match columns.iter_mut().find(|(c, _)| c == name) {
        Some(slot) => slot.1 = value,
        None => columns.push((name.to_string(), value)),
    }
}

fn display_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{ColumnDefinition, ConditionOperator, WhereCondition};
    use serde_json::json;

    fn store_with_pending(docs: &[Value]) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .raw_query("CREATE TABLE events_toprocess (id INTEGER PRIMARY KEY, content TEXT)")
            .unwrap();
        store
            .raw_query("CREATE TABLE events (id INTEGER PRIMARY KEY, content TEXT)")
            .unwrap();
        for (i, doc) in docs.iter().enumerate() {
            store
                .query(
                    "INSERT INTO events_toprocess (id, content) VALUES (?, ?)",
                    &[json!(i + 1), json!(doc.to_string())],
                )
                .unwrap();
        }
        store
    }

    fn count(store: &SqliteStore, table: &str) -> u64 {
        store
            .query(&format!("SELECT COUNT(*) AS n FROM {}", table), &[])
            .unwrap()[0]["n"]
            .as_u64()
            .unwrap()
    }

    fn users_table() -> TableDefinition {
        TableDefinition::new(
            "users",
            vec![
                ColumnDefinition::new("id", "INT").primary_key(),
                ColumnDefinition::new("name", "VARCHAR(255)"),
                ColumnDefinition::new("signed_up", "DATETIME"),
            ],
        )
        .marked_new()
    }

    fn orders_table() -> TableDefinition {
        TableDefinition::new(
            "orders",
            vec![
                ColumnDefinition::new("id", "INT").primary_key(),
                ColumnDefinition::new("user_id", "INT"),
                ColumnDefinition::new("amount", "DECIMAL(10,2)").not_null(),
            ],
        )
        .marked_new()
    }

    fn user_order_job() -> FlattenJob {
        FlattenJob::new(
            "events",
            vec![orders_table(), users_table()],
            vec![
                FieldMapping::new("name", "users", "name"),
                FieldMapping::new("ts", "users", "signed_up"),
                FieldMapping::new("amount", "orders", "amount"),
            ],
        )
    }

    #[test]
    fn test_create_tables_only_new_and_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let executor = Executor::new(&store);
        let existing = TableDefinition::new("legacy", vec![ColumnDefinition::new("id", "INT")]);

        let created = executor
            .create_tables(&[users_table(), existing.clone(), orders_table()])
            .unwrap();
        assert_eq!(created, vec!["users", "orders"]);

        let again = executor.create_tables(&[users_table()]).unwrap();
        assert_eq!(again, vec!["users"]);
        assert!(store.raw_query("SELECT * FROM legacy").is_err());
    }

    #[test]
    fn test_create_table_failure_aborts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let executor = Executor::new(&store);
        let broken = TableDefinition::new("broken", vec![]).marked_new();

        match executor.create_tables(&[users_table(), broken, orders_table()]) {
            Err(FlattenError::TableCreation { table, .. }) => assert_eq!(table, "broken"),
            other => panic!("expected table creation error, got {:?}", other),
        }
        assert_eq!(count(&store, "users"), 0);
        assert!(store.raw_query("SELECT * FROM orders").is_err());
    }

    #[test]
    fn test_flatten_propagates_parent_id() {
        let store = store_with_pending(&[
            json!({"name": "Alice", "amount": 9.99, "ts": 1700000000}),
            json!({"name": "Bob", "amount": 5}),
        ]);
        let executor = Executor::new(&store);

        let result = executor.execute(&user_order_job()).unwrap();
        assert_eq!(result.tables_created, vec!["orders", "users"]);
        assert_eq!(result.processed, 2);
        assert_eq!(result.moved, 2);
        assert!(result.errors.is_empty());

        let orders = store
            .query("SELECT user_id, amount FROM orders ORDER BY id", &[])
            .unwrap();
        assert_eq!(orders[0]["user_id"], 1);
        assert_eq!(orders[0]["amount"], 9.99);
        assert_eq!(orders[1]["user_id"], 2);

        let users = store
            .query("SELECT signed_up FROM users WHERE name = ?", &[json!("Alice")])
            .unwrap();
        assert_eq!(users[0]["signed_up"], "2023-11-14 22:13:20");

        assert_eq!(count(&store, "events_toprocess"), 0);
        assert_eq!(count(&store, "events"), 2);
    }

    #[test]
    fn test_failed_record_is_archived_with_translated_error() {
        let store = store_with_pending(&[json!({"name": "Alice"})]);
        let executor = Executor::new(&store);

        let result = executor.execute(&user_order_job()).unwrap();
        assert_eq!(result.processed, 0);
        assert_eq!(result.moved, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Record 1: "));
        assert!(result.errors[0].contains("Required field 'amount' in orders is missing"));

        assert_eq!(count(&store, "users"), 1);
        assert_eq!(count(&store, "orders"), 0);
        assert_eq!(count(&store, "events"), 1);
    }

    #[test]
    fn test_invalid_content_is_a_record_error() {
        let store = store_with_pending(&[]);
        store
            .raw_query("INSERT INTO events_toprocess (id, content) VALUES (7, '{broken')")
            .unwrap();
        let executor = Executor::new(&store);

        let result = executor.execute(&user_order_job()).unwrap();
        assert_eq!(result.processed, 0);
        assert_eq!(result.moved, 1);
        assert!(result.errors[0].starts_with("Record 7: content is not valid JSON"));
    }

    #[test]
    fn test_cycle_aborts_before_reading() {
        let store = store_with_pending(&[json!({"name": "Alice", "amount": 1})]);
        let executor = Executor::new(&store);
        let rel = |parent: &str, child: &str| TableRelationship {
            parent_table: parent.to_string(),
            child_table: child.to_string(),
            foreign_key_column: format!("{}_id", parent),
            parent_key_column: "id".to_string(),
        };
        let job = user_order_job().with_relationships(vec![rel("users", "orders"), rel("orders", "users")]);

        assert!(matches!(
            executor.flatten_records(&job),
            Err(FlattenError::CircularDependency { .. })
        ));
        assert_eq!(count(&store, "events_toprocess"), 1);
    }

    #[test]
    fn test_missing_pending_table_is_fatal() {
        let store = SqliteStore::open_in_memory().unwrap();
        let executor = Executor::new(&store);
        let job = FlattenJob::new("nothing", vec![], vec![]);

        assert!(matches!(
            executor.flatten_records(&job),
            Err(FlattenError::BatchRead { .. })
        ));
    }

    #[test]
    fn test_invalid_job_is_rejected() {
        let store = store_with_pending(&[]);
        let executor = Executor::new(&store);

        assert!(matches!(
            executor.execute(&user_order_job().with_batch_size(0)),
            Err(FlattenError::InvalidJob(_))
        ));
        assert!(store.raw_query("SELECT * FROM users").is_err());
    }

    #[test]
    fn test_unmatched_records_are_drained() {
        let store = store_with_pending(&[
            json!({"name": "Alice", "amount": 1, "kind": "keep"}),
            json!({"name": "Bob", "amount": 2, "kind": "skip"}),
            json!({"name": "Cy", "amount": 3, "kind": "keep"}),
        ]);
        let executor = Executor::new(&store);
        executor.create_tables(&[users_table(), orders_table()]).unwrap();

        let job = user_order_job().with_conditions(vec![WhereCondition::new(
            "kind",
            ConditionOperator::Eq,
            Some(json!("keep")),
        )]);

        let result = executor.flatten_records(&job).unwrap();
        assert_eq!(result.processed, 2);
        assert_eq!(result.moved, 3);
        assert_eq!(count(&store, "users"), 2);
        assert_eq!(count(&store, "events_toprocess"), 0);
        assert_eq!(count(&store, "events"), 3);
    }

    #[test]
    fn test_filter_matches_numbers_given_as_text() {
        let store = store_with_pending(&[
            json!({"name": "Alice", "amount": 1, "version": 2}),
            json!({"name": "Bob", "amount": 2, "version": 3}),
            json!({"name": "Cy", "amount": 3, "version": 4}),
        ]);
        let executor = Executor::new(&store);
        executor.create_tables(&[users_table(), orders_table()]).unwrap();

        let job = user_order_job().with_conditions(vec![WhereCondition::new(
            "version",
            ConditionOperator::Eq,
            Some(json!("2")),
        )]);
        let result = executor.flatten_records(&job).unwrap();
        assert_eq!(result.processed, 1);
        assert_eq!(result.moved, 3);

        let users = store.query("SELECT name FROM users", &[]).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["name"], "Alice");
    }

    #[test]
    fn test_in_filter_selects_batch() {
        let store = store_with_pending(&[
            json!({"name": "Alice", "amount": 1, "region": "eu", "tier": 1}),
            json!({"name": "Bob", "amount": 2, "region": "us", "tier": 2}),
            json!({"name": "Cy", "amount": 3, "region": "apac", "tier": 1}),
        ]);
        let executor = Executor::new(&store);
        executor.create_tables(&[users_table(), orders_table()]).unwrap();

        let job = user_order_job().with_conditions(vec![
            WhereCondition::new("region", ConditionOperator::In, Some(json!(["eu", "apac"]))),
            WhereCondition::new("tier", ConditionOperator::In, Some(json!(["1", 9]))),
        ]);
        let result = executor.flatten_records(&job).unwrap();
        assert_eq!(result.processed, 2);
        assert_eq!(result.moved, 3);

        let names: Vec<Value> = store
            .query("SELECT name FROM users ORDER BY id", &[])
            .unwrap()
            .into_iter()
            .map(|mut row| row.remove("name").unwrap())
            .collect();
        assert_eq!(names, vec![json!("Alice"), json!("Cy")]);
    }

    #[test]
    fn test_non_integer_primary_key_is_created_as_declared() {
        let store = SqliteStore::open_in_memory().unwrap();
        let executor = Executor::new(&store);
        let devices = TableDefinition::new(
            "devices",
            vec![
                ColumnDefinition::new("serial", "VARCHAR(36)").primary_key(),
                ColumnDefinition::new("label", "VARCHAR(255)"),
            ],
        )
        .marked_new();
        executor.create_tables(&[devices]).unwrap();

        store
            .raw_query("INSERT INTO devices (serial, label) VALUES ('ab-12', 'x')")
            .unwrap();
        let rows = store.query("SELECT serial FROM devices", &[]).unwrap();
        assert_eq!(rows[0]["serial"], "ab-12");
        assert!(store
            .raw_query("INSERT INTO devices (serial, label) VALUES ('ab-12', 'y')")
            .is_err());
    }

    #[test]
    fn test_batch_size_limits_read_but_not_cleanup() {
        let docs: Vec<Value> = (0..5).map(|i| json!({"name": format!("u{}", i), "amount": i})).collect();
        let store = store_with_pending(&docs);
        let executor = Executor::new(&store);
        executor.create_tables(&[users_table(), orders_table()]).unwrap();

        let result = executor.flatten_records(&user_order_job().with_batch_size(2)).unwrap();
        assert_eq!(result.processed, 2);
        assert_eq!(result.moved, 5);
        assert_eq!(count(&store, "orders"), 2);
    }

    #[test]
    fn test_archive_is_idempotent() {
        let store = store_with_pending(&[json!({"name": "Alice", "amount": 1})]);
        store
            .raw_query(r#"INSERT INTO events (id, content) VALUES (1, '{"name": "Alice"}')"#)
            .unwrap();
        let executor = Executor::new(&store);

        let result = executor.execute(&user_order_job()).unwrap();
        assert_eq!(result.moved, 1);
        assert_eq!(count(&store, "events"), 1);
        assert_eq!(count(&store, "events_toprocess"), 0);
    }

    #[test]
    fn test_tables_without_mappings_are_skipped() {
        let store = store_with_pending(&[json!({"name": "Alice"})]);
        let executor = Executor::new(&store);
        let job = FlattenJob::new(
            "events",
            vec![users_table(), orders_table()],
            vec![FieldMapping::new("name", "users", "name")],
        );

        let result = executor.execute(&job).unwrap();
        assert_eq!(result.processed, 1);
        assert_eq!(count(&store, "orders"), 0);
    }

    #[test]
    fn test_empty_pending_table() {
        let store = store_with_pending(&[]);
        let executor = Executor::new(&store);

        let result = executor.execute(&user_order_job()).unwrap();
        assert_eq!(result.processed, 0);
        assert_eq!(result.moved, 0);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_row_values_foreign_key_overrides_mapping() {
        let job = FlattenJob::new(
            "events",
            vec![orders_table()],
            vec![
                FieldMapping::new("order.user", "orders", "user_id"),
                FieldMapping::new("order.total", "orders", "amount"),
            ],
        );
        let rels = vec![TableRelationship {
            parent_table: "users".to_string(),
            child_table: "orders".to_string(),
            foreign_key_column: "user_id".to_string(),
            parent_key_column: "id".to_string(),
        }];
        let order = vec!["orders".to_string()];
        let plans = build_plans(&order, &job, &rels);
        let doc = json!({"order": {"user": 99, "total": [12.5, 3]}});

        let mut ids = HashMap::new();
        assert_eq!(
            row_values(&plans[0], &doc, &ids),
            vec![
                ("user_id".to_string(), json!(99)),
                ("amount".to_string(), json!(12.5)),
            ]
        );

        ids.insert("users", 4);
        assert_eq!(row_values(&plans[0], &doc, &ids)[0], ("user_id".to_string(), json!(4)));
    }
}
