use crate::store::{Dialect, RawOutcome, Row, Store, StoreError};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Statement};
use serde_json::{Map, Number, Value};
use std::path::Path;

/// [`Store`] backed by an SQLite database (JSON1 functions are compiled in)
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(SqliteStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Store for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let bound: Vec<SqlValue> = params.iter().map(to_sql_value).collect();

        if stmt.column_count() == 0 {
            stmt.execute(params_from_iter(bound))?;
            return Ok(Vec::new());
        }

        collect_rows(&mut stmt, bound)
    }

    fn raw_query(&self, sql: &str) -> Result<RawOutcome, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;

        if stmt.column_count() > 0 {
            return collect_rows(&mut stmt, Vec::new()).map(RawOutcome::Rows);
        }

        let affected_rows = stmt.execute([])? as u64;
        let is_insert = sql
            .trim_start()
            .get(..6)
            .map(|head| head.eq_ignore_ascii_case("insert"))
            .unwrap_or(false);
        let insert_id = if is_insert && affected_rows > 0 {
            Some(self.conn.last_insert_rowid())
        } else {
            None
        };

        Ok(RawOutcome::Mutation {
            insert_id,
            affected_rows,
        })
    }
}

fn collect_rows(stmt: &mut Statement<'_>, params: Vec<SqlValue>) -> Result<Vec<Row>, StoreError> {
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(params))?;
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        let mut map = Map::new();
        for (idx, name) in names.iter().enumerate() {
            map.insert(name.clone(), from_sql_ref(row.get_ref(idx)?));
        }
        out.push(map);
    }

    Ok(out)
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn from_sql_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            Value::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mutation_reports_insert_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .raw_query("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)")
            .unwrap();

        let first = store.raw_query("INSERT INTO t (name) VALUES ('a')").unwrap();
        let second = store.raw_query("INSERT INTO t (name) VALUES ('b')").unwrap();
        assert_eq!(first.insert_id(), Some(1));
        assert_eq!(second.insert_id(), Some(2));

        let deleted = store.raw_query("DELETE FROM t").unwrap();
        assert_eq!(deleted.affected_rows(), 2);
        assert_eq!(deleted.insert_id(), None);
    }

    #[test]
    fn test_query_binds_params() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .raw_query("CREATE TABLE docs (id INTEGER PRIMARY KEY, content TEXT)")
            .unwrap();
        store
            .raw_query(r#"INSERT INTO docs (id, content) VALUES (1, '{"kind": "a", "n": 3}')"#)
            .unwrap();

        let rows = store
            .query(
                "SELECT id, json_extract(content, ?) AS n FROM docs WHERE json_extract(content, ?) = ?",
                &[json!("$.n"), json!("$.kind"), json!("a")],
            )
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], 1);
        assert_eq!(rows[0]["n"], 3);
    }

    #[test]
    fn test_error_message_is_verbatim() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .raw_query("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .unwrap();

        let err = store.raw_query("INSERT INTO t (name) VALUES (NULL)").unwrap_err();
        assert!(err.message.contains("NOT NULL constraint failed: t.name"));
    }
}
