//! Backing store contract
//!
//! The engine only ever talks to a [`Store`]: parameterized `query` for
//! filtered reads, and `raw_query` for statements whose identifiers and
//! literals have already been escaped through the store's [`Dialect`].

pub mod dialect;
pub mod sqlite;

pub use dialect::Dialect;
pub use sqlite::SqliteStore;

use serde_json::{Map, Value};
use thiserror::Error;

/// One result row, keyed by column name
pub type Row = Map<String, Value>;

/// Raw database failure. The message is kept verbatim so it can be
/// translated into a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        StoreError {
            message: message.into(),
        }
    }
}

/// What an unparameterized statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    Rows(Vec<Row>),
    Mutation {
        insert_id: Option<i64>,
        affected_rows: u64,
    },
}

impl RawOutcome {
    pub fn insert_id(&self) -> Option<i64> {
        match self {
            RawOutcome::Mutation { insert_id, .. } => *insert_id,
            RawOutcome::Rows(_) => None,
        }
    }

    pub fn affected_rows(&self) -> u64 {
        match self {
            RawOutcome::Mutation { affected_rows, .. } => *affected_rows,
            RawOutcome::Rows(_) => 0,
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            RawOutcome::Rows(rows) => rows,
            RawOutcome::Mutation { .. } => Vec::new(),
        }
    }
}

/// Synchronous access to the database holding the pending, archive and
/// destination tables.
pub trait Store {
    /// SQL flavour used to render statements for this store
    fn dialect(&self) -> Dialect;

    /// Parameterized statement; `?` placeholders are bound from `params`
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError>;

    /// Unparameterized statement returning rows or mutation metadata
    fn raw_query(&self, sql: &str) -> Result<RawOutcome, StoreError>;
}

impl<S: Store + ?Sized> Store for &S {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        (**self).query(sql, params)
    }

    fn raw_query(&self, sql: &str) -> Result<RawOutcome, StoreError> {
        (**self).raw_query(sql)
    }
}
