use crate::store::StoreError;
use thiserror::Error;

/// Errors that abort a whole run. Per-record insert failures never surface
/// here; they are translated and collected in `ExecutionResult::errors`.
#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("Circular dependency detected in table relationships (unresolved: {})", remaining.join(", "))]
    CircularDependency { remaining: Vec<String> },

    #[error("failed to create table `{table}`: {source}")]
    TableCreation {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to read pending records from `{table}`: {source}")]
    BatchRead {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to archive records into `{table}`: {source}")]
    Archive {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to sample documents from `{table}`: {source}")]
    Sample {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("invalid job: {0}")]
    InvalidJob(String),
}

pub type Result<T> = std::result::Result<T, FlattenError>;
