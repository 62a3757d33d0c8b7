//! Error type for query execution against a data source

use thiserror::Error;

/// Errors surfaced by a [`DataSource`](super::DataSource)
///
/// The type is `Clone` so a single failed fetch can be delivered to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// Query references a table the source does not hold
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Query is structurally valid but cannot be evaluated
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Source returned a different number of result sets than queries
    #[error("Expected {expected} result sets, got {actual}")]
    ResultCount { expected: usize, actual: usize },

    /// Backend failed while executing
    #[error("Query execution failed: {0}")]
    Execution(String),

    /// Background fetch task panicked or was cancelled
    #[error("Fetch aborted: {0}")]
    Aborted(String),
}

impl From<tokio::task::JoinError> for DataError {
    fn from(err: tokio::task::JoinError) -> Self {
        DataError::Aborted(err.to_string())
    }
}
