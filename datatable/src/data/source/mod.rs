//! Data source boundary
//!
//! A data source executes a batch of queries and returns one row set per
//! query, in order. It also exposes a content hash that changes whenever
//! the underlying dataset changes, so callers can key results on it.

mod delayed;
mod eval;
mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::DataError;
use super::query::SelectQuery;

pub use delayed::{DelayPolicy, DelayedDataSource};
pub use memory::StaticDataSource;

/// A single result row keyed by column (or alias) name
pub type Row = Map<String, Value>;

/// Rows returned for one query
pub type RowSet = Vec<Row>;

/// Executes queries against tabular data
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Execute queries in order, returning one row set per query
    async fn execute_queries(&self, queries: &[SelectQuery]) -> Result<Vec<RowSet>, DataError>;

    /// Execute a single query
    async fn execute(&self, query: &SelectQuery) -> Result<RowSet, DataError> {
        let results = self.execute_queries(std::slice::from_ref(query)).await?;
        check_result_count(&results, 1)?;
        Ok(results.into_iter().next().unwrap_or_default())
    }

    /// Token that changes whenever the underlying data changes
    fn content_hash(&self) -> String;

    /// Source name for debugging/logging
    fn source_name(&self) -> &'static str;
}

/// Verify a source honored the one-result-per-query contract
pub fn check_result_count(results: &[RowSet], expected: usize) -> Result<(), DataError> {
    if results.len() != expected {
        return Err(DataError::ResultCount {
            expected,
            actual: results.len(),
        });
    }
    Ok(())
}
