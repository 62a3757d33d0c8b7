//! Data layer
//!
//! - `query` - immutable query value model with a stable SQL signature
//! - `source` - the data source boundary and its in-memory implementation
//! - `cache` - single-flight TTL memoization for column metadata

pub mod cache;
pub mod error;
pub mod query;
pub mod source;

pub use cache::{CacheKey, CacheStats, MetadataCache};
pub use error::DataError;
pub use query::{ComparisonOp, Condition, Expr, Field, OrderBy, SelectQuery, SortDirection};
pub use source::{DataSource, DelayPolicy, DelayedDataSource, Row, RowSet, StaticDataSource};
