//! Column metadata service
//!
//! Computes the value domain of filterable columns (min/max, most frequent
//! values, null counts) with aggregate queries, so filter widgets never need
//! raw rows. Results are memoized per (base query signature, column) in a
//! single-flight cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;

use super::columns::{ColumnDescriptor, ValueType};
use super::filters::{DistinctValue, FilterMetadata};
use crate::core::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_DISTINCT_LIMIT};
use crate::data::cache::{CacheKey, CacheStats, MetadataCache};
use crate::data::error::DataError;
use crate::data::query::{Condition, Expr, SelectQuery, SortDirection};
use crate::data::source::{DataSource, Row, RowSet, check_result_count};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataConfig {
    pub ttl: Duration,
    /// Cap on distinct values returned for string columns
    pub distinct_values_limit: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            distinct_values_limit: DEFAULT_DISTINCT_LIMIT,
        }
    }
}

/// Aggregate strategy per value type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// min, max, non-null and total counts
    Range,
    /// capped value frequencies plus true cardinality
    Distinct,
    /// frequencies of true/false/null plus total count
    Boolean,
    /// non-null and total counts only
    Counts,
}

impl Strategy {
    fn for_type(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Number | ValueType::Date => Strategy::Range,
            ValueType::String => Strategy::Distinct,
            ValueType::Boolean => Strategy::Boolean,
            ValueType::Action => Strategy::Counts,
        }
    }
}

pub struct MetadataService {
    cache: Arc<MetadataCache<FilterMetadata, DataError>>,
    config: MetadataConfig,
    last_content_hash: Mutex<Option<String>>,
}

impl std::fmt::Debug for MetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataService")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

impl MetadataService {
    pub fn new(config: MetadataConfig) -> Self {
        Self::with_cache(Arc::new(MetadataCache::new(config.ttl)), config)
    }

    /// Build around an existing cache, e.g. one shared between services
    pub fn with_cache(cache: Arc<MetadataCache<FilterMetadata, DataError>>, config: MetadataConfig) -> Self {
        Self {
            cache,
            config,
            last_content_hash: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Metadata for one column under `base`, served from cache when fresh
    ///
    /// Failures are returned to every caller waiting on the fetch and are
    /// not cached.
    pub async fn fetch_metadata(
        &self,
        source: Arc<dyn DataSource>,
        base: &SelectQuery,
        column: &ColumnDescriptor,
    ) -> Result<FilterMetadata, DataError> {
        let key = CacheKey::column_metadata(&base.to_sql(), &column.id);
        let base = base.clone();
        let column = column.clone();
        let limit = self.config.distinct_values_limit;

        self.cache
            .get(&key, move || fetch_uncached(source, base, column, limit))
            .await
    }

    /// Metadata for every filterable column, fetched concurrently
    ///
    /// A column whose fetch fails maps to empty metadata; the failure is
    /// logged and does not affect the other columns.
    pub async fn fetch_all_metadata(
        &self,
        source: Arc<dyn DataSource>,
        base: &SelectQuery,
        columns: &[ColumnDescriptor],
    ) -> HashMap<String, FilterMetadata> {
        let fetches = columns
            .iter()
            .filter(|column| column.is_filterable())
            .map(|column| {
                let source = Arc::clone(&source);
                async move {
                    let metadata = match self.fetch_metadata(source, base, column).await {
                        Ok(metadata) => metadata,
                        Err(e) => {
                            tracing::warn!(column = %column.id, error = %e, "Failed to fetch column metadata");
                            FilterMetadata::default()
                        }
                    };
                    (column.id.clone(), metadata)
                }
            });

        join_all(fetches).await.into_iter().collect()
    }

    /// Drop cached metadata for one column under `base`, or everything
    pub fn invalidate_cache(&self, base: &SelectQuery, column_id: Option<&str>) {
        match column_id {
            Some(column_id) => {
                let key = CacheKey::column_metadata(&base.to_sql(), column_id);
                if self.cache.invalidate(&key) {
                    tracing::debug!(column = %column_id, "Invalidated column metadata");
                }
            }
            None => self.cache.clear(),
        }
    }

    /// Clear the cache if the source's data changed since the last call
    ///
    /// The first call only records the content hash. Returns whether the
    /// cache was cleared.
    pub fn invalidate_on_content_change(&self, source: &dyn DataSource) -> bool {
        let hash = source.content_hash();
        let mut last = self.last_content_hash.lock();
        let changed = last.as_ref().is_some_and(|previous| *previous != hash);
        if changed {
            tracing::info!(source = source.source_name(), "Dataset changed, clearing metadata cache");
            self.cache.clear();
        }
        *last = Some(hash);
        changed
    }
}

async fn fetch_uncached(
    source: Arc<dyn DataSource>,
    base: SelectQuery,
    column: ColumnDescriptor,
    distinct_limit: u64,
) -> Result<FilterMetadata, DataError> {
    let strategy = Strategy::for_type(column.value_type);
    let queries = metadata_queries(&base, &column.id, strategy, distinct_limit);
    tracing::debug!(
        column = %column.id,
        ?strategy,
        source = source.source_name(),
        "Fetching column metadata"
    );

    let results = source.execute_queries(&queries).await?;
    check_result_count(&results, queries.len())?;
    Ok(shape_metadata(strategy, results))
}

fn metadata_queries(base: &SelectQuery, column: &str, strategy: Strategy, distinct_limit: u64) -> Vec<SelectQuery> {
    let over_base = || SelectQuery::from_query(base.clone());
    match strategy {
        Strategy::Range => vec![
            over_base()
                .field(Expr::Min(column.to_string()), "min")
                .field(Expr::Max(column.to_string()), "max")
                .field(Expr::Count(column.to_string()), "nonNullCount")
                .field(Expr::CountAll, "totalCount"),
        ],
        Strategy::Distinct => vec![
            over_base()
                .field(Expr::column(column), "value")
                .field(Expr::CountAll, "count")
                .and_where(Condition::not_null(column))
                .group_by(column)
                .order_by(Expr::CountAll, SortDirection::Desc)
                .limit(distinct_limit),
            over_base()
                .field(Expr::CountDistinct(column.to_string()), "totalDistinct")
                .field(Expr::CountAll, "totalCount"),
        ],
        Strategy::Boolean => vec![
            over_base()
                .field(Expr::column(column), "value")
                .field(Expr::CountAll, "count")
                .group_by(column),
            over_base().field(Expr::CountAll, "totalCount"),
        ],
        Strategy::Counts => vec![
            over_base()
                .field(Expr::Count(column.to_string()), "nonNullCount")
                .field(Expr::CountAll, "totalCount"),
        ],
    }
}

fn shape_metadata(strategy: Strategy, results: Vec<RowSet>) -> FilterMetadata {
    let mut results = results.into_iter();
    let mut metadata = FilterMetadata::default();

    match strategy {
        Strategy::Range => {
            if let Some(row) = first_row(results.next()) {
                metadata.min = present(&row, "min");
                metadata.max = present(&row, "max");
                metadata.total_count = count(&row, "totalCount");
                metadata.null_count = null_count(&row);
            }
        }
        Strategy::Distinct => {
            metadata.distinct_values = results.next().map(distinct_values);
            if let Some(row) = first_row(results.next()) {
                metadata.total_distinct = count(&row, "totalDistinct");
                metadata.total_count = count(&row, "totalCount");
            }
        }
        Strategy::Boolean => {
            metadata.distinct_values = results.next().map(distinct_values);
            if let Some(row) = first_row(results.next()) {
                metadata.total_count = count(&row, "totalCount");
            }
        }
        Strategy::Counts => {
            if let Some(row) = first_row(results.next()) {
                metadata.total_count = count(&row, "totalCount");
                metadata.null_count = null_count(&row);
            }
        }
    }

    metadata
}

fn first_row(rows: Option<RowSet>) -> Option<Row> {
    rows.and_then(|rows| rows.into_iter().next())
}

fn present(row: &Row, key: &str) -> Option<Value> {
    row.get(key).filter(|v| !v.is_null()).cloned()
}

fn count(row: &Row, key: &str) -> Option<u64> {
    row.get(key).and_then(Value::as_u64)
}

fn null_count(row: &Row) -> Option<u64> {
    let total = count(row, "totalCount")?;
    let non_null = count(row, "nonNullCount")?;
    Some(total.saturating_sub(non_null))
}

fn distinct_values(rows: RowSet) -> Vec<DistinctValue> {
    rows.into_iter()
        .map(|mut row| DistinctValue {
            value: row.remove("value").unwrap_or(Value::Null),
            count: count(&row, "count").unwrap_or(0),
        })
        .collect()
}
