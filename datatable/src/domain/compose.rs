//! Query composition
//!
//! Turns a snapshot of table state into a page query and a parallel count
//! query. Both are built from the same filtered query value, so they carry
//! identical predicates by construction; only the page query is sorted and
//! paginated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::columns::{ColumnDescriptor, find_column};
use super::filters::{FilterValue, translate};
use crate::core::constants::DEFAULT_PAGE_SIZE;
use crate::data::cache::CacheKey;
use crate::data::error::DataError;
use crate::data::query::{Condition, Expr, SelectQuery, SortDirection};
use crate::data::source::{DataSource, RowSet, check_result_count};

/// One sort key; the first entry in a list is the primary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub id: String,
    #[serde(default)]
    pub desc: bool,
}

impl SortEntry {
    pub fn asc(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: false,
        }
    }

    pub fn desc(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: true,
        }
    }

    fn direction(&self) -> SortDirection {
        if self.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Zero-based page position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_index: u64,
    pub page_size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page_index: u64, page_size: u64) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page_index.saturating_mul(self.page_size)
    }

    /// Number of pages needed for `total` rows
    pub fn page_count(&self, total: u64) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            total.div_ceil(self.page_size)
        }
    }
}

/// Caller-owned table state; the composer only reads it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableState {
    pub sorting: Vec<SortEntry>,
    pub pagination: Pagination,
    pub filters: BTreeMap<String, FilterValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedQuery {
    /// Filtered, sorted and paginated rows
    pub data_query: SelectQuery,
    /// `SELECT COUNT(*) AS count` over the filtered rows
    pub count_query: SelectQuery,
    /// Predicates applied to both queries, in filter-map order
    pub predicates: Vec<Condition>,
    pub pagination: Pagination,
}

impl ComposedQuery {
    /// Key for caching this page's results against a dataset version
    pub fn cache_key(&self, content_hash: &str) -> String {
        CacheKey::table_page(content_hash, &self.data_query.to_sql())
    }
}

/// One page of results with the total row count under the same filters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage {
    pub rows: RowSet,
    pub total_count: u64,
    pub page_count: u64,
    pub pagination: Pagination,
}

/// Compose the page and count queries for `state`
///
/// Filters naming unknown columns, or columns that cannot be filtered, are
/// ignored. Composition never fails.
pub fn compose(base: &SelectQuery, columns: &[ColumnDescriptor], state: &TableState) -> ComposedQuery {
    let predicates: Vec<Condition> = state
        .filters
        .iter()
        .filter_map(|(column_id, value)| {
            let Some(column) = find_column(columns, column_id) else {
                tracing::debug!(column = %column_id, "Ignoring filter for unknown column");
                return None;
            };
            translate(column, value)
        })
        .collect();

    let filtered = predicates
        .iter()
        .cloned()
        .fold(filterable_base(base), SelectQuery::and_where);

    let count_query = SelectQuery::from_query(filtered.clone()).field(Expr::CountAll, "count");

    let pagination = state.pagination;
    let data_query = state
        .sorting
        .iter()
        .fold(filtered, |query, sort| {
            query.order_by(Expr::column(&sort.id), sort.direction())
        })
        .limit(pagination.page_size)
        .offset(pagination.offset());

    tracing::trace!(
        predicates = predicates.len(),
        data = %data_query,
        count = %count_query,
        "Composed table queries"
    );

    ComposedQuery {
        data_query,
        count_query,
        predicates,
        pagination,
    }
}

/// Base query that filters, sorting and paging can be appended to
///
/// Bases that already shape their output (grouping, ordering, limits) are
/// wrapped so new clauses apply to their result rows.
fn filterable_base(base: &SelectQuery) -> SelectQuery {
    let shaped = base.is_aggregate()
        || !base.grouping().is_empty()
        || !base.ordering().is_empty()
        || base.limit_rows().is_some()
        || base.offset_rows().is_some();
    if shaped {
        SelectQuery::from_query(base.clone())
    } else {
        base.clone()
    }
}

/// Execute a composed query pair in one round-trip
pub async fn compose_and_execute(
    source: &dyn DataSource,
    composed: &ComposedQuery,
) -> Result<TablePage, DataError> {
    let results = source
        .execute_queries(&[composed.data_query.clone(), composed.count_query.clone()])
        .await?;
    check_result_count(&results, 2)?;

    let mut results = results.into_iter();
    let rows = results.next().unwrap_or_default();
    let total_count = results
        .next()
        .and_then(|count_rows| count_rows.into_iter().next())
        .and_then(|row| row.get("count").and_then(Value::as_u64))
        .ok_or_else(|| DataError::Execution("count query returned no count".to_string()))?;

    Ok(TablePage {
        rows,
        total_count,
        page_count: composed.pagination.page_count(total_count),
        pagination: composed.pagination,
    })
}
