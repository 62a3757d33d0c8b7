//! Table domain
//!
//! - `columns` - column descriptors and their default filter kinds
//! - `filters` - filter values, predicate translation, parsing and labels
//! - `compose` - table state to data/count query composition
//! - `metadata` - per-column statistics for filter widgets

pub mod columns;
pub mod compose;
pub mod filters;
pub mod metadata;

pub use columns::{ColumnDescriptor, FilterType, ValueType, find_column, infer_columns};
pub use compose::{
    ComposedQuery, Pagination, SortEntry, TablePage, TableState, compose, compose_and_execute,
};
pub use filters::{
    DistinctValue, FilterMetadata, FilterOperator, FilterParseError, FilterValue, filter_label,
    parse_filters, translate,
};
pub use metadata::{MetadataConfig, MetadataService};
