//! Column filter system
//!
//! Filter values arrive from filter widgets as tagged JSON objects, are
//! translated into query predicates per column, and are summarized as chip
//! labels for the active-filter bar.
//!
//! ## Usage
//!
//! ```
//! use datatable::domain::columns::{ColumnDescriptor, ValueType};
//! use datatable::domain::filters::{parse_filters, translate};
//!
//! let columns = vec![ColumnDescriptor::new("amount", ValueType::Number)];
//! let filters = parse_filters(r#"{"amount": {"type": "range", "from": 100, "to": 500}}"#, &columns).unwrap();
//! let condition = translate(&columns[0], &filters["amount"]).unwrap();
//! assert_eq!(condition.to_string(), "amount BETWEEN 100 AND 500");
//! ```

mod label;
mod parser;
mod translate;
mod types;

pub use label::filter_label;
pub use parser::{FilterParseError, parse_filters};
pub use translate::translate;
pub use types::{DistinctValue, FilterMetadata, FilterOperator, FilterValue};
