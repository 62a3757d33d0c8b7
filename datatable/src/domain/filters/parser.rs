//! Filter parsing
//!
//! Parses the JSON object a table UI keeps for its column filters
//! (`{"<column id>": <filter value>}`) with size limits.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use super::types::FilterValue;
use crate::domain::columns::{ColumnDescriptor, find_column};

/// Maximum size of filter JSON in bytes (64KB)
const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;

/// Maximum number of filters allowed
const MAX_FILTERS: usize = 50;

#[derive(Error, Debug)]
pub enum FilterParseError {
    #[error("Filter JSON exceeds maximum size of {max} bytes")]
    TooLarge { max: usize },

    #[error("Invalid filter JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Filter JSON must be an object keyed by column id")]
    NotAnObject,

    #[error("Maximum {max} filters allowed")]
    TooMany { max: usize },
}

/// Parse column filters from JSON
///
/// Filters for unknown columns and null entries are dropped. A bare scalar
/// is shorthand for an `equals` filter on that value.
pub fn parse_filters(
    json_str: &str,
    columns: &[ColumnDescriptor],
) -> Result<BTreeMap<String, FilterValue>, FilterParseError> {
    if json_str.len() > MAX_FILTER_JSON_SIZE {
        return Err(FilterParseError::TooLarge {
            max: MAX_FILTER_JSON_SIZE,
        });
    }

    let Value::Object(raw) = serde_json::from_str::<Value>(json_str)? else {
        return Err(FilterParseError::NotAnObject);
    };

    if raw.len() > MAX_FILTERS {
        return Err(FilterParseError::TooMany { max: MAX_FILTERS });
    }

    let mut filters = BTreeMap::new();
    for (column_id, value) in raw {
        if find_column(columns, &column_id).is_none() {
            tracing::debug!(column = %column_id, "Ignoring filter for unknown column");
            continue;
        }
        let filter = match value {
            Value::Null => continue,
            Value::Object(_) => serde_json::from_value(value)?,
            Value::Array(values) => FilterValue::MultiSelect { values },
            scalar => FilterValue::Equals { value: scalar },
        };
        filters.insert(column_id, filter);
    }

    Ok(filters)
}
