//! Column descriptors
//!
//! Descriptors are supplied by the rendering layer and read by everything
//! else: the translator uses the value type to coerce operands, the metadata
//! service picks its aggregate strategy from it, and the composer resolves
//! filters to columns by id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::source::Row;
use crate::utils::time::parse_timestamp;

/// Semantic type of a column's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Date,
    Boolean,
    /// Row action buttons; never filterable
    #[serde(alias = "actions")]
    Action,
}

impl ValueType {
    /// Filter kind used when a column does not override it
    pub fn default_filter_type(&self) -> FilterType {
        match self {
            ValueType::String => FilterType::Contains,
            ValueType::Number | ValueType::Date => FilterType::Range,
            ValueType::Boolean => FilterType::Toggle,
            ValueType::Action => FilterType::None,
        }
    }
}

/// Filter widget kind for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterType {
    Equals,
    Contains,
    Range,
    Select,
    MultiSelect,
    Comparison,
    Toggle,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub id: String,
    #[serde(alias = "type")]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<FilterType>,
    /// Display format hint (e.g. `0,0.00`), passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(id: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: id.into(),
            value_type,
            filterable: None,
            filter_type: None,
            format: None,
        }
    }

    pub fn with_filter_type(mut self, filter_type: FilterType) -> Self {
        self.filter_type = Some(filter_type);
        self
    }

    pub fn with_filterable(mut self, filterable: bool) -> Self {
        self.filterable = Some(filterable);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Filter kind after applying the value-type default
    ///
    /// Action columns always resolve to `None`, whatever they override.
    pub fn effective_filter_type(&self) -> FilterType {
        if self.value_type == ValueType::Action {
            return FilterType::None;
        }
        self.filter_type
            .unwrap_or_else(|| self.value_type.default_filter_type())
    }

    /// Whether filters on this column produce predicates and get metadata
    pub fn is_filterable(&self) -> bool {
        self.filterable != Some(false) && self.effective_filter_type() != FilterType::None
    }
}

/// Find a column by id
pub fn find_column<'a>(columns: &'a [ColumnDescriptor], id: &str) -> Option<&'a ColumnDescriptor> {
    columns.iter().find(|c| c.id == id)
}

/// Derive descriptors from sample rows
///
/// Columns keep first-seen key order. Each column's type comes from its
/// first non-null value; strings that parse as timestamps are dates, and
/// columns with no non-null sample are strings.
pub fn infer_columns(rows: &[Row]) -> Vec<ColumnDescriptor> {
    let mut ids: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !ids.contains(&key.as_str()) {
                ids.push(key.as_str());
            }
        }
    }

    ids.into_iter()
        .map(|id| {
            let sample = rows
                .iter()
                .filter_map(|row| row.get(id))
                .find(|v| !v.is_null());
            let value_type = match sample {
                Some(Value::Bool(_)) => ValueType::Boolean,
                Some(Value::Number(_)) => ValueType::Number,
                Some(value @ Value::String(_)) if parse_timestamp(value).is_some() => ValueType::Date,
                _ => ValueType::String,
            };
            ColumnDescriptor::new(id, value_type)
        })
        .collect()
}
