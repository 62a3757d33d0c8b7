//! Filter type definitions
//!
//! Defines the filter values produced by filter widgets and the per-column
//! metadata used to populate them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::query::ComparisonOp;

/// Filter value for one column, tagged by filter kind
///
/// Missing fields deserialize to their empty form so a half-filled widget
/// yields an inactive filter instead of a parse error. Unknown kinds land
/// in [`FilterValue::Unknown`] and never produce a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FilterValue {
    Equals {
        #[serde(default)]
        value: Value,
    },
    /// Single choice from a dropdown; behaves like `equals`
    Select {
        #[serde(default)]
        value: Value,
    },
    Contains {
        #[serde(default)]
        value: Value,
    },
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<Value>,
    },
    MultiSelect {
        #[serde(default)]
        values: Vec<Value>,
    },
    Comparison {
        #[serde(default)]
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<FilterOperator>,
    },
    Toggle {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<bool>,
    },
    #[serde(other)]
    Unknown,
}

/// Comparison operator chosen in a comparison widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    /// Unrecognized operator; compared as equality
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl FilterOperator {
    pub fn to_comparison_op(self) -> ComparisonOp {
        match self {
            FilterOperator::Eq | FilterOperator::Unknown => ComparisonOp::Eq,
            FilterOperator::Ne => ComparisonOp::Ne,
            FilterOperator::Gt => ComparisonOp::Gt,
            FilterOperator::Lt => ComparisonOp::Lt,
            FilterOperator::Gte => ComparisonOp::Gte,
            FilterOperator::Lte => ComparisonOp::Lte,
        }
    }
}

impl FilterValue {
    /// Whether the value carries enough input to constrain rows
    pub fn is_active(&self) -> bool {
        match self {
            FilterValue::Equals { value } | FilterValue::Select { value } => !value.is_null(),
            FilterValue::Contains { .. } => self.needle().is_some(),
            FilterValue::Range { from, to } => {
                range_bound(from.as_ref()).is_some() || range_bound(to.as_ref()).is_some()
            }
            FilterValue::MultiSelect { values } => !values.is_empty(),
            FilterValue::Comparison { value, operator } => !value.is_null() && operator.is_some(),
            FilterValue::Toggle { value } => value.is_some(),
            FilterValue::Unknown => false,
        }
    }

    /// Search text of a `contains` filter; empty input has none
    pub(crate) fn needle(&self) -> Option<String> {
        let FilterValue::Contains { value } = self else {
            return None;
        };
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

/// A range bound counts as present unless it is null or an empty string
pub(crate) fn range_bound(bound: Option<&Value>) -> Option<&Value> {
    bound.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

/// Statistics describing a column's value domain
///
/// Only the fields relevant to the column's type are populated. An absent
/// field means unknown, not zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    /// Most frequent values, ordered by count descending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_values: Option<Vec<DistinctValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_distinct: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl FilterMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistinctValue {
    pub value: Value,
    pub count: u64,
}
