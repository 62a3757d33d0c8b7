//! Active-filter chip labels

use serde_json::Value;

use super::types::{FilterValue, range_bound};
use crate::domain::columns::{ColumnDescriptor, ValueType};
use crate::utils::time::format_short_date;

/// Human-readable summary of an active filter, e.g. `amount: 100 to 500`
pub fn filter_label(column: &ColumnDescriptor, value: &FilterValue) -> String {
    let name = &column.id;
    match value {
        FilterValue::Range { from, to } => {
            let from = range_bound(from.as_ref());
            let to = range_bound(to.as_ref());
            if column.value_type == ValueType::Date {
                let from = from.and_then(format_short_date).unwrap_or_else(|| "start".to_string());
                let to = to.and_then(format_short_date).unwrap_or_else(|| "end".to_string());
                format!("{name}: {from} to {to}")
            } else {
                let from = from.map(display).unwrap_or_else(|| "min".to_string());
                let to = to.map(display).unwrap_or_else(|| "max".to_string());
                format!("{name}: {from} to {to}")
            }
        }
        FilterValue::Equals { value } | FilterValue::Select { value } | FilterValue::Contains { value }
            if !value.is_null() =>
        {
            format!("{name}: {}", display(value))
        }
        FilterValue::Comparison {
            value,
            operator: Some(op),
        } if !value.is_null() => {
            format!("{name}: {} {}", op.to_comparison_op().as_sql(), display(value))
        }
        FilterValue::MultiSelect { values } if !values.is_empty() => {
            format!("{name}: {} selected", values.len())
        }
        FilterValue::Toggle { value: Some(b) } => format!("{name}: {b}"),
        _ => format!("{name}: filtered"),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn label(column: &ColumnDescriptor, value: serde_json::Value) -> String {
        filter_label(column, &serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_numeric_range_labels() {
        let amount = ColumnDescriptor::new("amount", ValueType::Number);
        assert_eq!(label(&amount, json!({"type": "range", "from": 100, "to": 500})), "amount: 100 to 500");
        assert_eq!(label(&amount, json!({"type": "range", "from": 100})), "amount: 100 to max");
        assert_eq!(label(&amount, json!({"type": "range", "to": 500})), "amount: min to 500");
    }

    #[test]
    fn test_date_range_labels() {
        let created = ColumnDescriptor::new("created", ValueType::Date);
        assert_eq!(
            label(&created, json!({"type": "range", "from": "2024-01-01"})),
            "created: Jan 1 to end"
        );
        assert_eq!(
            label(&created, json!({"type": "range", "from": "2024-01-01", "to": "2024-02-15T12:00:00Z"})),
            "created: Jan 1 to Feb 15"
        );
        assert_eq!(
            label(&created, json!({"type": "range", "to": "2024-12-31"})),
            "created: start to Dec 31"
        );
    }

    #[test]
    fn test_value_labels() {
        let status = ColumnDescriptor::new("status", ValueType::String);
        assert_eq!(label(&status, json!({"type": "equals", "value": "pending"})), "status: pending");
        assert_eq!(label(&status, json!({"type": "contains", "value": "foo"})), "status: foo");
        assert_eq!(
            label(&status, json!({"type": "multi-select", "values": ["a", "b"]})),
            "status: 2 selected"
        );
    }

    #[test]
    fn test_comparison_and_toggle_labels() {
        let amount = ColumnDescriptor::new("amount", ValueType::Number);
        assert_eq!(
            label(&amount, json!({"type": "comparison", "value": 5, "operator": ">="})),
            "amount: >= 5"
        );
        let active = ColumnDescriptor::new("active", ValueType::Boolean);
        assert_eq!(label(&active, json!({"type": "toggle", "value": true})), "active: true");
    }

    #[test]
    fn test_fallback_label() {
        let status = ColumnDescriptor::new("status", ValueType::String);
        assert_eq!(label(&status, json!({"type": "whatever"})), "status: filtered");
        assert_eq!(label(&status, json!({"type": "multi-select"})), "status: filtered");
    }
}
