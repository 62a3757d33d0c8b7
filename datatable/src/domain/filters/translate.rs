//! Filter value to query predicate translation
//!
//! Translation is total: inactive values, unknown kinds and columns that
//! cannot be filtered all yield `None`, which callers treat as "no filter".
//!
//! Operand coercion depends on the column's value type. Date operands are
//! normalized to canonical ISO-8601 timestamps so date and string storage
//! compare consistently; numeric strings on number columns become numbers.
//!
//! `contains` matches case-insensitively with `%` and `_` in the input
//! taken literally. A range whose bounds are reversed is swapped so it
//! always describes `[min, max]`.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::types::{FilterOperator, FilterValue, range_bound};
use crate::data::query::{ComparisonOp, Condition};
use crate::domain::columns::{ColumnDescriptor, ValueType};
use crate::utils::time::{normalize_timestamp, parse_timestamp};

/// Translate a column's filter value into a predicate
pub fn translate(column: &ColumnDescriptor, value: &FilterValue) -> Option<Condition> {
    if !column.is_filterable() || !value.is_active() {
        return None;
    }
    let id = column.id.as_str();

    match value {
        FilterValue::Equals { value } | FilterValue::Select { value } => {
            Some(Condition::equal(id, coerce(column, value)))
        }
        FilterValue::Contains { .. } => value.needle().map(|needle| Condition::contains(id, &needle)),
        FilterValue::Range { from, to } => translate_range(column, from.as_ref(), to.as_ref()),
        FilterValue::MultiSelect { values } => Some(Condition::in_list(
            id,
            values.iter().map(|v| coerce(column, v)).collect(),
        )),
        FilterValue::Comparison { value, operator } => {
            let operator = (*operator)?;
            if operator == FilterOperator::Unknown {
                tracing::debug!(column = %id, "Unknown comparison operator, using equality");
            }
            Some(Condition::compare(
                id,
                operator.to_comparison_op(),
                coerce(column, value),
            ))
        }
        FilterValue::Toggle { value } => value.map(|b| Condition::equal(id, Value::Bool(b))),
        FilterValue::Unknown => None,
    }
}

fn translate_range(
    column: &ColumnDescriptor,
    from: Option<&Value>,
    to: Option<&Value>,
) -> Option<Condition> {
    let from = range_bound(from).map(|v| coerce(column, v));
    let to = range_bound(to).map(|v| coerce(column, v));
    let id = column.id.as_str();

    match (from, to) {
        (Some(from), Some(to)) => {
            if compare_bounds(&from, &to) == Some(Ordering::Greater) {
                Some(Condition::between(id, to, from))
            } else {
                Some(Condition::between(id, from, to))
            }
        }
        (Some(from), None) => Some(Condition::compare(id, ComparisonOp::Gte, from)),
        (None, Some(to)) => Some(Condition::compare(id, ComparisonOp::Lte, to)),
        (None, None) => None,
    }
}

/// Order two bounds when they are of comparable kinds
fn compare_bounds(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(x.cmp(y)),
        },
        _ => None,
    }
}

fn coerce(column: &ColumnDescriptor, value: &Value) -> Value {
    match (column.value_type, value) {
        (ValueType::Date, _) => normalize_timestamp(value),
        (ValueType::Number, Value::String(s)) => parse_number(s).unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = s.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::columns::FilterType;
    use serde_json::json;

    fn col(id: &str, value_type: ValueType) -> ColumnDescriptor {
        ColumnDescriptor::new(id, value_type)
    }

    fn sql(column: &ColumnDescriptor, value: serde_json::Value) -> Option<String> {
        let value: FilterValue = serde_json::from_value(value).unwrap();
        translate(column, &value).map(|c| c.to_string())
    }

    #[test]
    fn test_equals() {
        let status = col("status", ValueType::String);
        assert_eq!(
            sql(&status, json!({"type": "equals", "value": "pending"})).as_deref(),
            Some("status = 'pending'")
        );
    }

    #[test]
    fn test_select_behaves_like_equals() {
        let status = col("status", ValueType::String).with_filter_type(FilterType::Select);
        assert_eq!(
            sql(&status, json!({"type": "select", "value": "failed"})).as_deref(),
            Some("status = 'failed'")
        );
    }

    #[test]
    fn test_range_closed_interval() {
        let amount = col("amount", ValueType::Number);
        assert_eq!(
            sql(&amount, json!({"type": "range", "from": 100, "to": 500})).as_deref(),
            Some("amount BETWEEN 100 AND 500")
        );
    }

    #[test]
    fn test_range_one_sided() {
        let amount = col("amount", ValueType::Number);
        assert_eq!(
            sql(&amount, json!({"type": "range", "from": 10})).as_deref(),
            Some("amount >= 10")
        );
        assert_eq!(
            sql(&amount, json!({"type": "range", "to": 10})).as_deref(),
            Some("amount <= 10")
        );
        assert_eq!(
            sql(&amount, json!({"type": "range", "from": 5, "to": 10})).as_deref(),
            Some("amount BETWEEN 5 AND 10")
        );
    }

    #[test]
    fn test_range_zero_bound_is_kept() {
        let amount = col("amount", ValueType::Number);
        assert_eq!(
            sql(&amount, json!({"type": "range", "from": 0})).as_deref(),
            Some("amount >= 0")
        );
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        let amount = col("amount", ValueType::Number);
        assert_eq!(
            sql(&amount, json!({"type": "range", "from": 500, "to": 100})).as_deref(),
            Some("amount BETWEEN 100 AND 500")
        );

        let created = col("created", ValueType::Date);
        assert_eq!(
            sql(&created, json!({"type": "range", "from": "2024-03-01", "to": "2024-01-01"})).as_deref(),
            Some("created BETWEEN '2024-01-01T00:00:00.000Z' AND '2024-03-01T00:00:00.000Z'")
        );
    }

    #[test]
    fn test_date_range_is_normalized() {
        let created = col("created", ValueType::Date);
        assert_eq!(
            sql(&created, json!({"type": "range", "from": "2024-01-15T10:30:00+02:00"})).as_deref(),
            Some("created >= '2024-01-15T08:30:00.000Z'")
        );
    }

    #[test]
    fn test_numeric_strings_are_coerced_on_number_columns() {
        let amount = col("amount", ValueType::Number);
        assert_eq!(
            sql(&amount, json!({"type": "range", "from": "100", "to": "250.5"})).as_deref(),
            Some("amount BETWEEN 100 AND 250.5")
        );
        let name = col("name", ValueType::String).with_filter_type(FilterType::Range);
        assert_eq!(
            sql(&name, json!({"type": "range", "from": "100"})).as_deref(),
            Some("name >= '100'")
        );
    }

    #[test]
    fn test_contains_escapes_wildcards() {
        let email = col("email", ValueType::String);
        assert_eq!(
            sql(&email, json!({"type": "contains", "value": "foo"})).as_deref(),
            Some("email LIKE '%foo%'")
        );
        assert_eq!(
            sql(&email, json!({"type": "contains", "value": "50%"})).as_deref(),
            Some("email LIKE '%50\\%%' ESCAPE '\\'")
        );
    }

    #[test]
    fn test_multi_select() {
        let status = col("status", ValueType::String).with_filter_type(FilterType::MultiSelect);
        assert_eq!(
            sql(&status, json!({"type": "multi-select", "values": ["pending", "failed"]})).as_deref(),
            Some("status IN ('pending','failed')")
        );
    }

    #[test]
    fn test_comparison_operators() {
        let amount = col("amount", ValueType::Number).with_filter_type(FilterType::Comparison);
        for (op, expected) in [
            ("=", "amount = 3"),
            ("!=", "amount != 3"),
            (">", "amount > 3"),
            ("<", "amount < 3"),
            (">=", "amount >= 3"),
            ("<=", "amount <= 3"),
            ("like", "amount = 3"),
        ] {
            assert_eq!(
                sql(&amount, json!({"type": "comparison", "value": 3, "operator": op})).as_deref(),
                Some(expected),
                "operator {op}"
            );
        }
    }

    #[test]
    fn test_toggle() {
        let active = col("active", ValueType::Boolean);
        assert_eq!(
            sql(&active, json!({"type": "toggle", "value": false})).as_deref(),
            Some("active = FALSE")
        );
        assert_eq!(sql(&active, json!({"type": "toggle"})), None);
    }

    #[test]
    fn test_inactive_values_produce_nothing() {
        let status = col("status", ValueType::String);
        for raw in [
            json!({"type": "equals"}),
            json!({"type": "contains", "value": ""}),
            json!({"type": "range"}),
            json!({"type": "multi-select", "values": []}),
            json!({"type": "comparison", "value": 1}),
            json!({"type": "unheard-of", "value": 1}),
        ] {
            assert_eq!(sql(&status, raw.clone()), None, "{raw}");
        }
    }

    #[test]
    fn test_unfilterable_columns_produce_nothing() {
        let edit = col("edit", ValueType::Action);
        assert_eq!(sql(&edit, json!({"type": "equals", "value": "x"})), None);

        let hidden = col("status", ValueType::String).with_filterable(false);
        assert_eq!(sql(&hidden, json!({"type": "equals", "value": "x"})), None);
    }

    #[test]
    fn test_kind_follows_value_not_column_default() {
        // A string column defaults to contains but an equals value is exact
        let status = col("status", ValueType::String);
        assert_eq!(
            sql(&status, json!({"type": "equals", "value": "ok"})).as_deref(),
            Some("status = 'ok'")
        );
    }
}
