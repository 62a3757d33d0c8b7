//! In-memory query evaluation
//!
//! Implements the subset of SQL the query model can express, with SQL
//! semantics where they matter for filtering and statistics:
//! - comparisons involving NULL are false
//! - `COUNT(col)`, `MIN` and `MAX` ignore NULLs
//! - aggregating without GROUP BY always yields exactly one row
//! - `LIKE` is ASCII case-insensitive (as in SQLite)
//! - values that both parse as timestamps (strings or epoch millis)
//!   compare chronologically

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use super::{Row, RowSet};
use crate::data::error::DataError;
use crate::data::query::{
    ComparisonOp, Condition, Expr, OrderBy, SelectQuery, SortDirection, Source,
};
use crate::utils::time::parse_timestamp;

/// Evaluate a query against named tables
pub(super) fn evaluate(
    tables: &HashMap<String, RowSet>,
    query: &SelectQuery,
) -> Result<RowSet, DataError> {
    let source: Cow<'_, [Row]> = match query.source() {
        Source::Table(name) => Cow::Borrowed(
            tables
                .get(name)
                .ok_or_else(|| DataError::UnknownTable(name.clone()))?
                .as_slice(),
        ),
        Source::Query(inner) => Cow::Owned(evaluate(tables, inner)?),
    };

    let filtered: Vec<&Row> = source
        .iter()
        .filter(|row| query.conditions().iter().all(|c| matches(c, row)))
        .collect();

    let rows = if query.is_aggregate() {
        evaluate_grouped(query, filtered)
    } else {
        evaluate_plain(query, filtered)?
    };

    let offset = query.offset_rows().unwrap_or(0) as usize;
    let limit = query.limit_rows().map(|l| l as usize).unwrap_or(usize::MAX);
    Ok(rows.into_iter().skip(offset).take(limit).collect())
}

fn evaluate_plain(query: &SelectQuery, rows: Vec<&Row>) -> Result<RowSet, DataError> {
    if let Some(entry) = query.ordering().iter().find(|o| o.expr.is_aggregate()) {
        return Err(DataError::InvalidQuery(format!(
            "cannot order by aggregate {} without grouping",
            entry.expr
        )));
    }

    let mut projected: Vec<(&Row, Row)> = rows
        .into_iter()
        .map(|row| {
            let out = if query.fields().is_empty() {
                row.clone()
            } else {
                query
                    .fields()
                    .iter()
                    .map(|field| (field.alias.clone(), eval_expr(&field.expr, &[row])))
                    .collect()
            };
            (row, out)
        })
        .collect();

    if !query.ordering().is_empty() {
        projected.sort_by(|(a_src, a_out), (b_src, b_out)| {
            compare_by(query.ordering(), |expr| {
                (order_key(expr, a_src, a_out), order_key(expr, b_src, b_out))
            })
        });
    }

    Ok(projected.into_iter().map(|(_, out)| out).collect())
}

fn order_key(expr: &Expr, source: &Row, projected: &Row) -> Value {
    match expr {
        Expr::Column(name) => source
            .get(name)
            .or_else(|| projected.get(name))
            .cloned()
            .unwrap_or(Value::Null),
        other => eval_expr(other, &[source]),
    }
}

fn evaluate_grouped(query: &SelectQuery, rows: Vec<&Row>) -> RowSet {
    let groups: Vec<Vec<&Row>> = if query.grouping().is_empty() {
        vec![rows]
    } else {
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        let mut groups: Vec<Vec<&Row>> = Vec::new();
        for row in rows {
            let key: Vec<String> = query
                .grouping()
                .iter()
                .map(|col| column_value(row, col).to_string())
                .collect();
            match index.get(&key) {
                Some(&i) => groups[i].push(row),
                None => {
                    index.insert(key, groups.len());
                    groups.push(vec![row]);
                }
            }
        }
        groups
    };

    let mut outputs: Vec<(Vec<&Row>, Row)> = groups
        .into_iter()
        .map(|group| {
            let out: Row = if query.fields().is_empty() {
                query
                    .grouping()
                    .iter()
                    .map(|col| (col.clone(), eval_expr(&Expr::column(col.as_str()), &group)))
                    .collect()
            } else {
                query
                    .fields()
                    .iter()
                    .map(|field| (field.alias.clone(), eval_expr(&field.expr, &group)))
                    .collect()
            };
            (group, out)
        })
        .collect();

    if !query.ordering().is_empty() {
        outputs.sort_by(|(a_rows, a_out), (b_rows, b_out)| {
            compare_by(query.ordering(), |expr| {
                (
                    group_order_key(expr, a_rows, a_out),
                    group_order_key(expr, b_rows, b_out),
                )
            })
        });
    }

    outputs.into_iter().map(|(_, out)| out).collect()
}

fn group_order_key(expr: &Expr, rows: &[&Row], out: &Row) -> Value {
    if let Expr::Column(name) = expr
        && let Some(value) = out.get(name)
    {
        return value.clone();
    }
    eval_expr(expr, rows)
}

fn compare_by<F>(ordering: &[OrderBy], mut keys: F) -> Ordering
where
    F: FnMut(&Expr) -> (Value, Value),
{
    for entry in ordering {
        let (a, b) = keys(&entry.expr);
        let ord = sort_cmp(&a, &b);
        let ord = match entry.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn column_value<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn eval_expr(expr: &Expr, rows: &[&Row]) -> Value {
    match expr {
        Expr::Column(name) => rows
            .first()
            .map(|row| column_value(row, name).clone())
            .unwrap_or(Value::Null),
        Expr::CountAll => Value::from(rows.len() as u64),
        Expr::Count(name) => Value::from(non_null(rows, name).count() as u64),
        Expr::CountDistinct(name) => {
            let mut seen: Vec<&Value> = Vec::new();
            for value in non_null(rows, name) {
                if !seen.iter().any(|s| values_equal(s, value)) {
                    seen.push(value);
                }
            }
            Value::from(seen.len() as u64)
        }
        Expr::Min(name) => extreme(rows, name, Ordering::Less),
        Expr::Max(name) => extreme(rows, name, Ordering::Greater),
    }
}

fn non_null<'a>(rows: &'a [&'a Row], column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    rows.iter()
        .map(move |row| column_value(row, column))
        .filter(|v| !v.is_null())
}

fn extreme(rows: &[&Row], column: &str, wanted: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for value in non_null(rows, column) {
        best = match best {
            None => Some(value),
            Some(current) => match compare_values(value, current) {
                Some(ord) if ord == wanted => Some(value),
                _ => Some(current),
            },
        };
    }
    best.cloned().unwrap_or(Value::Null)
}

/// Compare two non-null scalars of compatible types
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (parse_timestamp(a), parse_timestamp(b)) {
                (Some(ta), Some(tb)) => Some(ta.cmp(&tb)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        // Epoch millis against a timestamp string
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            Some(parse_timestamp(a)?.cmp(&parse_timestamp(b)?))
        }
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal)
}

/// Total order for sorting: NULLs first, then by type, then by value
fn sort_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    rank(a)
        .cmp(&rank(b))
        .then_with(|| compare_values(a, b).unwrap_or(Ordering::Equal))
}

fn matches(condition: &Condition, row: &Row) -> bool {
    match condition {
        Condition::Compare { column, op, value } => {
            let actual = column_value(row, column);
            if actual.is_null() || value.is_null() {
                return false;
            }
            let Some(ord) = compare_values(actual, value) else {
                return false;
            };
            match op {
                ComparisonOp::Eq => ord == Ordering::Equal,
                ComparisonOp::Ne => ord != Ordering::Equal,
                ComparisonOp::Gt => ord == Ordering::Greater,
                ComparisonOp::Lt => ord == Ordering::Less,
                ComparisonOp::Gte => ord != Ordering::Less,
                ComparisonOp::Lte => ord != Ordering::Greater,
            }
        }
        Condition::Between { column, from, to } => {
            let actual = column_value(row, column);
            matches!(
                compare_values(actual, from),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(
                compare_values(actual, to),
                Some(Ordering::Less | Ordering::Equal)
            )
        }
        Condition::Like { column, pattern } => match column_value(row, column) {
            Value::String(s) => like_match(pattern, s),
            Value::Number(n) => like_match(pattern, &n.to_string()),
            _ => false,
        },
        Condition::In { column, values } => {
            let actual = column_value(row, column);
            !actual.is_null() && values.iter().any(|v| values_equal(actual, v))
        }
        Condition::NotNull { column } => !column_value(row, column).is_null(),
        Condition::And(conditions) => conditions.iter().all(|c| matches(c, row)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LikeToken {
    AnySequence,
    AnyChar,
    Literal(char),
}

fn tokenize_like(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            '%' => LikeToken::AnySequence,
            '_' => LikeToken::AnyChar,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            other => LikeToken::Literal(other),
        };
        tokens.push(token);
    }
    tokens
}

/// Wildcard match with single-star backtracking
fn like_match(pattern: &str, text: &str) -> bool {
    let tokens = tokenize_like(pattern);
    let text: Vec<char> = text.chars().collect();

    let (mut t, mut p) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::AnySequence) => {
                star = Some((p, t));
                p += 1;
            }
            Some(LikeToken::AnyChar) => {
                p += 1;
                t += 1;
            }
            Some(LikeToken::Literal(c)) if c.eq_ignore_ascii_case(&text[t]) => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..]
        .iter()
        .all(|token| *token == LikeToken::AnySequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn orders() -> HashMap<String, RowSet> {
        let rows = vec![
            row(json!({"id": 1, "status": "pending", "amount": 120, "paid": false})),
            row(json!({"id": 2, "status": "failed", "amount": 80, "paid": false})),
            row(json!({"id": 3, "status": "pending", "amount": 500, "paid": true})),
            row(json!({"id": 4, "status": null, "amount": 40, "paid": null})),
            row(json!({"id": 5, "status": "paid", "amount": 700, "paid": true})),
        ];
        HashMap::from([("orders".to_string(), rows)])
    }

    fn ids(rows: &RowSet) -> Vec<i64> {
        rows.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[test]
    fn unknown_table_is_an_error() {
        let err = evaluate(&orders(), &SelectQuery::from_table("missing")).unwrap_err();
        assert_eq!(err, DataError::UnknownTable("missing".to_string()));
    }

    #[test]
    fn where_between_is_inclusive() {
        let query = SelectQuery::from_table("orders")
            .and_where(Condition::between("amount", json!(80), json!(500)));
        let rows = evaluate(&orders(), &query).unwrap();
        assert_eq!(ids(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn epoch_millis_compare_with_timestamp_strings() {
        let tables = HashMap::from([(
            "events".to_string(),
            vec![
                row(json!({"id": 1, "created": 1704067200000u64})),
                row(json!({"id": 2, "created": 1706745600000u64})),
                row(json!({"id": 3, "created": "2024-04-01T00:00:00.000Z"})),
            ],
        )]);

        let query = SelectQuery::from_table("events").and_where(Condition::between(
            "created",
            json!("2024-01-01T00:00:00.000Z"),
            json!("2024-03-01T00:00:00.000Z"),
        ));
        assert_eq!(ids(&evaluate(&tables, &query).unwrap()), vec![1, 2]);

        let query = SelectQuery::from_table("events").and_where(Condition::in_list(
            "created",
            vec![json!("2024-02-01T00:00:00.000Z")],
        ));
        assert_eq!(ids(&evaluate(&tables, &query).unwrap()), vec![2]);

        // Non-timestamp strings never equal numbers
        assert_eq!(compare_values(&json!(5), &json!("pending")), None);
    }

    #[test]
    fn comparisons_with_null_are_false() {
        let query = SelectQuery::from_table("orders")
            .and_where(Condition::compare("status", ComparisonOp::Ne, json!("pending")));
        let rows = evaluate(&orders(), &query).unwrap();
        assert_eq!(ids(&rows), vec![2, 5]);
    }

    #[test]
    fn in_list_matches_members() {
        let query = SelectQuery::from_table("orders").and_where(Condition::in_list(
            "status",
            vec![json!("pending"), json!("failed")],
        ));
        let rows = evaluate(&orders(), &query).unwrap();
        assert_eq!(ids(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn like_is_case_insensitive() {
        assert!(like_match("%foo%", "xxFOOyy"));
        assert!(like_match("f_o", "FoO"));
        assert!(!like_match("%foo%", "fo"));
        assert!(like_match("%", ""));
        assert!(like_match("a%c%e", "abcde"));
        assert!(!like_match("a%c%e", "abcd"));
    }

    #[test]
    fn like_escapes_match_literally() {
        assert!(like_match("%50\\%%", "save 50% now"));
        assert!(!like_match("%50\\%%", "save 500 now"));
        assert!(like_match("a\\_b", "a_b"));
        assert!(!like_match("a\\_b", "axb"));
    }

    #[test]
    fn order_limit_offset() {
        let query = SelectQuery::from_table("orders")
            .order_by(Expr::column("amount"), SortDirection::Desc)
            .limit(2)
            .offset(1);
        let rows = evaluate(&orders(), &query).unwrap();
        assert_eq!(ids(&rows), vec![3, 1]);
    }

    #[test]
    fn multi_key_sort_uses_first_entry_as_primary() {
        let query = SelectQuery::from_table("orders")
            .order_by(Expr::column("status"), SortDirection::Asc)
            .order_by(Expr::column("amount"), SortDirection::Desc);
        let rows = evaluate(&orders(), &query).unwrap();
        // NULL status first, then failed, paid, pending (500 before 120)
        assert_eq!(ids(&rows), vec![4, 2, 5, 3, 1]);
    }

    #[test]
    fn whole_set_aggregates() {
        let query = SelectQuery::from_table("orders")
            .field(Expr::Min("amount".to_string()), "min")
            .field(Expr::Max("amount".to_string()), "max")
            .field(Expr::Count("status".to_string()), "nonNullCount")
            .field(Expr::CountDistinct("status".to_string()), "totalDistinct")
            .field(Expr::CountAll, "totalCount");
        let rows = evaluate(&orders(), &query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["min"], json!(40));
        assert_eq!(rows[0]["max"], json!(700));
        assert_eq!(rows[0]["nonNullCount"], json!(4));
        assert_eq!(rows[0]["totalDistinct"], json!(3));
        assert_eq!(rows[0]["totalCount"], json!(5));
    }

    #[test]
    fn aggregate_over_empty_input_yields_one_row() {
        let query = SelectQuery::from_table("orders")
            .and_where(Condition::equal("status", json!("nope")))
            .field(Expr::Min("amount".to_string()), "min")
            .field(Expr::CountAll, "totalCount");
        let rows = evaluate(&orders(), &query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["min"], Value::Null);
        assert_eq!(rows[0]["totalCount"], json!(0));
    }

    #[test]
    fn group_by_ordered_by_count_desc() {
        let query = SelectQuery::from_table("orders")
            .field(Expr::column("status"), "value")
            .field(Expr::CountAll, "count")
            .and_where(Condition::not_null("status"))
            .group_by("status")
            .order_by(Expr::CountAll, SortDirection::Desc)
            .limit(2);
        let rows = evaluate(&orders(), &query).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["value"], json!("pending"));
        assert_eq!(rows[0]["count"], json!(2));
    }

    #[test]
    fn group_by_keeps_null_group() {
        let query = SelectQuery::from_table("orders")
            .field(Expr::column("paid"), "value")
            .field(Expr::CountAll, "count")
            .group_by("paid");
        let rows = evaluate(&orders(), &query).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|r| r["value"].is_null() && r["count"] == json!(1)));
    }

    #[test]
    fn subquery_source_counts_filtered_rows() {
        let inner = SelectQuery::from_table("orders")
            .and_where(Condition::compare("amount", ComparisonOp::Gte, json!(100)));
        let query = SelectQuery::from_query(inner).field(Expr::CountAll, "count");
        let rows = evaluate(&orders(), &query).unwrap();
        assert_eq!(rows[0]["count"], json!(3));
    }

    #[test]
    fn timestamps_compare_chronologically() {
        let tables = HashMap::from([(
            "events".to_string(),
            vec![
                row(json!({"id": 1, "at": "2024-01-01"})),
                row(json!({"id": 2, "at": "2024-01-02T10:00:00Z"})),
                row(json!({"id": 3, "at": "2024-01-03T00:00:00+00:00"})),
            ],
        )]);
        let query = SelectQuery::from_table("events").and_where(Condition::between(
            "at",
            json!("2024-01-01T00:00:00.000Z"),
            json!("2024-01-02T23:59:59.000Z"),
        ));
        let rows = evaluate(&tables, &query).unwrap();
        assert_eq!(ids(&rows), vec![1, 2]);
    }

    #[test]
    fn ordering_by_aggregate_without_grouping_is_invalid() {
        let query = SelectQuery::from_table("orders").order_by(Expr::CountAll, SortDirection::Asc);
        assert!(matches!(
            evaluate(&orders(), &query),
            Err(DataError::InvalidQuery(_))
        ));
    }
}
