//! Query type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::sql::escape_like_pattern;

/// Sort direction for ORDER BY entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
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
}

impl ComparisonOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lte => "<=",
        }
    }
}

/// Projection and ordering expressions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Column(String),
    CountAll,
    Count(String),
    CountDistinct(String),
    Min(String),
    Max(String),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    /// Whether the expression summarizes a group of rows
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, Expr::Column(_))
    }
}

/// Projected field; results are keyed by `alias`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub expr: Expr,
    pub alias: String,
}

/// Boolean predicate combinable into a query's AND-list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Condition {
    Compare {
        column: String,
        op: ComparisonOp,
        value: Value,
    },
    /// Closed interval, both bounds inclusive
    Between {
        column: String,
        from: Value,
        to: Value,
    },
    /// SQL LIKE pattern; `\` escapes `%`, `_` and itself
    Like { column: String, pattern: String },
    In { column: String, values: Vec<Value> },
    NotNull { column: String },
    And(Vec<Condition>),
}

impl Condition {
    pub fn compare(column: impl Into<String>, op: ComparisonOp, value: Value) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn equal(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, ComparisonOp::Eq, value)
    }

    pub fn between(column: impl Into<String>, from: Value, to: Value) -> Self {
        Condition::Between {
            column: column.into(),
            from,
            to,
        }
    }

    /// Substring match; wildcard characters in `needle` match literally
    pub fn contains(column: impl Into<String>, needle: &str) -> Self {
        Condition::Like {
            column: column.into(),
            pattern: format!("%{}%", escape_like_pattern(needle)),
        }
    }

    pub fn in_list(column: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::In {
            column: column.into(),
            values,
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Condition::NotNull {
            column: column.into(),
        }
    }
}

/// Row source of a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Source {
    Table(String),
    Query(Box<SelectQuery>),
}

/// ORDER BY entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: SortDirection,
}

/// Immutable SELECT query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectQuery {
    fields: Vec<Field>,
    source: Source,
    conditions: Vec<Condition>,
    group_by: Vec<String>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQuery {
    fn with_source(source: Source) -> Self {
        Self {
            fields: Vec::new(),
            source,
            conditions: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// `SELECT * FROM table`
    pub fn from_table(table: impl Into<String>) -> Self {
        Self::with_source(Source::Table(table.into()))
    }

    /// `SELECT * FROM (query)`
    pub fn from_query(query: SelectQuery) -> Self {
        Self::with_source(Source::Query(Box::new(query)))
    }

    /// Add an aliased projection
    pub fn field(mut self, expr: Expr, alias: impl Into<String>) -> Self {
        self.fields.push(Field {
            expr,
            alias: alias.into(),
        });
        self
    }

    /// AND a condition into the WHERE clause
    pub fn and_where(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    /// Append an ORDER BY entry; earlier entries take precedence
    pub fn order_by(mut self, expr: Expr, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy { expr, direction });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn grouping(&self) -> &[String] {
        &self.group_by
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit_rows(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_rows(&self) -> Option<u64> {
        self.offset
    }

    /// Whether the query collapses rows into groups
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty() || self.fields.iter().any(|f| f.expr.is_aggregate())
    }

    /// Stable textual signature of the query
    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builders_do_not_mutate_the_base() {
        let base = SelectQuery::from_table("orders");
        let filtered = base
            .clone()
            .and_where(Condition::equal("status", json!("pending")));

        assert!(base.conditions().is_empty());
        assert_eq!(filtered.conditions().len(), 1);
    }

    #[test]
    fn and_where_appends() {
        let query = SelectQuery::from_table("orders")
            .and_where(Condition::not_null("status"))
            .and_where(Condition::equal("status", json!("paid")));
        assert_eq!(query.conditions().len(), 2);
    }

    #[test]
    fn contains_escapes_wildcards() {
        let cond = Condition::contains("email", "50%_off");
        assert_eq!(
            cond,
            Condition::Like {
                column: "email".to_string(),
                pattern: "%50\\%\\_off%".to_string(),
            }
        );
    }

    #[test]
    fn aggregate_detection() {
        let plain = SelectQuery::from_table("t").and_where(Condition::not_null("a"));
        assert!(!plain.is_aggregate());

        let counted = SelectQuery::from_table("t").field(Expr::CountAll, "count");
        assert!(counted.is_aggregate());

        let grouped = SelectQuery::from_table("t")
            .field(Expr::column("a"), "value")
            .group_by("a");
        assert!(grouped.is_aggregate());
    }

    #[test]
    fn comparison_op_deserializes_from_symbols() {
        let op: ComparisonOp = serde_json::from_str(r#"">=""#).unwrap();
        assert_eq!(op, ComparisonOp::Gte);
        assert_eq!(op.as_sql(), ">=");
    }
}
