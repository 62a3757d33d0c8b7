//! SQL rendering
//!
//! Rendering is deterministic: equal queries always produce equal text,
//! which is what makes `to_sql()` usable as a cache key component.

use std::fmt;

use super::types::{Condition, Expr, Field, OrderBy, SelectQuery, Source};
use crate::utils::sql::{quote_list, quote_literal, quote_string};

/// Render an identifier, quoting it when it is not a plain word
pub fn ident(name: &str) -> String {
    let plain = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", ident(name)),
            Expr::CountAll => write!(f, "COUNT(*)"),
            Expr::Count(name) => write!(f, "COUNT({})", ident(name)),
            Expr::CountDistinct(name) => write!(f, "COUNT(DISTINCT {})", ident(name)),
            Expr::Min(name) => write!(f, "MIN({})", ident(name)),
            Expr::Max(name) => write!(f, "MAX({})", ident(name)),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS {}", self.expr, ident(&self.alias))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { column, op, value } => {
                write!(f, "{} {} {}", ident(column), op.as_sql(), quote_literal(value))
            }
            Condition::Between { column, from, to } => write!(
                f,
                "{} BETWEEN {} AND {}",
                ident(column),
                quote_literal(from),
                quote_literal(to)
            ),
            Condition::Like { column, pattern } => {
                write!(f, "{} LIKE {}", ident(column), quote_string(pattern))?;
                if pattern.contains('\\') {
                    write!(f, " ESCAPE '\\'")?;
                }
                Ok(())
            }
            Condition::In { column, values } => {
                if values.is_empty() {
                    // IN () is not valid SQL; an empty set matches nothing
                    write!(f, "FALSE")
                } else {
                    write!(f, "{} IN {}", ident(column), quote_list(values))
                }
            }
            Condition::NotNull { column } => write!(f, "{} IS NOT NULL", ident(column)),
            Condition::And(conditions) => {
                let parts: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(" AND "))
            }
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, self.direction.as_sql())
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = if self.fields().is_empty() {
            "*".to_string()
        } else {
            self.fields()
                .iter()
                .map(|field| field.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "SELECT {} FROM ", fields)?;

        match self.source() {
            Source::Table(table) => write!(f, "{}", ident(table))?,
            Source::Query(inner) => write!(f, "({}) AS t", inner)?,
        }

        if !self.conditions().is_empty() {
            let parts: Vec<String> = self.conditions().iter().map(|c| c.to_string()).collect();
            write!(f, " WHERE {}", parts.join(" AND "))?;
        }

        if !self.grouping().is_empty() {
            let cols: Vec<String> = self.grouping().iter().map(|c| ident(c)).collect();
            write!(f, " GROUP BY {}", cols.join(", "))?;
        }

        if !self.ordering().is_empty() {
            let entries: Vec<String> = self.ordering().iter().map(|o| o.to_string()).collect();
            write!(f, " ORDER BY {}", entries.join(", "))?;
        }

        if let Some(limit) = self.limit_rows() {
            write!(f, " LIMIT {}", limit)?;
        }

        if let Some(offset) = self.offset_rows() {
            write!(f, " OFFSET {}", offset)?;
        }

        Ok(())
    }
}
