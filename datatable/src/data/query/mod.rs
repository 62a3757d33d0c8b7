//! Query value model
//!
//! Queries are immutable values: every builder method consumes the query and
//! returns a new one, so a base query can be shared and extended freely.
//! The rendered SQL text doubles as the query's stable signature.
//!
//! ## Usage
//!
//! ```
//! use datatable::data::query::{Condition, Expr, SelectQuery, SortDirection};
//! use serde_json::json;
//!
//! let query = SelectQuery::from_table("orders")
//!     .and_where(Condition::equal("status", json!("pending")))
//!     .order_by(Expr::column("amount"), SortDirection::Desc)
//!     .limit(10)
//!     .offset(0);
//! assert_eq!(
//!     query.to_sql(),
//!     "SELECT * FROM orders WHERE status = 'pending' ORDER BY amount DESC LIMIT 10 OFFSET 0"
//! );
//! ```

mod render;
mod types;

pub use render::ident;
pub use types::{
    ComparisonOp, Condition, Expr, Field, OrderBy, SelectQuery, SortDirection, Source,
};
