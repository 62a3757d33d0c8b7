//! In-memory data source over static tables

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::eval::evaluate;
use super::{DataSource, RowSet};
use crate::data::error::DataError;
use crate::data::query::SelectQuery;

/// Data source backed by named in-memory tables
///
/// The content hash is derived from the table contents, so it changes
/// exactly when a table is replaced with different rows.
pub struct StaticDataSource {
    tables: RwLock<HashMap<String, RowSet>>,
    content_hash: RwLock<String>,
}

impl std::fmt::Debug for StaticDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticDataSource")
            .field("tables", &self.table_names())
            .field("content_hash", &self.content_hash())
            .finish()
    }
}

impl StaticDataSource {
    pub fn new(tables: HashMap<String, RowSet>) -> Self {
        let hash = hash_tables(&tables);
        Self {
            tables: RwLock::new(tables),
            content_hash: RwLock::new(hash),
        }
    }

    /// Build from a JSON object mapping table names to arrays of row objects
    pub fn from_json(value: Value) -> Result<Self, DataError> {
        let Value::Object(map) = value else {
            return Err(DataError::InvalidQuery(
                "dataset must be an object of tables".to_string(),
            ));
        };

        let mut tables = HashMap::with_capacity(map.len());
        for (name, rows) in map {
            let Value::Array(items) = rows else {
                return Err(DataError::InvalidQuery(format!(
                    "table {} must be an array of rows",
                    name
                )));
            };
            let mut table = RowSet::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(row) => table.push(row),
                    _ => {
                        return Err(DataError::InvalidQuery(format!(
                            "table {} contains a non-object row",
                            name
                        )));
                    }
                }
            }
            tables.insert(name, table);
        }

        Ok(Self::new(tables))
    }

    /// Replace (or add) a table, updating the content hash
    pub fn replace_table(&self, name: impl Into<String>, rows: RowSet) {
        let name = name.into();
        let mut tables = self.tables.write();
        tables.insert(name.clone(), rows);
        let hash = hash_tables(&tables);
        tracing::debug!(table = %name, content_hash = %hash, "Replaced table");
        *self.content_hash.write() = hash;
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

fn hash_tables(tables: &HashMap<String, RowSet>) -> String {
    let mut names: Vec<&String> = tables.keys().collect();
    names.sort();

    let mut ctx = md5::Context::new();
    for name in names {
        ctx.consume(name.as_bytes());
        ctx.consume([0u8]);
        if let Err(e) = serde_json::to_writer(&mut ctx, &tables[name]) {
            tracing::warn!(table = %name, error = %e, "Failed to hash table contents");
        }
    }
    format!("{:x}", ctx.compute())
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn execute_queries(&self, queries: &[SelectQuery]) -> Result<Vec<RowSet>, DataError> {
        tracing::debug!(queries = queries.len(), "Executing queries");
        let tables = self.tables.read();
        queries
            .iter()
            .map(|query| {
                tracing::trace!(sql = %query.to_sql(), "Evaluating query");
                evaluate(&tables, query)
            })
            .collect()
    }

    fn content_hash(&self) -> String {
        self.content_hash.read().clone()
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::query::{Condition, Expr};
    use serde_json::json;

    fn source() -> StaticDataSource {
        StaticDataSource::from_json(json!({
            "orders": [
                {"id": 1, "status": "pending"},
                {"id": 2, "status": "failed"},
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_execute_queries_preserves_order() {
        let source = source();
        let queries = vec![
            SelectQuery::from_table("orders").field(Expr::CountAll, "count"),
            SelectQuery::from_table("orders")
                .and_where(Condition::equal("status", json!("failed"))),
        ];
        let results = source.execute_queries(&queries).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0][0]["count"], json!(2));
        assert_eq!(results[1][0]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_execute_single() {
        let rows = source()
            .execute(&SelectQuery::from_table("orders"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_table_propagates() {
        let err = source()
            .execute(&SelectQuery::from_table("nope"))
            .await
            .unwrap_err();
        assert_eq!(err, DataError::UnknownTable("nope".to_string()));
    }

    #[test]
    fn test_content_hash_changes_with_data() {
        let source = source();
        let before = source.content_hash();
        assert_eq!(before, self::source().content_hash());

        let mut row = serde_json::Map::new();
        row.insert("id".to_string(), json!(3));
        source.replace_table("orders", vec![row]);
        assert_ne!(source.content_hash(), before);
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        assert!(StaticDataSource::from_json(json!([1, 2])).is_err());
        assert!(StaticDataSource::from_json(json!({"t": {"a": 1}})).is_err());
        assert!(StaticDataSource::from_json(json!({"t": [1]})).is_err());
    }

    #[test]
    fn test_table_names_sorted() {
        let source = StaticDataSource::from_json(json!({"b": [], "a": []})).unwrap();
        assert_eq!(source.table_names(), vec!["a", "b"]);
    }
}
