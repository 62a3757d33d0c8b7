//! Command-line application
//!
//! Loads a JSON dataset into a static source, composes the page for the
//! requested table state, and prints the page (plus filter metadata when
//! asked) as JSON on stdout. Logs go to stderr.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::core::cli::{self, CliConfig};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::data::cache::CacheStats;
use crate::data::query::SelectQuery;
use crate::data::source::{DataSource, DelayedDataSource, StaticDataSource};
use crate::domain::columns::{ColumnDescriptor, find_column, infer_columns};
use crate::domain::compose::{TablePage, TableState, compose, compose_and_execute};
use crate::domain::filters::{FilterMetadata, filter_label, parse_filters};
use crate::domain::metadata::MetadataService;

/// Rows sampled when inferring column types
const INFER_SAMPLE_ROWS: u64 = 100;

/// Queries behind a page, as rendered SQL
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryText {
    pub data: String,
    pub count: String,
}

/// Everything printed for one invocation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub table: String,
    pub queries: QueryText,
    pub page: TablePage,
    /// Chip labels for the active filters
    pub active_filters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, FilterMetadata>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

pub struct App;

impl App {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli = cli::parse();
        let config = AppConfig::load(&cli)?;
        let report = Self::execute(&cli, &config).await?;

        let output = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", output);
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("warn,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    /// Build the report for one CLI invocation
    pub async fn execute(cli: &CliConfig, config: &AppConfig) -> Result<Report> {
        let data = Arc::new(load_dataset(&cli.data)?);
        let table = resolve_table(&data, cli.table.as_deref())?;
        tracing::info!(table = %table, hash = %data.content_hash(), "Dataset loaded");

        let source: Arc<dyn DataSource> = match config.delay_policy() {
            Some(policy) => {
                tracing::info!(policy = ?policy, "Simulating source latency");
                Arc::new(DelayedDataSource::new(data, policy))
            }
            None => data,
        };

        let base = SelectQuery::from_table(&table);
        let columns = match &cli.columns {
            Some(path) => read_json::<Vec<ColumnDescriptor>>(path, "columns")?,
            None => {
                let sample = source
                    .execute(&base.clone().limit(INFER_SAMPLE_ROWS))
                    .await
                    .context("Failed to sample rows for column inference")?;
                infer_columns(&sample)
            }
        };
        tracing::debug!(columns = columns.len(), "Columns resolved");

        let state = load_state(cli, config, &columns)?;
        let composed = compose(&base, &columns, &state);
        tracing::debug!(
            cache_key = %composed.cache_key(&source.content_hash()),
            predicates = composed.predicates.len(),
            "Composed page query"
        );

        let (page, metadata, cache) = if cli.metadata {
            let service = MetadataService::new(config.metadata_config());
            let (page, metadata) = tokio::join!(
                compose_and_execute(source.as_ref(), &composed),
                service.fetch_all_metadata(Arc::clone(&source), &base, &columns),
            );
            let metadata: BTreeMap<_, _> = metadata.into_iter().collect();
            (page, Some(metadata), Some(service.cache_stats()))
        } else {
            (compose_and_execute(source.as_ref(), &composed).await, None, None)
        };
        let page = page.context("Failed to execute page query")?;

        let active_filters = state
            .filters
            .iter()
            .filter(|(_, value)| value.is_active())
            .filter_map(|(id, value)| find_column(&columns, id).map(|column| filter_label(column, value)))
            .collect();

        Ok(Report {
            table,
            queries: QueryText {
                data: composed.data_query.to_sql(),
                count: composed.count_query.to_sql(),
            },
            page,
            active_filters,
            metadata,
            cache,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file: {}", what, path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} file: {}", what, path.display()))
}

fn load_dataset(path: &Path) -> Result<StaticDataSource> {
    let value: Value = read_json(path, "dataset")?;
    StaticDataSource::from_json(value)
        .with_context(|| format!("Invalid dataset: {}", path.display()))
}

fn resolve_table(source: &StaticDataSource, requested: Option<&str>) -> Result<String> {
    let tables = source.table_names();
    match requested {
        Some(name) if tables.iter().any(|t| t == name) => Ok(name.to_string()),
        Some(name) => anyhow::bail!("Table '{}' not found (available: {})", name, tables.join(", ")),
        None => match tables.as_slice() {
            [only] => Ok(only.clone()),
            [] => anyhow::bail!("Dataset contains no tables"),
            _ => anyhow::bail!(
                "Dataset has {} tables; choose one with --table ({})",
                tables.len(),
                tables.join(", ")
            ),
        },
    }
}

/// Table state from the state file, with CLI overrides applied
fn load_state(cli: &CliConfig, config: &AppConfig, columns: &[ColumnDescriptor]) -> Result<TableState> {
    let mut state = match &cli.state {
        Some(path) => {
            let raw: Value = read_json(path, "state")?;
            let has_page_size = raw.pointer("/pagination/pageSize").is_some();
            let mut state: TableState = serde_json::from_value(raw)
                .with_context(|| format!("Invalid table state: {}", path.display()))?;
            if !has_page_size {
                state.pagination.page_size = config.table.page_size;
            }
            state
        }
        None => {
            let mut state = TableState::default();
            state.pagination.page_size = config.table.page_size;
            state
        }
    };

    if let Some(page_size) = cli.page_size {
        state.pagination.page_size = page_size;
    }
    if let Some(page) = cli.page {
        state.pagination.page_index = page;
    }
    if let Some(filters) = &cli.filters {
        state.filters = parse_filters(filters, columns).context("Invalid --filters")?;
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn temp_json(value: Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(value.to_string().as_bytes()).unwrap();
        file
    }

    fn dataset() -> tempfile::NamedTempFile {
        let rows: Vec<Value> = (1..=23)
            .map(|i| {
                let status = if i % 2 == 0 { "pending" } else { "failed" };
                json!({"id": i, "status": status, "amount": i * 10, "created": format!("2024-01-{:02}", i)})
            })
            .collect();
        temp_json(json!({ "orders": rows }))
    }

    fn setup(cli: CliConfig) -> (CliConfig, AppConfig, tempfile::NamedTempFile) {
        let config_file = temp_json(json!({}));
        let cli = CliConfig {
            config: Some(config_file.path().to_path_buf()),
            ..cli
        };
        let config = AppConfig::load(&cli).unwrap();
        (cli, config, config_file)
    }

    #[tokio::test]
    async fn test_execute_default_page() {
        let data = dataset();
        let (cli, config, _config_file) = setup(CliConfig {
            data: data.path().to_path_buf(),
            ..Default::default()
        });

        let report = App::execute(&cli, &config).await.unwrap();
        assert_eq!(report.table, "orders");
        assert_eq!(report.page.total_count, 23);
        assert_eq!(report.page.page_count, 3);
        assert_eq!(report.page.rows.len(), 10);
        assert!(report.active_filters.is_empty());
        assert!(report.metadata.is_none());
        assert_eq!(report.queries.count, "SELECT COUNT(*) AS count FROM (SELECT * FROM orders) AS t");
    }

    #[tokio::test]
    async fn test_execute_with_filters_and_metadata() {
        let data = dataset();
        let (cli, config, _config_file) = setup(CliConfig {
            data: data.path().to_path_buf(),
            filters: Some(r#"{"status": "pending", "amount": {"type": "range", "from": 100}}"#.to_string()),
            page_size: Some(5),
            metadata: true,
            ..Default::default()
        });

        let report = App::execute(&cli, &config).await.unwrap();
        // even ids from 10 to 22
        assert_eq!(report.page.total_count, 7);
        assert_eq!(report.page.page_count, 2);
        assert_eq!(report.active_filters, vec!["amount: 100 to max", "status: pending"]);

        let metadata = report.metadata.unwrap();
        assert_eq!(metadata["amount"].min, Some(json!(10)));
        assert_eq!(metadata["created"].max, Some(json!("2024-01-23")));
        assert_eq!(metadata["status"].total_distinct, Some(2));
        assert_eq!(report.cache.map(|c| c.size), Some(4));
    }

    #[tokio::test]
    async fn test_execute_with_state_file() {
        let data = dataset();
        let state = temp_json(json!({
            "sorting": [{"id": "amount", "desc": true}],
            "pagination": {"pageIndex": 2, "pageSize": 10}
        }));
        let (cli, config, _config_file) = setup(CliConfig {
            data: data.path().to_path_buf(),
            state: Some(state.path().to_path_buf()),
            ..Default::default()
        });

        let report = App::execute(&cli, &config).await.unwrap();
        assert_eq!(report.page.rows.len(), 3);
        assert_eq!(report.page.rows[0]["amount"], json!(30));
    }

    #[tokio::test]
    async fn test_execute_unknown_table() {
        let data = dataset();
        let (cli, config, _config_file) = setup(CliConfig {
            data: data.path().to_path_buf(),
            table: Some("refunds".to_string()),
            ..Default::default()
        });

        let err = App::execute(&cli, &config).await.unwrap_err();
        assert!(err.to_string().contains("Table 'refunds' not found"));
    }

    #[test]
    fn test_resolve_table_requires_choice_when_ambiguous() {
        let source = StaticDataSource::from_json(json!({"a": [], "b": []})).unwrap();
        assert!(resolve_table(&source, None).is_err());
        assert_eq!(resolve_table(&source, Some("b")).unwrap(), "b");
    }
}
