use clap::Parser;

use std::path::PathBuf;

use super::constants::{
    ENV_CACHE_TTL_SECS, ENV_CONFIG, ENV_DATA, ENV_DELAY_MS, ENV_DISTINCT_LIMIT, ENV_PAGE_SIZE,
    ENV_TABLE,
};

#[derive(Parser)]
#[command(name = "datatable")]
#[command(
    version,
    about = "Compose filtered, sorted and paginated table queries over a JSON dataset",
    long_about = None
)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// JSON dataset: an object mapping table names to arrays of rows
    #[arg(long, short = 'd', env = ENV_DATA)]
    pub data: PathBuf,

    /// Table to query (defaults to the only table in the dataset)
    #[arg(long, short = 't', env = ENV_TABLE)]
    pub table: Option<String>,

    /// Column descriptors as a JSON array (inferred from the rows when omitted)
    #[arg(long)]
    pub columns: Option<PathBuf>,

    /// Table state JSON file (sorting, pagination, filters)
    #[arg(long, short = 's')]
    pub state: Option<PathBuf>,

    /// Column filters as inline JSON, replacing those in the state file
    #[arg(long, short = 'f')]
    pub filters: Option<String>,

    /// Page index, replacing the one in the state file
    #[arg(long)]
    pub page: Option<u64>,

    /// Page size
    #[arg(long, env = ENV_PAGE_SIZE)]
    pub page_size: Option<u64>,

    /// Also print filter metadata for every filterable column
    #[arg(long, short = 'm')]
    pub metadata: bool,

    /// Metadata cache TTL in seconds
    #[arg(long, env = ENV_CACHE_TTL_SECS)]
    pub cache_ttl_secs: Option<u64>,

    /// Maximum distinct values reported per string column
    #[arg(long, env = ENV_DISTINCT_LIMIT)]
    pub distinct_limit: Option<u64>,

    /// Simulated source latency in milliseconds
    #[arg(long, env = ENV_DELAY_MS)]
    pub delay_ms: Option<u64>,

    /// Upper bound for a random latency between --delay-ms and this value
    #[arg(long, requires = "delay_ms")]
    pub delay_max_ms: Option<u64>,
}

/// Parsed CLI configuration
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub data: PathBuf,
    pub table: Option<String>,
    pub columns: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub filters: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub metadata: bool,
    pub cache_ttl_secs: Option<u64>,
    pub distinct_limit: Option<u64>,
    pub delay_ms: Option<u64>,
    pub delay_max_ms: Option<u64>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            config: cli.config,
            data: cli.data,
            table: cli.table,
            columns: cli.columns,
            state: cli.state,
            filters: cli.filters,
            page: cli.page,
            page_size: cli.page_size,
            metadata: cli.metadata,
            cache_ttl_secs: cli.cache_ttl_secs,
            distinct_limit: cli.distinct_limit,
            delay_ms: cli.delay_ms,
            delay_max_ms: cli.delay_max_ms,
        }
    }
}

/// Parse CLI arguments
pub fn parse() -> CliConfig {
    Cli::parse().into()
}
