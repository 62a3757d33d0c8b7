use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_CACHE_TTL_SECS, DEFAULT_DISTINCT_LIMIT, DEFAULT_PAGE_SIZE,
};
use crate::data::source::DelayPolicy;
use crate::domain::metadata::MetadataConfig;

// =============================================================================
// File Config (all fields optional, layered under CLI/env)
// =============================================================================

/// Metadata cache configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CacheFileConfig {
    pub ttl_secs: Option<u64>,
}

/// Metadata service configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MetadataFileConfig {
    pub distinct_limit: Option<u64>,
}

/// Table defaults section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TableFileConfig {
    pub page_size: Option<u64>,
}

/// Data source section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SourceFileConfig {
    pub delay_ms: Option<u64>,
    pub delay_max_ms: Option<u64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub cache: Option<CacheFileConfig>,
    pub metadata: Option<MetadataFileConfig>,
    pub table: Option<TableFileConfig>,
    pub source: Option<SourceFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }
}

// =============================================================================
// Final Config
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub page_size: u64,
}

/// Simulated latency for the data source; zero means none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub delay_ms: u64,
    pub delay_max_ms: Option<u64>,
}

/// Final merged application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub distinct_limit: u64,
    pub table: TableConfig,
    pub source: SourceConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Local directory config OR CLI-specified config path
    /// 3. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        let file_config = match path {
            Some(path) => {
                let config = FileConfig::load_from_file(&path)?;
                config.warn_unknown_fields();
                config
            }
            None => FileConfig::default(),
        };

        let config = Self::layer(cli, file_config);
        config.validate()?;
        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn layer(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_cache = file_config.cache.unwrap_or_default();
        let file_metadata = file_config.metadata.unwrap_or_default();
        let file_table = file_config.table.unwrap_or_default();
        let file_source = file_config.source.unwrap_or_default();

        let ttl_secs = cli
            .cache_ttl_secs
            .or(file_cache.ttl_secs)
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        let distinct_limit = cli
            .distinct_limit
            .or(file_metadata.distinct_limit)
            .unwrap_or(DEFAULT_DISTINCT_LIMIT);

        let page_size = cli
            .page_size
            .or(file_table.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        // A CLI delay replaces the file's range entirely
        let (delay_ms, delay_max_ms) = match cli.delay_ms {
            Some(delay_ms) => (delay_ms, cli.delay_max_ms),
            None => (file_source.delay_ms.unwrap_or(0), file_source.delay_max_ms),
        };

        Self {
            cache: CacheConfig {
                ttl: Duration::from_secs(ttl_secs),
            },
            distinct_limit,
            table: TableConfig { page_size },
            source: SourceConfig {
                delay_ms,
                delay_max_ms,
            },
        }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.cache.ttl.is_zero() {
            anyhow::bail!("Configuration error: cache.ttl_secs must be greater than 0");
        }
        if self.distinct_limit == 0 {
            anyhow::bail!("Configuration error: metadata.distinct_limit must be greater than 0");
        }
        if self.table.page_size == 0 {
            anyhow::bail!("Configuration error: table.page_size must be greater than 0");
        }
        if let Some(max) = self.source.delay_max_ms
            && max < self.source.delay_ms
        {
            anyhow::bail!(
                "Configuration error: source.delay_max_ms ({}) must not be less than source.delay_ms ({})",
                max,
                self.source.delay_ms
            );
        }
        Ok(())
    }

    /// Build a MetadataConfig for use by MetadataService
    pub fn metadata_config(&self) -> MetadataConfig {
        MetadataConfig {
            ttl: self.cache.ttl,
            distinct_values_limit: self.distinct_limit,
        }
    }

    /// Latency policy for the data source, if any
    pub fn delay_policy(&self) -> Option<DelayPolicy> {
        let min = Duration::from_millis(self.source.delay_ms);
        match self.source.delay_max_ms {
            Some(max) if max > self.source.delay_ms => Some(DelayPolicy::Variable {
                min,
                max: Duration::from_millis(max),
            }),
            _ if self.source.delay_ms > 0 => Some(DelayPolicy::Fixed(min)),
            _ => None,
        }
    }
}
