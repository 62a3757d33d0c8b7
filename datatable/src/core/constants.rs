// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "datatable";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "datatable.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "DATATABLE_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "DATATABLE_LOG";

// =============================================================================
// Environment Variables - Data
// =============================================================================

/// Environment variable for the JSON dataset path
pub const ENV_DATA: &str = "DATATABLE_DATA";

/// Environment variable for the table to query
pub const ENV_TABLE: &str = "DATATABLE_TABLE";

/// Environment variable for simulated source latency in milliseconds
pub const ENV_DELAY_MS: &str = "DATATABLE_DELAY_MS";

// =============================================================================
// Environment Variables - Cache & Metadata
// =============================================================================

/// Environment variable for metadata cache TTL in seconds
pub const ENV_CACHE_TTL_SECS: &str = "DATATABLE_CACHE_TTL_SECS";

/// Environment variable for the distinct-values cap
pub const ENV_DISTINCT_LIMIT: &str = "DATATABLE_DISTINCT_LIMIT";

/// Environment variable for the default page size
pub const ENV_PAGE_SIZE: &str = "DATATABLE_PAGE_SIZE";

// =============================================================================
// Defaults
// =============================================================================

/// Metadata cache TTL (5 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Maximum distinct values reported per string column
pub const DEFAULT_DISTINCT_LIMIT: u64 = 100;

/// Rows per page when the table state does not say
pub const DEFAULT_PAGE_SIZE: u64 = 10;

// =============================================================================
// Cache Keys
// =============================================================================

/// Version prefix for cache keys; bump when cached shapes change
pub const CACHE_KEY_VERSION: &str = "v1";
