//! Type-safe cache key builder with versioning

use crate::core::constants::CACHE_KEY_VERSION;

/// Type-safe cache key builder
///
/// All keys are prefixed with a version (e.g., "v1:") so a change in how
/// results are shaped can invalidate everything cached before it.
/// Query signatures are hashed to keep keys short and free of separators.
pub struct CacheKey;

impl CacheKey {
    /// Cache key for one column's metadata under a base query
    pub fn column_metadata(query_signature: &str, column_id: &str) -> String {
        format!(
            "{}:meta:{:x}:{}",
            CACHE_KEY_VERSION,
            md5::compute(query_signature),
            column_id
        )
    }

    /// Cache key for a page of table results
    ///
    /// Includes the source content hash so results are re-keyed whenever
    /// the dataset changes.
    pub fn table_page(content_hash: &str, query_signature: &str) -> String {
        format!(
            "{}:page:{}:{:x}",
            CACHE_KEY_VERSION,
            content_hash,
            md5::compute(query_signature)
        )
    }
}
