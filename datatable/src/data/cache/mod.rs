//! Cache module
//!
//! Provides the single-flight TTL memoizer used for column metadata and the
//! versioned key builder shared by everything that caches on query
//! signatures.

mod key;
mod memo;

pub use key::CacheKey;
pub use memo::{CacheStats, MetadataCache};
