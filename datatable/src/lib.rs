//! Data table core
//!
//! Composes filtered, sorted and paginated queries from table state,
//! translates filter widget values into predicates, and serves per-column
//! filter metadata through a single-flight TTL cache.

pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
