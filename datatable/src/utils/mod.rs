//! Shared helpers

pub mod sql;
pub mod time;
