//! Latency-simulating data source wrapper

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use super::{DataSource, RowSet};
use crate::data::error::DataError;
use crate::data::query::SelectQuery;

/// How long each batch waits before executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    Fixed(Duration),
    /// Uniformly random in `[min, max]`
    Variable { min: Duration, max: Duration },
}

impl DelayPolicy {
    fn next_delay(&self) -> Duration {
        match *self {
            DelayPolicy::Fixed(delay) => delay,
            DelayPolicy::Variable { min, max } if max > min => {
                rand::thread_rng().gen_range(min..=max)
            }
            DelayPolicy::Variable { min, .. } => min,
        }
    }
}

/// Wraps a data source and delays every batch, for demos and tests
pub struct DelayedDataSource {
    inner: Arc<dyn DataSource>,
    policy: DelayPolicy,
}

impl DelayedDataSource {
    pub fn new(inner: Arc<dyn DataSource>, policy: DelayPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl DataSource for DelayedDataSource {
    async fn execute_queries(&self, queries: &[SelectQuery]) -> Result<Vec<RowSet>, DataError> {
        let delay = self.policy.next_delay();
        tracing::trace!(delay_ms = delay.as_millis() as u64, "Simulating latency");
        tokio::time::sleep(delay).await;
        self.inner.execute_queries(queries).await
    }

    fn content_hash(&self) -> String {
        self.inner.content_hash()
    }

    fn source_name(&self) -> &'static str {
        "delayed"
    }
}
