//! Single-flight memoizing cache with TTL
//!
//! Per key the cache moves through: absent -> pending (fetch in flight)
//! -> cached (fresh) -> cached (stale, still stored) -> absent (evicted).
//!
//! Concurrent `get` calls for a pending key share one fetch. The fetch runs
//! in its own task, so it completes and populates the cache even when every
//! caller has gone away. Each pending registration carries an id; a settling
//! fetch only touches the cache while its id is still the registered one, so
//! `invalidate`/`clear` never have their effect undone by an older fetch.
//!
//! The state mutex is only held for synchronous bookkeeping, never across
//! an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinError;
use tokio::time::Instant;

type SharedFetch<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct CacheEntry<T> {
    data: T,
    created_at: Instant,
}

struct PendingFetch<T, E> {
    id: u64,
    request: SharedFetch<T, E>,
}

struct State<T, E> {
    entries: HashMap<String, CacheEntry<T>>,
    pending: HashMap<String, PendingFetch<T, E>>,
    next_id: u64,
}

impl<T, E> State<T, E> {
    fn is_current(&self, key: &str, id: u64) -> bool {
        self.pending.get(key).is_some_and(|p| p.id == id)
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub pending_requests: usize,
}

/// Removes the pending registration when the fetch task ends, including
/// when the fetcher panics
struct PendingGuard<T, E> {
    state: Arc<Mutex<State<T, E>>>,
    key: String,
    id: u64,
}

impl<T, E> Drop for PendingGuard<T, E> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.is_current(&self.key, self.id) {
            state.pending.remove(&self.key);
        }
    }
}

/// Single-flight memoizer keyed by opaque strings
///
/// Failed fetches are delivered to every waiting caller but never cached.
pub struct MetadataCache<T, E> {
    state: Arc<Mutex<State<T, E>>>,
    ttl: Duration,
}

impl<T, E> std::fmt::Debug for MetadataCache<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MetadataCache")
            .field("ttl", &self.ttl)
            .field("size", &state.entries.len())
            .field("pending_requests", &state.pending.len())
            .finish()
    }
}

impl<T, E> MetadataCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
                pending: HashMap::new(),
                next_id: 0,
            })),
            ttl,
        }
    }

    /// Return the cached value for `key`, or fetch it once
    ///
    /// An in-flight fetch for `key` is joined rather than duplicated; a
    /// fresh entry is returned without calling `fetcher`. `fetcher` is
    /// invoked while the cache's bookkeeping lock is held, so it must only
    /// build the future and not call back into this cache.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime (the fetch is spawned).
    pub async fn get<F, Fut>(&self, key: &str, fetcher: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let request = {
            let mut state = self.state.lock();

            if let Some(pending) = state.pending.get(key) {
                tracing::trace!(key = %key, "Joining in-flight fetch");
                pending.request.clone()
            } else if let Some(entry) = state.entries.get(key)
                && entry.created_at.elapsed() < self.ttl
            {
                tracing::trace!(key = %key, "Cache hit");
                return Ok(entry.data.clone());
            } else {
                let id = state.next_id;
                state.next_id += 1;
                tracing::trace!(key = %key, id, "Cache miss, dispatching fetch");
                let request = self.dispatch(key.to_string(), id, fetcher());
                state.pending.insert(
                    key.to_string(),
                    PendingFetch {
                        id,
                        request: request.clone(),
                    },
                );
                request
            }
        };

        request.await
    }

    fn dispatch<Fut>(&self, key: String, id: u64, fetch: Fut) -> SharedFetch<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            let guard = PendingGuard {
                state: Arc::clone(&state),
                key,
                id,
            };
            let result = fetch.await;

            if let Ok(data) = &result {
                let mut state = state.lock();
                if state.is_current(&guard.key, id) {
                    state.entries.insert(
                        guard.key.clone(),
                        CacheEntry {
                            data: data.clone(),
                            created_at: Instant::now(),
                        },
                    );
                } else {
                    tracing::debug!(key = %guard.key, "Discarding result of superseded fetch");
                }
            }

            result
        });

        async move { handle.await.unwrap_or_else(|e| Err(E::from(e))) }
            .boxed()
            .shared()
    }

    /// Remove one entry and any pending registration for it
    ///
    /// Returns whether anything was removed. Callers already waiting on a
    /// fetch for `key` still receive its result.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let had_entry = state.entries.remove(key).is_some();
        let had_pending = state.pending.remove(key).is_some();
        had_entry || had_pending
    }

    /// Remove all entries and pending registrations
    pub fn clear(&self) {
        let mut state = self.state.lock();
        tracing::debug!(
            entries = state.entries.len(),
            pending = state.pending.len(),
            "Clearing cache"
        );
        state.entries.clear();
        state.pending.clear();
    }

    /// Drop expired entries, returning how many were removed
    pub fn cleanup(&self) -> usize {
        let ttl = self.ttl;
        let mut state = self.state.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| entry.created_at.elapsed() < ttl);
        before - state.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            size: state.entries.len(),
            pending_requests: state.pending.len(),
        }
    }
}
