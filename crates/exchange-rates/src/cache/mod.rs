//! Single-flight, process-lifetime memoization of rate lookups.
//!
//! The first caller for a key installs a pending flight and drives the
//! computation; concurrent callers for the same key await that same flight
//! and observe the same result. Successful values are kept forever, failures
//! are dropped so the next caller starts a fresh computation.
//!
//! Entries are never evicted. Key cardinality is bounded in practice
//! (currency x purchase date), but a long-running process will keep
//! growing; see DESIGN.md.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

type Flight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

enum Slot<V, E>
where
    V: Clone,
    E: Clone,
{
    Pending { id: u64, flight: Flight<V, E> },
    Ready(V),
}

/// Deduplicating cache keyed by value.
pub struct SingleFlightCache<K, V, E>
where
    V: Clone,
    E: Clone,
{
    entries: DashMap<K, Slot<V, E>>,
    next_flight: AtomicU64,
}

impl<K, V, E> SingleFlightCache<K, V, E>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_flight: AtomicU64::new(0),
        }
    }

    /// Return the memoized value for `key`, or run `compute` exactly once
    /// across all concurrent callers for that key.
    ///
    /// `compute` is only invoked when no ready value and no pending flight
    /// exist. Its error is returned to every caller that joined the flight
    /// and is not memoized.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (id, flight) = match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => match occupied.get() {
                Slot::Ready(value) => {
                    debug!(key = %key, "Rate cache hit");
                    return Ok(value.clone());
                }
                Slot::Pending { id, flight } => {
                    debug!(key = %key, "Joining in-flight rate lookup");
                    (*id, flight.clone())
                }
            },
            Entry::Vacant(vacant) => {
                debug!(key = %key, "Rate cache miss");
                let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
                let flight = compute().boxed().shared();
                vacant.insert(Slot::Pending {
                    id,
                    flight: flight.clone(),
                });
                (id, flight)
            }
        };

        let result = flight.await;
        self.settle(&key, id, &result);
        result
    }

    /// Publish the outcome of flight `id`, unless another flight already replaced it.
    fn settle(&self, key: &K, id: u64, result: &Result<V, E>) {
        match result {
            Ok(value) => {
                if let Some(mut slot) = self.entries.get_mut(key) {
                    if matches!(*slot, Slot::Pending { id: current, .. } if current == id) {
                        *slot = Slot::Ready(value.clone());
                    }
                }
            }
            Err(_) => {
                self.entries.remove_if(key, |_, slot| {
                    matches!(slot, Slot::Pending { id: current, .. } if *current == id)
                });
            }
        }
    }

    /// Ready value for `key`, if any. Pending flights are not awaited.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).and_then(|slot| match &*slot {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Pending { .. } => None,
        })
    }

    /// Number of keys with a ready or pending entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V, E> Default for SingleFlightCache<K, V, E>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    type TestCache = SingleFlightCache<String, u32, String>;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_computation() {
        let cache = Arc::new(TestCache::new());
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            let invocations = invocations.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("Euro:2024-01-15".to_string(), move || async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&"Euro:2024-01-15".to_string()), Some(42));
    }

    #[tokio::test]
    async fn test_ready_value_is_memoized() {
        let cache = TestCache::new();
        let invocations = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute("k".to_string(), || {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    async { Ok(7) }
                })
                .await;
            assert_eq!(value, Ok(7));
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiters_share_the_error_and_it_is_not_cached() {
        let cache = Arc::new(TestCache::new());
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let invocations = invocations.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("k".to_string(), move || async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err::<u32, _>("upstream down".to_string())
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err("upstream down".to_string()));
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());

        // The next caller triggers a fresh attempt.
        let value = cache
            .get_or_compute("k".to_string(), || async { Ok(5) })
            .await;
        assert_eq!(value, Ok(5));
    }

    #[tokio::test]
    async fn test_independent_keys_do_not_share() {
        let cache = TestCache::new();
        let a = cache.get_or_compute("a".to_string(), || async { Ok(1) }).await;
        let b = cache.get_or_compute("b".to_string(), || async { Ok(2) }).await;
        assert_eq!((a, b), (Ok(1), Ok(2)));
        assert_eq!(cache.len(), 2);
    }
}
