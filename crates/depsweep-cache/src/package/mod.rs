//! Single-flight memoization over a [`CacheStore`]
//!
//! Concurrent requests for the same key share one computation: the first
//! requester installs a shared future in the in-flight map, everyone else
//! awaits a clone of it. The future writes the store and only then removes
//! itself from the map, so a requester always sees either the guard or the
//! stored value. Failures are returned to every waiter but never stored.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use depsweep_core::DepsweepError;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::key::{CacheKey, CacheValue};
use crate::store::{CacheStore, MemoryStore};
use crate::CacheResult;

/// Outcome shared between every waiter on one computation
pub type SharedResult = Result<CacheValue, Arc<DepsweepError>>;

type InFlight = Shared<BoxFuture<'static, SharedResult>>;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests answered from the store
    pub hits: u64,
    /// Requests that started a computation
    pub misses: u64,
    /// Requests that joined a computation already in flight
    pub coalesced: u64,
    /// Computations actually run
    pub computations: u64,
    /// Computations that failed
    pub failures: u64,
    /// Entries currently stored
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of requests that did not trigger a computation
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.coalesced;
        if total == 0 {
            return 0.0;
        }
        (self.hits + self.coalesced) as f64 / total as f64
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    computations: AtomicU64,
    failures: AtomicU64,
}

pub struct PackageCache {
    store: Arc<dyn CacheStore>,
    in_flight: Arc<DashMap<CacheKey, InFlight>>,
    counters: Arc<Counters>,
}

impl PackageCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Cache backed by a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the stored value for `key`, or run `compute` once across all
    /// concurrent callers and store its result.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> SharedResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<CacheValue>> + Send + 'static,
    {
        if let Some(value) = self.lookup(&key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache hit");
            return Ok(value);
        }

        let shared = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Joining in-flight computation");
                entry.get().clone()
            },
            Entry::Vacant(entry) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                let shared = self.start(key.clone(), compute());
                entry.insert(shared.clone());
                shared
            },
        };

        shared.await
    }

    fn start<Fut>(&self, key: CacheKey, computation: Fut) -> InFlight
    where
        Fut: Future<Output = CacheResult<CacheValue>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);
        let counters = Arc::clone(&self.counters);

        async move {
            // Another computation may have finished between our lookup and
            // taking the guard.
            let result = match store.get(&key) {
                Ok(Some(value)) => Ok(value),
                _ => {
                    counters.computations.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Computing cache entry");
                    match computation.await {
                        Ok(value) => {
                            if let Err(e) = store.put(key.clone(), value.clone()) {
                                warn!(key = %key, error = %e, "Failed to store cache entry");
                            }
                            Ok(value)
                        },
                        Err(e) => {
                            counters.failures.fetch_add(1, Ordering::Relaxed);
                            debug!(key = %key, error = %e, "Cache computation failed");
                            Err(Arc::new(e))
                        },
                    }
                },
            };
            in_flight.remove(&key);
            result
        }
        .boxed()
        .shared()
    }

    fn lookup(&self, key: &CacheKey) -> Option<CacheValue> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache store lookup failed, treating as miss");
                None
            },
        }
    }

    /// Number of computations currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Drop every stored entry. The only invalidation path.
    pub fn clear(&self) -> CacheResult<()> {
        debug!("Clearing package cache");
        self.store.clear()
    }

    pub fn flush(&self) -> CacheResult<()> {
        self.store.flush()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            computations: self.counters.computations.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            entries: self.store.len(),
        }
    }
}

impl Default for PackageCache {
    fn default() -> Self {
        Self::in_memory()
    }
}
