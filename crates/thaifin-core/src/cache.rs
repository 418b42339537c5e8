//! In-memory, capacity-bounded TTL cache for upstream payloads.
//!
//! Entries expire by data class ([`TtlClass`]). A failed fetch never writes,
//! so an entry that just expired stays in place until a refresh succeeds.
//! Concurrent callers for the same missing key share one fetch.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Defines the behavior of the in-memory cache for an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Read from the cache if a non-expired entry is present;
    /// otherwise, fetch from the network and write the response to the cache. (Default)
    #[default]
    Use,
    /// Always fetch from the network, bypassing any cached entry,
    /// and write the new response to the cache.
    Refresh,
    /// Always fetch from the network and do not read from or write to the cache.
    Bypass,
}

/// Volatility class of cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    /// Quarterly and yearly statements.
    Fundamentals,
    /// Price-adjacent values (beta, yields, multiples, dividends).
    Market,
    /// Security universe snapshots.
    Listing,
}

/// TTL per [`TtlClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub fundamentals: Duration,
    pub market: Duration,
    pub listing: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            fundamentals: Duration::from_secs(24 * 60 * 60),
            market: Duration::from_secs(6 * 60 * 60),
            listing: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl TtlPolicy {
    pub const fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Fundamentals => self.fundamentals,
            TtlClass::Market => self.market,
            TtlClass::Listing => self.listing,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug)]
struct CacheInner<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    gates: Mutex<HashMap<String, Gate>>,
    mode: CacheMode,
}

/// Thread-safe LRU cache with per-entry expiry. Cloning shares the store.
#[derive(Debug, Clone)]
pub struct CacheStore<V> {
    inner: Arc<CacheInner<V>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V: Clone> CacheStore<V> {
    /// Create a store holding at most `max_entries` entries (at least one).
    pub fn new(max_entries: usize) -> Self {
        Self::with_mode(max_entries, CacheMode::Use)
    }

    pub fn with_mode(max_entries: usize, mode: CacheMode) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(LruCache::new(capacity)),
                gates: Mutex::new(HashMap::new()),
                mode,
            }),
        }
    }

    /// Create a store that never reads or writes.
    pub fn disabled() -> Self {
        Self::with_mode(1, CacheMode::Bypass)
    }

    pub fn mode(&self) -> CacheMode {
        self.inner.mode
    }

    /// Live value for `key`, if any. Marks the entry as recently used.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = lock(&self.inner.entries);
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Stores `value` under `key` until `now + ttl`, replacing any previous entry.
    ///
    /// When the store is full, expired entries are purged first; if none were
    /// expired the least-recently-used entry is evicted.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = lock(&self.inner.entries);
        if !entries.contains(&key) && entries.len() >= entries.cap().get() {
            let expired: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| !entry.is_live(now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                entries.pop(&key);
            }
        }
        if let Some((evicted, _)) = entries.push(
            key.clone(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        ) {
            if evicted != key {
                tracing::debug!(key = %evicted, "evicted least-recently-used cache entry");
            }
        }
    }

    /// Returns the live value for `key` or runs `fetch` and caches its success.
    ///
    /// Follows the store's [`CacheMode`]. See [`CacheStore::get_or_fetch_with`].
    pub async fn get_or_fetch<E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_fetch_with(self.inner.mode, key, ttl, fetch)
            .await
    }

    /// Returns the live value for `key` or runs `fetch` and caches its success.
    ///
    /// Concurrent callers for the same key wait on a per-key gate, so only the
    /// first pays for the fetch. Errors are returned to the caller and never
    /// stored.
    pub async fn get_or_fetch_with<E, F, Fut>(
        &self,
        mode: CacheMode,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        match mode {
            CacheMode::Bypass => fetch().await,
            CacheMode::Refresh => {
                let value = fetch().await?;
                self.put(key, value.clone(), ttl);
                Ok(value)
            }
            CacheMode::Use => {
                if let Some(value) = self.get(key) {
                    tracing::debug!(key, "cache hit");
                    return Ok(value);
                }

                let gate = self.gate(key);
                let result = {
                    let _permit = gate.lock().await;
                    if let Some(value) = self.get(key) {
                        tracing::debug!(key, "cache filled while waiting");
                        Ok(value)
                    } else {
                        tracing::debug!(key, "cache miss");
                        match fetch().await {
                            Ok(value) => {
                                self.put(key, value.clone(), ttl);
                                Ok(value)
                            }
                            Err(error) => Err(error),
                        }
                    }
                };
                self.release_gate(key, &gate);
                result
            }
        }
    }

    fn gate(&self, key: &str) -> Gate {
        let mut gates = lock(&self.inner.gates);
        Arc::clone(gates.entry(key.to_owned()).or_default())
    }

    fn release_gate(&self, key: &str, gate: &Gate) {
        let mut gates = lock(&self.inner.gates);
        // One reference in the map, one held by the caller.
        if Arc::strong_count(gate) <= 2 {
            gates.remove(key);
        }
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_live(&self, key: &str) -> bool {
        let now = Instant::now();
        lock(&self.inner.entries)
            .peek(key)
            .is_some_and(|entry| entry.is_live(now))
    }
}
