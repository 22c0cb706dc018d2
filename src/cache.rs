//! In-memory TTL Cache
//!
//! Generic key/value store with per-entry expiry, used to memoize repository
//! snapshots and generated documentation.
//!
//! ## Expiry
//!
//! An entry is logically absent once `now - stored_at > ttl`. Lookups evict
//! expired entries lazily; [`TtlCache::cleanup`] sweeps everything that has
//! expired, and [`TtlCache::spawn_sweeper`] runs that sweep periodically.
//!
//! Backed by `DashMap`, so a shared cache can be used from any task without an
//! outer lock. `keys()` is a point-in-time snapshot, not a transaction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::constants::cache as cache_constants;

/// Cache shared between the generator, the repository source and the service
pub type SharedCache<V> = Arc<TtlCache<V>>;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    /// Entries already expired but not yet evicted
    pub expired: usize,
}

/// Thread-safe TTL cache keyed by strings
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    pub fn shared(default_ttl: Duration) -> SharedCache<V> {
        Arc::new(Self::new(default_ttl))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store `value` under `key`, replacing any previous entry
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Store with the cache's default TTL
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Return the live value for `key`, evicting it if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();

        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            // Re-check under the write lock: a concurrent `set` may have refreshed it
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove one entry. Missing keys are a no-op.
    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Remove every entry whose key starts with `prefix`
    ///
    /// Returns how many entries were removed by this call.
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        self.keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| self.entries.remove(key).is_some())
            .count()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Point-in-time key set, possibly including expired-but-unswept keys
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of stored entries (live or not yet swept)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict every expired entry, returning how many were removed
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut stats = CacheStats {
            entries: 0,
            expired: 0,
        };
        for entry in self.entries.iter() {
            stats.entries += 1;
            if entry.value().is_expired(now) {
                stats.expired += 1;
            }
        }
        stats
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Run [`cleanup`](Self::cleanup) every `interval` on the current runtime
    ///
    /// The task holds a weak reference and exits once the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.cleanup();
                if removed > 0 {
                    debug!(removed, remaining = cache.len(), "Swept expired cache entries");
                }
            }
        })
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(Duration::from_secs(cache_constants::DEFAULT_TTL_SECS))
    }
}
