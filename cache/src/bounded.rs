//! Cost-bounded LRU cache implementation.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::stats::CacheStats;

/// A thread-safe, cost-bounded key-value cache.
///
/// Every entry carries a caller-supplied cost. The sum of the costs of all
/// live entries never exceeds the ceiling given to [`BoundedCache::new`]:
/// inserting evicts least-recently-used entries until the new entry fits.
///
/// # Semantics
///
/// - **get**: promotes the entry to most-recently-used on a hit
/// - **set**: replaces an existing key (its old cost is released first);
///   an entry whose cost alone exceeds the ceiling is silently not cached
/// - **remove**: idempotent
///
/// Cloning a `BoundedCache` yields another handle to the same storage, so a
/// single instance can be handed to every collaborator that needs it.
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Arc<BoundedCacheInner<K, V>>,
}

struct BoundedCacheInner<K: Hash + Eq, V> {
    limit: usize,
    state: Mutex<CacheState<K, V>>,
}

struct CacheState<K: Hash + Eq, V> {
    entries: LruCache<K, CacheEntry<V>>,
    total_cost: usize,
    stats: CacheStats,
}

struct CacheEntry<V> {
    value: V,
    cost: usize,
    last_access: Instant,
}

impl<K: Hash + Eq, V> Clone for BoundedCache<K, V> {
    fn clone(&self) -> Self {
        BoundedCache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Hash + Eq, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BoundedCache")
            .field("limit", &self.inner.limit)
            .field("total_cost", &state.total_cost)
            .field("len", &state.entries.len())
            .finish()
    }
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// Creates an empty cache whose entries may cost at most
    /// `total_cost_limit` in aggregate.
    pub fn new(total_cost_limit: usize) -> Self {
        BoundedCache {
            inner: Arc::new(BoundedCacheInner {
                limit: total_cost_limit,
                state: Mutex::new(CacheState {
                    entries: LruCache::unbounded(),
                    total_cost: 0,
                    stats: CacheStats::default(),
                }),
            }),
        }
    }

    /// Returns the configured total-cost ceiling.
    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// Returns the summed cost of all entries currently held.
    pub fn total_cost(&self) -> usize {
        self.inner.state.lock().total_cost
    }

    /// Returns the number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.state.lock().stats
    }

    /// Looks up `key`, marking the entry as most recently used on a hit.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = Instant::now();
                state.stats.hits += 1;
                Some(entry.value.clone())
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Reports whether `key` is present without touching its recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.state.lock().entries.contains(key)
    }

    /// Returns when `key` was last inserted or read, without touching its
    /// recency.
    pub fn last_access<Q>(&self, key: &Q) -> Option<Instant>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner
            .state
            .lock()
            .entries
            .peek(key)
            .map(|entry| entry.last_access)
    }

    /// Inserts or replaces `key`.
    ///
    /// If `cost` alone exceeds the ceiling the cache is left untouched.
    /// Otherwise least-recently-used entries are evicted until the new entry
    /// fits. Eviction and insertion happen under one lock.
    pub fn set(&self, key: K, value: V, cost: usize) {
        let limit = self.inner.limit;
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        if cost > limit {
            state.stats.rejected += 1;
            debug!(cost, limit, "cache: entry larger than ceiling, not cached");
            return;
        }

        if let Some(old) = state.entries.pop(&key) {
            state.total_cost -= old.cost;
        }

        while state.total_cost.saturating_add(cost) > limit {
            let Some((_, evicted)) = state.entries.pop_lru() else {
                break;
            };
            state.total_cost -= evicted.cost;
            state.stats.evictions += 1;
            debug!(
                cost = evicted.cost,
                total = state.total_cost,
                "cache: evicted least recently used entry"
            );
        }

        state.entries.put(
            key,
            CacheEntry {
                value,
                cost,
                last_access: Instant::now(),
            },
        );
        state.total_cost += cost;
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let entry = state.entries.pop(key)?;
        state.total_cost -= entry.cost;
        Some(entry.value)
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.entries.clear();
        state.total_cost = 0;
    }
}
