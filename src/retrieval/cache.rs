//! Bounded LRU memoization keyed by normalized query text
//!
//! Used for fused rankings ([`ResultCache`]) and for query embeddings. Every
//! operation is infallible from the caller's side: eviction is silent and a
//! poisoned lock is recovered rather than surfaced.

use super::types::FusedResult;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Canonical cache key: trimmed, lowercased, internal whitespace collapsed.
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A cached value with its bookkeeping timestamps
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub created_at: Instant,
    pub last_access: Instant,
}

/// Hit/miss counters for one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Thread-safe bounded LRU cache
pub struct QueryCache<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Fused rankings keyed by normalized query
pub type ResultCache = QueryCache<Vec<FusedResult>>;

fn capacity_of(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

impl<V: Clone> QueryCache<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity_of(capacity))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up `key` (already normalized), refreshing its recency on a hit.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = Instant::now();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `value` under `key`, evicting the least recently used entry when full.
    pub fn put(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = Instant::now();
        let entry = CacheEntry {
            key: key.clone(),
            value,
            created_at: now,
            last_access: now,
        };

        if let Some((evicted, _)) = self.lock().push(key, entry) {
            tracing::trace!("Evicted cache entry '{}'", evicted);
        }
    }

    /// Entry metadata without touching recency
    pub fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.lock().peek(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Change capacity, evicting least recently used entries if shrinking
    pub fn resize(&self, capacity: usize) {
        self.lock().resize(capacity_of(capacity));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}
