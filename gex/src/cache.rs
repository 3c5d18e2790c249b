//! In-process cache of computed surfaces keyed by `(ticker, expiration)`.
//!
//! Entries are fresh for a fixed window after being written. Writes replace any previous
//! entry for the key (last write wins). The lock is only held for map operations.

use crate::model::Ticker;
use fnv::FnvHashMap;
use parking_lot::RwLock;
use std::time::{Duration, Instant};

/// Default freshness window (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct CacheKey {
    pub ticker: Ticker,
    pub expiration: String,
}

impl CacheKey {
    pub fn new(ticker: Ticker, expiration: impl Into<String>) -> Self {
        Self {
            ticker,
            expiration: expiration.into(),
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    written: Instant,
}

#[derive(Debug)]
pub struct SurfaceCache<V> {
    ttl: Duration,
    entries: RwLock<FnvHashMap<CacheKey, Entry<V>>>,
}

impl<V> SurfaceCache<V>
where
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(FnvHashMap::default()),
        }
    }

    /// Fresh value for `key`, if one was written less than the TTL ago.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<V> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.written) < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Write `value` for `key`, replacing any previous entry.
    pub fn insert(&self, key: CacheKey, value: V) {
        self.insert_at(key, value, Instant::now())
    }

    pub fn insert_at(&self, key: CacheKey, value: V, now: Instant) {
        self.entries.write().insert(key, Entry { value, written: now });
    }

    /// Drop stale entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.written) < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V> Default for SurfaceCache<V>
where
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
