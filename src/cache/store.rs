//! TTL Cache Store Module
//!
//! The request cache: a key/value store mapping cache keys to JSON payloads
//! with per-entry expiry and typed invalidation tags. Expired entries are
//! evicted lazily on read; there is no background sweep and no capacity
//! bound, since the cache lives for one page lifetime and mutations
//! invalidate aggressively.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, CacheTag};

// == TTL Cache ==
/// In-memory TTL cache with tag-based invalidation.
///
/// Methods take `&mut self`; the owner wraps the cache in an
/// `Arc<RwLock<..>>` for shared access.
#[derive(Debug, Default)]
pub struct TtlCache {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
}

impl TtlCache {
    // == Constructor ==
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Stores a payload under `key` with the given TTL and tags.
    ///
    /// If the key already exists, the entry is overwritten and its TTL and
    /// tags are reset. No error conditions.
    pub fn set(&mut self, key: String, value: Value, ttl: Duration, tags: Vec<CacheTag>) {
        let entry = CacheEntry::new(value, ttl, tags.into_iter().collect());
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a payload by key.
    ///
    /// Returns `None` if the key is absent or the entry has expired.
    /// Expired entries are removed as a side effect of the read and counted
    /// as misses, so a value past its expiry is never observable.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                self.entries.remove(key);
                self.stats.set_total_entries(self.entries.len());
                self.stats.record_expiration();
                self.stats.record_miss();
                None
            } else {
                let value = entry.value.clone();
                self.stats.record_hit();
                Some(value)
            }
        } else {
            self.stats.record_miss();
            None
        }
    }

    // == Invalidate ==
    /// Removes every entry carrying `tag`, by exact tag membership.
    ///
    /// Returns the number of entries removed. Mutations call this for each
    /// collection that could now be stale; a tag nothing carries is a no-op.
    pub fn invalidate(&mut self, tag: &CacheTag) -> usize {
        let stale_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.has_tag(tag))
            .map(|(key, _)| key.clone())
            .collect();

        let count = stale_keys.len();
        for key in stale_keys {
            self.entries.remove(&key);
        }

        if count > 0 {
            debug!(tag = %tag, removed = count, "cache invalidation");
        }

        self.stats.record_invalidations(count as u64);
        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Clear ==
    /// Drops all entries. Used at logout and explicit cache-reset points.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.stats.set_total_entries(0);
        if count > 0 {
            debug!(removed = count, "cache cleared");
        }
    }

    // == Contains ==
    /// Returns true if a live (non-expired) entry exists for `key`.
    ///
    /// Does not touch stats or evict; diagnostic use only.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included until
    /// they are lazily evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
