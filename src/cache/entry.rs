//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::cache::CacheTag;

// == Cache Entry ==
/// Represents a single cache entry with payload and expiry metadata.
///
/// Every entry expires; the page-lifetime cache holds nothing forever.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored JSON payload
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Invalidation tags this entry answers to
    pub tags: HashSet<CacheTag>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now.
    ///
    /// # Arguments
    /// * `value` - The payload to store
    /// * `ttl` - Time to live
    /// * `tags` - Invalidation tags the entry belongs to
    pub fn new(value: Value, ttl: Duration, tags: HashSet<CacheTag>) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl.as_millis() as u64,
            tags,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired when the current time is
    /// greater than or equal to the expiration time, so a read at the exact
    /// expiry instant already misses.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    ///
    /// Useful for debugging and statistics.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let now = current_timestamp_ms();
        self.expires_at.saturating_sub(now)
    }

    /// Returns true if the entry carries the given invalidation tag.
    pub fn has_tag(&self, tag: &CacheTag) -> bool {
        self.tags.contains(tag)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
