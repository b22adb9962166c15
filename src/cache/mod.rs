//! Cache Module
//!
//! Provides the request cache: TTL expiry with lazy eviction, typed
//! invalidation tags, and deterministic key derivation.

mod entry;
mod key;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use key::{cache_key, CacheTag};
pub use stats::CacheStats;
pub use store::TtlCache;
