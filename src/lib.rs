//! Storesync - client-side data synchronization core
//!
//! Keeps a storefront web client's views consistent with the backend via a
//! TTL request cache with tag invalidation, in-flight request coalescing,
//! exponential-backoff retry, and a push-driven reconciliation pipeline for
//! real-time fields.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod live;
pub mod transport;

pub use cache::{CacheStats, CacheTag, TtlCache};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use fetch::{Mutation, RequestCoalescer, Resource, RetryPolicy, SyncClient};
pub use live::{EntityDelta, LiveBus, LiveCollection, LiveSubscription, Topic};
