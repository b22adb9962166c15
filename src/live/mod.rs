//! Live Update Module
//!
//! The push half of the synchronization core: topic subscriptions over the
//! pub/sub transport, delta normalization, and the reconciler that applies
//! deltas to each surface's local collection. Push events flow out of band
//! and bypass the TTL cache, which is intentionally not authoritative for
//! real-time fields such as stock and rating.

mod channel;
mod collection;
mod delta;

// Re-export public types
pub use channel::{LiveBus, LiveSubscription, SubscriptionState};
pub use collection::LiveCollection;
pub use delta::{EntityDelta, Topic};
