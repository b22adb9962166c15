//! Fetch Module
//!
//! The request/response half of the synchronization core: retry executor,
//! request coalescer, the typed resource table, and the cache-aware fetch
//! façade composing them.

mod client;
mod coalescer;
mod resource;
mod retry;

// Re-export public types
pub use client::SyncClient;
pub use coalescer::RequestCoalescer;
pub use resource::{Mutation, Resource};
pub use retry::{retry, RetryPolicy};
