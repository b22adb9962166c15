//! Request Coalescer Module
//!
//! Ensures at most one in-flight network operation exists per cache key.
//! Concurrent callers for the same key share the leader's future and all
//! observe the identical result or the identical error; overlapping
//! component mounts and rapid re-renders collapse into a single fetch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

type SharedFetch = Shared<BoxFuture<'static, Result<Value>>>;
type PendingMap = Arc<Mutex<HashMap<String, SharedFetch>>>;

// == Request Coalescer ==
/// Per-key in-flight request deduplication.
#[derive(Default)]
pub struct RequestCoalescer {
    /// Pending operations, keyed by cache key. At most one entry per key.
    pending: PendingMap,
}

impl RequestCoalescer {
    // == Constructor ==
    /// Creates an empty coalescer.
    pub fn new() -> Self {
        Self::default()
    }

    // == Coalesce ==
    /// Runs `operation` for `key`, or joins the in-flight one.
    ///
    /// If a pending operation exists for `key`, its shared future is awaited
    /// and `operation` is dropped unexecuted. Otherwise `operation` becomes
    /// the leader; the pending entry is deregistered inside the shared
    /// future, before any waiter observes the settlement, so a caller
    /// arriving afterwards always starts a fresh operation.
    ///
    /// Errors pass through unaltered to every waiter.
    pub async fn coalesce<F>(&self, key: &str, operation: F) -> Result<Value>
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        let shared = {
            let mut pending = self.pending.lock().expect("pending map lock poisoned");
            match pending.get(key) {
                Some(in_flight) => {
                    debug!(key, "joining in-flight request");
                    in_flight.clone()
                }
                None => {
                    let map = Arc::clone(&self.pending);
                    let owned_key = key.to_string();
                    let leader = async move {
                        let result = operation.await;
                        map.lock()
                            .expect("pending map lock poisoned")
                            .remove(&owned_key);
                        result
                    }
                    .boxed()
                    .shared();
                    pending.insert(key.to_string(), leader.clone());
                    leader
                }
            }
        };

        shared.await
    }

    // == In Flight ==
    /// Number of currently pending operations.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().expect("pending map lock poisoned").len()
    }
}
