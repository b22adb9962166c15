//! Sync Client Module
//!
//! The cache-aware fetch façade composing cache, coalescer, and retry:
//! check cache → on miss, coalesce and retry the network call → store under
//! the resource's TTL → invalidate related tags on mutations. Each client
//! owns its own cache and coalescer; tests construct isolated instances
//! instead of sharing process-wide state.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheStats, TtlCache};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::fetch::{retry, Mutation, RequestCoalescer, Resource};
use crate::transport::{HttpTransport, Method};

// == Sync Client ==
/// Cache-aware fetch façade over an authenticated HTTP transport.
pub struct SyncClient {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<RwLock<TtlCache>>,
    coalescer: RequestCoalescer,
    config: SyncConfig,
}

impl SyncClient {
    // == Constructor ==
    /// Creates a client with the given transport and configuration.
    pub fn new(transport: Arc<dyn HttpTransport>, config: SyncConfig) -> Self {
        Self {
            transport,
            cache: Arc::new(RwLock::new(TtlCache::new())),
            coalescer: RequestCoalescer::new(),
            config,
        }
    }

    // == Fetch ==
    /// Returns the resource payload, from cache when a live entry exists.
    ///
    /// On a miss the network call goes through the coalescer (at most one
    /// in-flight call per key) and the retry executor, and the result is
    /// stored under the resource's TTL and tags. A failed fetch writes
    /// nothing and propagates the error untouched.
    pub async fn fetch(&self, resource: &Resource) -> Result<Value> {
        self.fetch_inner(resource, false).await
    }

    // == Fetch Fresh ==
    /// Like [`SyncClient::fetch`] but skips the cache read. The fresh
    /// result still coalesces with concurrent callers and is stored.
    pub async fn fetch_fresh(&self, resource: &Resource) -> Result<Value> {
        self.fetch_inner(resource, true).await
    }

    async fn fetch_inner(&self, resource: &Resource, force: bool) -> Result<Value> {
        let key = resource.cache_key();

        if !force {
            // get() takes the write lock: expired entries are evicted on read
            if let Some(value) = self.cache.write().await.get(&key) {
                debug!(key, "cache hit");
                return Ok(value);
            }
        }

        let transport = Arc::clone(&self.transport);
        let policy = self.config.retry.clone();
        let path = resource.path();
        let value = self
            .coalescer
            .coalesce(&key, async move {
                retry(&policy, || transport.request(Method::Get, &path, None)).await
            })
            .await?;

        let mut cache = self.cache.write().await;
        cache.set(
            key,
            value.clone(),
            resource.ttl(&self.config),
            resource.tags(),
        );
        Ok(value)
    }

    // == Mutate ==
    /// Performs a write, bypassing the cache, then invalidates every tag
    /// the mutation names. A failed write invalidates nothing.
    ///
    /// Mutations get a single attempt; the backend does not guarantee
    /// idempotency, so retrying is left to the caller's discretion.
    pub async fn mutate(&self, mutation: &Mutation) -> Result<Value> {
        let value = self
            .transport
            .request(mutation.method(), &mutation.path(), mutation.body())
            .await?;

        let mut cache = self.cache.write().await;
        for tag in mutation.invalidates() {
            cache.invalidate(&tag);
        }
        Ok(value)
    }

    // == Clear Cache ==
    /// Drops every cached entry. Called at logout.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    // == Cache Stats ==
    /// Snapshot of the cache counters.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    // == In Flight ==
    /// Number of currently coalesced in-flight requests.
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }
}
