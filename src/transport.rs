//! Transport Seams
//!
//! Trait contracts for the two collaborators this core is built against: an
//! authenticated HTTP client and a WebSocket-backed pub/sub client. Both are
//! owned by excluded subsystems; the core only depends on these interfaces,
//! and tests inject instrumented fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SyncError};

// == HTTP Method ==
/// HTTP method for a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Returns the canonical method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

// == HTTP Transport ==
/// A generic authenticated HTTP client.
///
/// The implementation enforces its own request timeout; a timeout surfaces
/// as [`SyncError::Timeout`] and is treated like any other transient error.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs a single request and returns the decoded JSON body.
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value>;
}

// == Push Transport ==
/// Handlers attached to one topic subscription.
///
/// `on_update` receives the raw push payload; decoding into an entity delta
/// happens downstream, where decode failures are swallowed and logged.
pub struct PushHandlers {
    pub on_update: Box<dyn Fn(Value) + Send + Sync>,
    pub on_subscribed: Box<dyn Fn() + Send + Sync>,
    pub on_error: Box<dyn Fn(SyncError) + Send + Sync>,
}

/// Opaque handle identifying one transport-level topic subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// A WebSocket-backed pub/sub client with its own reconnect logic.
pub trait PushTransport: Send + Sync {
    /// Opens a subscription for `topic`; events flow into `handlers`.
    fn subscribe(&self, topic: &str, handlers: PushHandlers) -> Result<SubscriptionHandle>;

    /// Tears down a subscription. Safe to call with an already-dead handle.
    fn unsubscribe(&self, handle: SubscriptionHandle);

    /// Whether the underlying connection has completed its handshake.
    fn is_connected(&self) -> bool;
}
