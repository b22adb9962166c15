//! Error types for the synchronization core
//!
//! Provides unified error handling using thiserror. The enum is a closed
//! classification: the retry executor branches on the variant, never on a
//! bare numeric threshold, and every variant is cloneable so coalesced
//! waiters can all receive the same failure.

use thiserror::Error;

// == Sync Error Enum ==
/// Unified error type for the synchronization core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The backend answered with an HTTP error status.
    ///
    /// Statuses below 500 are caller mistakes (bad input, auth, not-found);
    /// 500 and above are transient server failures.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never reached the backend (connection refused, DNS, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// The transport-level request timeout elapsed.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The push transport rejected or lost a topic subscription.
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// An inbound push payload could not be interpreted as an entity delta.
    #[error("Malformed delta: {0}")]
    MalformedDelta(String),
}

impl SyncError {
    // == Retryability ==
    /// Returns true if retrying the failed operation could succeed.
    ///
    /// Client errors (status < 500) represent caller mistakes and retrying
    /// cannot help; server errors, timeouts, and network failures are
    /// transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Api { status, .. } => *status >= 500,
            SyncError::Network(_) | SyncError::Timeout(_) => true,
            SyncError::Subscription(_) | SyncError::MalformedDelta(_) => false,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the synchronization core.
pub type Result<T> = std::result::Result<T, SyncError>;
