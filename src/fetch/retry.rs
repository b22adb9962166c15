//! Retry Executor Module
//!
//! Wraps a single asynchronous operation with bounded exponential-backoff
//! retry. Classification comes from the closed [`SyncError`] enum: client
//! errors short-circuit immediately, transient errors burn through the
//! attempt budget.
//!
//! Only idempotent operations belong here; callers of non-idempotent
//! mutations use a single-attempt policy.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Result;

// == Retry Policy ==
/// Attempt budget and backoff base for one retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the initial one included. `0` is treated as `1`.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A single attempt, no backoff. For non-idempotent callers.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before the i-th retry (0-indexed): `base_delay × 2^i`.
    pub fn backoff_delay(&self, retry_index: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry_index)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(300),
        }
    }
}

// == Retry ==
/// Invokes `operation` until it succeeds, fails fatally, or exhausts the
/// attempt budget. The last error propagates unaltered.
///
/// # Arguments
/// * `policy` - Attempt budget and backoff base
/// * `operation` - Factory producing a fresh future per attempt
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let budget = policy.max_attempts.max(1);
    let mut failures = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => {
                debug!(error = %err, "fatal error, not retrying");
                return Err(err);
            }
            Err(err) => {
                failures += 1;
                if failures >= budget {
                    warn!(error = %err, attempts = failures, "retry budget exhausted");
                    return Err(err);
                }
                let delay = policy.backoff_delay(failures - 1);
                debug!(
                    error = %err,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, backing off"
                );
                sleep(delay).await;
            }
        }
    }
}
