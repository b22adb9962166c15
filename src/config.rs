//! Configuration Module
//!
//! Handles loading and managing synchronization parameters from environment
//! variables. TTLs are resource-specific rather than global: the more a view
//! must reflect recent mutations, the shorter its TTL, with the live update
//! channel compensating on the highest-volatility fields.

use std::env;
use std::time::Duration;

use crate::fetch::RetryPolicy;

/// Synchronization core configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// TTL for the cart and cart-count entries (highly volatile)
    pub cart_ttl: Duration,
    /// TTL for product listings (room and store pages)
    pub listing_ttl: Duration,
    /// TTL for single-product entries
    pub product_ttl: Duration,
    /// TTL for the category tree (low-volatility reference data)
    pub categories_ttl: Duration,
    /// Retry budget applied to cacheable reads
    pub retry: RetryPolicy,
    /// Delay granted to the push transport to finish its connection
    /// handshake before the first subscribe on a cold connection
    pub subscribe_settle_delay: Duration,
}

impl SyncConfig {
    /// Creates a new SyncConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CART_TTL_MS` - Cart/cart-count TTL in milliseconds (default: 30000)
    /// - `LISTING_TTL_MS` - Product listing TTL in milliseconds (default: 90000)
    /// - `PRODUCT_TTL_MS` - Single-product TTL in milliseconds (default: 120000)
    /// - `CATEGORIES_TTL_MS` - Category TTL in milliseconds (default: 600000)
    /// - `RETRY_MAX_ATTEMPTS` - Total attempts per read (default: 3)
    /// - `RETRY_BASE_DELAY_MS` - First backoff delay in milliseconds (default: 300)
    /// - `SUBSCRIBE_SETTLE_MS` - Cold-connection settle delay (default: 500)
    pub fn from_env() -> Self {
        Self {
            cart_ttl: Duration::from_millis(env_u64("CART_TTL_MS", 30_000)),
            listing_ttl: Duration::from_millis(env_u64("LISTING_TTL_MS", 90_000)),
            product_ttl: Duration::from_millis(env_u64("PRODUCT_TTL_MS", 120_000)),
            categories_ttl: Duration::from_millis(env_u64("CATEGORIES_TTL_MS", 600_000)),
            retry: RetryPolicy {
                max_attempts: env_u64("RETRY_MAX_ATTEMPTS", 3) as u32,
                base_delay: Duration::from_millis(env_u64("RETRY_BASE_DELAY_MS", 300)),
            },
            subscribe_settle_delay: Duration::from_millis(env_u64("SUBSCRIBE_SETTLE_MS", 500)),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cart_ttl: Duration::from_secs(30),
            listing_ttl: Duration::from_secs(90),
            product_ttl: Duration::from_secs(120),
            categories_ttl: Duration::from_secs(600),
            retry: RetryPolicy::default(),
            subscribe_settle_delay: Duration::from_millis(500),
        }
    }
}

/// Reads a u64 environment variable, falling back to a default.
fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.cart_ttl, Duration::from_secs(30));
        assert_eq!(config.listing_ttl, Duration::from_secs(90));
        assert_eq!(config.product_ttl, Duration::from_secs(120));
        assert_eq!(config.categories_ttl, Duration::from_secs(600));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.subscribe_settle_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CART_TTL_MS");
        env::remove_var("LISTING_TTL_MS");
        env::remove_var("PRODUCT_TTL_MS");
        env::remove_var("CATEGORIES_TTL_MS");
        env::remove_var("RETRY_MAX_ATTEMPTS");
        env::remove_var("RETRY_BASE_DELAY_MS");
        env::remove_var("SUBSCRIBE_SETTLE_MS");

        let config = SyncConfig::from_env();
        assert_eq!(config.cart_ttl, Duration::from_secs(30));
        assert_eq!(config.categories_ttl, Duration::from_secs(600));
        assert_eq!(config.retry.base_delay, Duration::from_millis(300));
    }

    #[test]
    fn test_cart_ttl_shorter_than_categories() {
        // Volatile collections must expire before reference data
        let config = SyncConfig::default();
        assert!(config.cart_ttl < config.listing_ttl);
        assert!(config.listing_ttl < config.categories_ttl);
    }
}
