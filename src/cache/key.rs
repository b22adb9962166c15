//! Cache Key Module
//!
//! Deterministic cache-key derivation and the typed invalidation tag system.
//!
//! Keys are derived from an endpoint name plus canonically ordered
//! parameters, so identical logical requests always produce identical keys
//! and distinct parameter sets never collide. Invalidation uses exact tag
//! membership instead of key-substring matching, which removes the
//! false-positive/false-negative risk of ad hoc prefixes.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

// == Cache Tag ==
/// Typed invalidation tag carried by cache entries.
///
/// Each mutation enumerates the tags it staleifies; `TtlCache::invalidate`
/// drops every entry carrying the tag, by exact match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheTag {
    /// All listings scoped to one room
    Room(u64),
    /// The public store listing, any page or search
    StoreListing,
    /// One product's detail entry
    Product(u64),
    /// The cart and its item count
    Cart,
    /// The category tree
    Categories,
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTag::Room(id) => write!(f, "room:{}", id),
            CacheTag::StoreListing => write!(f, "store-listing"),
            CacheTag::Product(id) => write!(f, "product:{}", id),
            CacheTag::Cart => write!(f, "cart"),
            CacheTag::Categories => write!(f, "categories"),
        }
    }
}

// == Key Derivation ==
/// Builds a deterministic cache key from an endpoint name and parameters.
///
/// Parameters are sorted by name before serialization, so insertion order
/// never changes the key. Absent (`None`) parameters are skipped entirely,
/// keeping `page=None` and a missing `page` identical.
///
/// # Arguments
/// * `endpoint` - Logical endpoint name (e.g. `store_products`)
/// * `params` - Name/value pairs identifying the request
pub fn cache_key(endpoint: &str, params: &[(&str, Option<Value>)]) -> String {
    let ordered: BTreeMap<&str, &Value> = params
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (*name, v)))
        .collect();

    if ordered.is_empty() {
        return endpoint.to_string();
    }

    let mut key = String::from(endpoint);
    for (name, value) in ordered {
        key.push('_');
        key.push_str(name);
        key.push('=');
        // Canonical JSON of a scalar is stable; objects go through the
        // same sorted-map treatment by serde_json's BTreeMap-backed Value.
        key.push_str(&value.to_string());
    }
    key
}
