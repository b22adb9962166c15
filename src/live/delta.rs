//! Entity Delta Module
//!
//! Normalizes raw push payloads into entity deltas and names the topics
//! surfaces subscribe to. A delta is ephemeral: it is applied to whatever
//! local collections currently reference the entity and never stored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{Result, SyncError};

// == Topic ==
/// A named push channel. Constructors keep topic strings deterministic
/// across surfaces so overlapping subscriptions share one transport topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Stock/rating updates for products listed in one room.
    pub fn room_products(room_id: u64) -> Self {
        Topic(format!("rooms.{}.products", room_id))
    }

    /// Stock/rating updates for the public store listing.
    pub fn store_products() -> Self {
        Topic("store.products".to_string())
    }

    /// Updates for a single product detail view.
    pub fn product(id: u64) -> Self {
        Topic(format!("products.{}", id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Entity Delta ==
/// A partial update to one entity: its identifier plus only the fields
/// that changed.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDelta {
    /// Identifier of the target entity (matched against each item's `id`)
    pub entity_id: Value,
    /// Changed fields, already normalized to local field names
    pub changed: Map<String, Value>,
    /// When the delta arrived at this client
    pub received_at: DateTime<Utc>,
}

impl EntityDelta {
    // == From Payload ==
    /// Decodes a raw push payload.
    ///
    /// The wire shape is flat: an identifier field (`productId`, `entityId`,
    /// or `id`) alongside the changed fields, e.g.
    /// `{"productId": 42, "current_stock": 3}`. Wire field names are
    /// normalized to the local schema (`current_stock` → `stock`).
    ///
    /// # Errors
    /// [`SyncError::MalformedDelta`] when the payload is not an object,
    /// carries no identifier, or changes no fields.
    pub fn from_payload(payload: Value) -> Result<Self> {
        let obj = payload
            .as_object()
            .ok_or_else(|| SyncError::MalformedDelta("payload is not an object".to_string()))?;

        let entity_id = ID_FIELDS
            .iter()
            .find_map(|name| obj.get(*name))
            .cloned()
            .ok_or_else(|| SyncError::MalformedDelta("missing entity identifier".to_string()))?;

        let changed: Map<String, Value> = obj
            .iter()
            .filter(|(name, _)| !ID_FIELDS.contains(&name.as_str()))
            .map(|(name, value)| (normalize_field(name).to_string(), value.clone()))
            .collect();

        if changed.is_empty() {
            return Err(SyncError::MalformedDelta(
                "delta changes no fields".to_string(),
            ));
        }

        Ok(Self {
            entity_id,
            changed,
            received_at: Utc::now(),
        })
    }
}

/// Identifier field names accepted on the wire, in priority order.
const ID_FIELDS: [&str; 3] = ["productId", "entityId", "id"];

/// Maps wire field names onto the local entity schema.
fn normalize_field(name: &str) -> &str {
    match name {
        "current_stock" | "new_stock" | "newStock" => "stock",
        "average_rating" | "averageRating" => "rating",
        "reviews_count" | "reviewsCount" => "review_count",
        other => other,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topic_names_are_deterministic() {
        assert_eq!(Topic::room_products(5).as_str(), "rooms.5.products");
        assert_eq!(Topic::store_products().as_str(), "store.products");
        assert_eq!(Topic::product(42).as_str(), "products.42");
        assert_eq!(Topic::room_products(5), Topic::room_products(5));
    }

    #[test]
    fn test_delta_from_stock_payload() {
        let delta =
            EntityDelta::from_payload(json!({"productId": 42, "current_stock": 3})).unwrap();

        assert_eq!(delta.entity_id, json!(42));
        assert_eq!(delta.changed.get("stock"), Some(&json!(3)));
        assert_eq!(delta.changed.len(), 1);
    }

    #[test]
    fn test_delta_normalizes_rating_fields() {
        let delta = EntityDelta::from_payload(
            json!({"productId": 7, "average_rating": 4.5, "reviews_count": 12}),
        )
        .unwrap();

        assert_eq!(delta.changed.get("rating"), Some(&json!(4.5)));
        assert_eq!(delta.changed.get("review_count"), Some(&json!(12)));
    }

    #[test]
    fn test_delta_unknown_fields_pass_through() {
        let delta = EntityDelta::from_payload(json!({"id": 1, "price": 999})).unwrap();
        assert_eq!(delta.changed.get("price"), Some(&json!(999)));
    }

    #[test]
    fn test_delta_rejects_non_object() {
        let err = EntityDelta::from_payload(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, SyncError::MalformedDelta(_)));
    }

    #[test]
    fn test_delta_rejects_missing_identifier() {
        let err = EntityDelta::from_payload(json!({"current_stock": 3})).unwrap_err();
        assert!(matches!(err, SyncError::MalformedDelta(_)));
    }

    #[test]
    fn test_delta_rejects_empty_change_set() {
        let err = EntityDelta::from_payload(json!({"productId": 42})).unwrap_err();
        assert!(matches!(err, SyncError::MalformedDelta(_)));
    }
}
