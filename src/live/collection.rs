//! Live Collection Module
//!
//! The reconciler: a UI surface's local copy of an entity collection,
//! updated in place by push deltas. Applying a delta replaces only the
//! changed fields of the matched entity and swaps that one handle; every
//! other entity keeps pointer identity, so unrelated items never re-render.
//!
//! The collection also arbitrates the refetch-versus-push race: a refetched
//! snapshot adopts pushed field values that are newer than the moment the
//! fetch started, instead of clobbering them with the server's older read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::live::EntityDelta;

// == Live Collection ==
/// A surface-owned entity list reconciled against push deltas.
#[derive(Debug, Default)]
pub struct LiveCollection {
    /// Current items; the Arc per item is the identity UI layers key on
    items: Vec<Arc<Value>>,
    /// Last push instant per (entity id, field), for fetch arbitration
    pushed_at: HashMap<(String, String), Instant>,
}

impl LiveCollection {
    // == Constructors ==
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection from an initial fetch result.
    pub fn from_items(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter().map(Arc::new).collect(),
            pushed_at: HashMap::new(),
        }
    }

    // == Accessors ==
    pub fn items(&self) -> &[Arc<Value>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item whose `id` equals `entity_id`, if present.
    pub fn find(&self, entity_id: &Value) -> Option<&Arc<Value>> {
        self.items
            .iter()
            .find(|item| item.get("id") == Some(entity_id))
    }

    // == Apply ==
    /// Reconciles one push delta into the collection.
    ///
    /// Only the matched entity's changed fields are replaced; its other
    /// fields and every other entity are untouched (unchanged entities
    /// keep `Arc` pointer identity). An unknown entity id or a non-object
    /// target is logged and ignored; a best-effort stream must not crash
    /// the surface.
    pub fn apply(&mut self, delta: &EntityDelta) {
        let position = self
            .items
            .iter()
            .position(|item| item.get("id") == Some(&delta.entity_id));

        let Some(position) = position else {
            debug!(entity_id = %delta.entity_id, "delta for entity not in collection, ignoring");
            return;
        };

        let Some(existing) = self.items[position].as_object() else {
            warn!(entity_id = %delta.entity_id, "delta target is not an object, ignoring");
            return;
        };

        let mut updated = existing.clone();
        let now = Instant::now();
        let id_key = delta.entity_id.to_string();
        for (field, value) in &delta.changed {
            updated.insert(field.clone(), value.clone());
            self.pushed_at.insert((id_key.clone(), field.clone()), now);
        }

        self.items[position] = Arc::new(Value::Object(updated));
    }

    // == Merge Fetch ==
    /// Replaces the collection with a refetched snapshot, keeping any field
    /// a live push touched after `fetch_started`.
    ///
    /// Both refetch and push derive from the same backend, so the only
    /// possible divergence is ordering: a fetch that was already in flight
    /// when a delta arrived carries an older read of that field, and
    /// adopting it would visibly revert stock or rating in an open tab.
    ///
    /// Push timestamps older than `fetch_started` are pruned; the snapshot
    /// supersedes them.
    pub fn merge_fetch(&mut self, fetched: Vec<Value>, fetch_started: Instant) {
        let mut next = Vec::with_capacity(fetched.len());

        for item in fetched {
            let Some(id) = item.get("id").cloned() else {
                next.push(Arc::new(item));
                continue;
            };
            let id_key = id.to_string();

            let fresher_fields: Vec<String> = self
                .pushed_at
                .iter()
                .filter(|((entity, _), at)| *entity == id_key && **at > fetch_started)
                .map(|((_, field), _)| field.clone())
                .collect();

            if fresher_fields.is_empty() {
                next.push(Arc::new(item));
                continue;
            }

            let (Some(current), Some(fetched_obj)) = (self.find(&id), item.as_object()) else {
                next.push(Arc::new(item));
                continue;
            };

            let mut merged = fetched_obj.clone();
            for field in fresher_fields {
                if let Some(pushed_value) = current.get(&field) {
                    merged.insert(field, pushed_value.clone());
                }
            }
            next.push(Arc::new(Value::Object(merged)));
        }

        self.pushed_at.retain(|_, at| *at > fetch_started);
        self.items = next;
    }
}
