//! Resource Module
//!
//! The typed fetch table: every cacheable read and every cache-bypassing
//! mutation the storefront client performs, each knowing its endpoint,
//! cache key, TTL class, and invalidation tags. Mutations enumerate the
//! full set of collections they could staleify; this is the manual
//! dependency graph the cache relies on.

use std::time::Duration;

use serde_json::{json, Value};

use crate::cache::{cache_key, CacheTag};
use crate::config::SyncConfig;
use crate::transport::Method;

// == Resource ==
/// A cacheable read, one variant per logical collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Public store listing, paginated and optionally filtered
    StoreProducts { page: u32, search: Option<String> },
    /// Products listed in one room, paginated
    RoomProducts { room_id: u64, page: u32 },
    /// Single product detail
    Product { id: u64 },
    /// The current user's cart
    Cart,
    /// The cart badge count
    CartCount,
    /// The category tree
    Categories,
}

impl Resource {
    // == Cache Key ==
    /// Deterministic cache key: identical logical requests always produce
    /// identical keys, distinct parameter sets never collide.
    pub fn cache_key(&self) -> String {
        match self {
            Resource::StoreProducts { page, search } => cache_key(
                "store_products",
                &[
                    ("page", Some(json!(page))),
                    ("search", search.as_ref().map(|s| json!(s))),
                ],
            ),
            Resource::RoomProducts { room_id, page } => cache_key(
                "products_room",
                &[("room", Some(json!(room_id))), ("page", Some(json!(page)))],
            ),
            Resource::Product { id } => cache_key("product", &[("id", Some(json!(id)))]),
            Resource::Cart => cache_key("cart", &[]),
            Resource::CartCount => cache_key("cart_count", &[]),
            Resource::Categories => cache_key("categories", &[]),
        }
    }

    // == Path ==
    /// Request path for the backing REST endpoint.
    pub fn path(&self) -> String {
        match self {
            Resource::StoreProducts { page, search } => match search {
                Some(term) => format!("/api/store/products?page={}&search={}", page, term),
                None => format!("/api/store/products?page={}", page),
            },
            Resource::RoomProducts { room_id, page } => {
                format!("/api/rooms/{}/products?page={}", room_id, page)
            }
            Resource::Product { id } => format!("/api/products/{}", id),
            Resource::Cart => "/api/cart".to_string(),
            Resource::CartCount => "/api/cart/count".to_string(),
            Resource::Categories => "/api/categories".to_string(),
        }
    }

    // == Tags ==
    /// Invalidation tags the cached entry carries.
    pub fn tags(&self) -> Vec<CacheTag> {
        match self {
            Resource::StoreProducts { .. } => vec![CacheTag::StoreListing],
            Resource::RoomProducts { room_id, .. } => vec![CacheTag::Room(*room_id)],
            Resource::Product { id } => vec![CacheTag::Product(*id)],
            Resource::Cart | Resource::CartCount => vec![CacheTag::Cart],
            Resource::Categories => vec![CacheTag::Categories],
        }
    }

    // == TTL ==
    /// Resource-specific TTL. Volatile collections expire far sooner than
    /// reference data; the live channel covers the gap on stock and rating.
    pub fn ttl(&self, config: &SyncConfig) -> Duration {
        match self {
            Resource::StoreProducts { .. } | Resource::RoomProducts { .. } => config.listing_ttl,
            Resource::Product { .. } => config.product_ttl,
            Resource::Cart | Resource::CartCount => config.cart_ttl,
            Resource::Categories => config.categories_ttl,
        }
    }
}

// == Mutation ==
/// A cache-bypassing write. The write itself never touches the cache; on
/// success every tag in [`Mutation::invalidates`] is dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateProduct { room_id: u64, body: Value },
    UpdateProduct { id: u64, room_id: u64, body: Value },
    DeleteProduct { id: u64, room_id: u64 },
    AddCartItem { product_id: u64, quantity: u32 },
    UpdateCartItem { product_id: u64, quantity: u32 },
    RemoveCartItem { product_id: u64 },
    ClearCart,
    PlaceOrder { body: Value },
}

impl Mutation {
    // == Method ==
    pub fn method(&self) -> Method {
        match self {
            Mutation::CreateProduct { .. }
            | Mutation::AddCartItem { .. }
            | Mutation::PlaceOrder { .. } => Method::Post,
            Mutation::UpdateProduct { .. } | Mutation::UpdateCartItem { .. } => Method::Put,
            Mutation::DeleteProduct { .. }
            | Mutation::RemoveCartItem { .. }
            | Mutation::ClearCart => Method::Delete,
        }
    }

    // == Path ==
    pub fn path(&self) -> String {
        match self {
            Mutation::CreateProduct { room_id, .. } => {
                format!("/api/rooms/{}/products", room_id)
            }
            Mutation::UpdateProduct { id, .. } => format!("/api/products/{}", id),
            Mutation::DeleteProduct { id, .. } => format!("/api/products/{}", id),
            Mutation::AddCartItem { .. } => "/api/cart/items".to_string(),
            Mutation::UpdateCartItem { product_id, .. } => {
                format!("/api/cart/items/{}", product_id)
            }
            Mutation::RemoveCartItem { product_id } => {
                format!("/api/cart/items/{}", product_id)
            }
            Mutation::ClearCart => "/api/cart".to_string(),
            Mutation::PlaceOrder { .. } => "/api/orders".to_string(),
        }
    }

    // == Body ==
    pub fn body(&self) -> Option<Value> {
        match self {
            Mutation::CreateProduct { body, .. }
            | Mutation::UpdateProduct { body, .. }
            | Mutation::PlaceOrder { body } => Some(body.clone()),
            Mutation::AddCartItem {
                product_id,
                quantity,
            } => Some(json!({"product_id": product_id, "quantity": quantity})),
            Mutation::UpdateCartItem { quantity, .. } => Some(json!({"quantity": quantity})),
            Mutation::DeleteProduct { .. }
            | Mutation::RemoveCartItem { .. }
            | Mutation::ClearCart => None,
        }
    }

    // == Invalidates ==
    /// Every collection this write could staleify.
    ///
    /// Deleting or editing a product staleifies its room listing, the
    /// store listing, and its own detail entry. Cart writes staleify the
    /// cart and its count (one tag covers both). Placing an order
    /// staleifies the cart and the listings; per-product stock in open
    /// views is corrected by the live channel, not by refetch.
    pub fn invalidates(&self) -> Vec<CacheTag> {
        match self {
            Mutation::CreateProduct { room_id, .. } => {
                vec![CacheTag::Room(*room_id), CacheTag::StoreListing]
            }
            Mutation::UpdateProduct { id, room_id, .. }
            | Mutation::DeleteProduct { id, room_id } => vec![
                CacheTag::Product(*id),
                CacheTag::Room(*room_id),
                CacheTag::StoreListing,
            ],
            Mutation::AddCartItem { .. }
            | Mutation::UpdateCartItem { .. }
            | Mutation::RemoveCartItem { .. }
            | Mutation::ClearCart => vec![CacheTag::Cart],
            Mutation::PlaceOrder { .. } => vec![CacheTag::Cart, CacheTag::StoreListing],
        }
    }
}
