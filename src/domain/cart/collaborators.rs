//! Capabilities the cart consumes from the rest of the storefront.

use std::collections::BTreeMap;

use async_trait::async_trait;
use jiff::Timestamp;

use super::{CartLineItem, Product, ProductId, StoreError, UserId};

/// Resolves a product id to its live catalog record. `Ok(None)` means the product no
/// longer exists.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn product_by_id(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError>;
}

/// Per-user cart documents. Writes replace the whole document.
#[async_trait]
pub trait RemoteCartStore: Send + Sync {
    async fn get_cart(&self, user_id: &UserId) -> Result<Option<RemoteCart>, StoreError>;

    async fn update_cart(&self, user_id: &UserId, cart: &RemoteCart) -> Result<(), StoreError>;
}

/// String keyed blob storage with browser `localStorage` semantics.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/// Only quantity and add time are authoritative remotely. Names, prices and stock are
/// resolved from the catalog on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartEntry {
    pub quantity: u32,
    pub added_at: Timestamp,
}

pub type RemoteCart = BTreeMap<ProductId, RemoteCartEntry>;

/// The remote representation of a list of cart lines.
pub fn remote_cart_of(items: &[CartLineItem]) -> RemoteCart {
    items
        .iter()
        .map(|item| {
            (
                item.product_id.clone(),
                RemoteCartEntry {
                    quantity: item.quantity,
                    added_at: item.added_at,
                },
            )
        })
        .collect()
}
