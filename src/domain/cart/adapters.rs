//! Persistence adapters: the remote per-user cart document and the guest cart kept in
//! local storage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use futures::{StreamExt, stream};
use tracing::{debug, warn};

use super::{
    CartLineItem, CartState, CatalogLookup, LocalStorage, ProductId, RemoteCartEntry,
    RemoteCartStore, StoreError, UserId, remote_cart_of,
};

const CATALOG_CONCURRENCY: usize = 8;

/// Three retries, starting at 100ms.
fn load_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_times(3)
}

#[async_trait]
pub trait CartAdapter: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    async fn load(&self) -> Result<Option<Vec<CartLineItem>>, StoreError>;

    async fn save(&self, state: &CartState) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

//------------------------- Remote ----------------------------

/// The cart document of one signed in user.
#[derive(Clone)]
pub struct RemoteCartAdapter {
    user_id: UserId,
    store: Arc<dyn RemoteCartStore>,
    catalog: Arc<dyn CatalogLookup>,
}

impl RemoteCartAdapter {
    pub fn new(
        user_id: UserId,
        store: Arc<dyn RemoteCartStore>,
        catalog: Arc<dyn CatalogLookup>,
    ) -> Self {
        Self {
            user_id,
            store,
            catalog,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Re-resolves a stored entry against the catalog. Products that no longer exist are
    /// stale references and resolve to `None`.
    async fn resolve(
        &self,
        product_id: ProductId,
        entry: RemoteCartEntry,
    ) -> Result<Option<CartLineItem>, StoreError> {
        let product = self.catalog.product_by_id(&product_id).await?;
        Ok(match product {
            Some(product) => Some(CartLineItem::from_product(
                &product,
                entry.quantity,
                entry.added_at,
            )),
            None => {
                debug!(
                    "RemoteCartAdapter: dropping stale cart entry {product_id} for user {}",
                    self.user_id
                );
                None
            }
        })
    }
}

#[async_trait]
impl CartAdapter for RemoteCartAdapter {
    async fn load(&self) -> Result<Option<Vec<CartLineItem>>, StoreError> {
        let user_id = self.user_id;
        let maybe_cart = (|| async move { self.store.get_cart(&user_id).await })
            .retry(load_backoff())
            .sleep(tokio::time::sleep)
            .notify(|err, dur| {
                warn!(
                    "RemoteCartAdapter: retrying cart load for user {user_id} after {dur:?} due to {err}"
                )
            })
            .await?;
        let Some(remote_cart) = maybe_cart else {
            return Ok(None);
        };

        let resolved: Vec<_> = stream::iter(remote_cart)
            .filter(|(_, entry)| futures::future::ready(entry.quantity > 0))
            .map(|(product_id, entry)| self.resolve(product_id, entry))
            .buffered(CATALOG_CONCURRENCY)
            .collect()
            .await;

        let mut items = resolved
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        items.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        Ok(Some(items))
    }

    async fn save(&self, state: &CartState) -> Result<(), StoreError> {
        self.store
            .update_cart(&self.user_id, &remote_cart_of(&state.items))
            .await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.store
            .update_cart(&self.user_id, &Default::default())
            .await
    }
}

//-------------------------- Local ----------------------------

/// The guest cart: a serialized snapshot of the whole cart state under one key. Guest
/// carts are self-contained, nothing is re-resolved on load.
#[derive(Clone)]
pub struct LocalCartAdapter {
    key: String,
    storage: Arc<dyn LocalStorage>,
}

impl LocalCartAdapter {
    pub fn new(storage: Arc<dyn LocalStorage>, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            storage,
        }
    }

    pub fn load_now(&self) -> Result<Option<Vec<CartLineItem>>, StoreError> {
        let Some(blob) = self.storage.get_item(&self.key)? else {
            return Ok(None);
        };
        let state: CartState = serde_json::from_str(&blob)?;
        Ok(Some(state.items))
    }

    pub fn save_now(&self, state: &CartState) -> Result<(), StoreError> {
        let blob = serde_json::to_string(state)?;
        self.storage.set_item(&self.key, &blob)
    }

    pub fn clear_now(&self) -> Result<(), StoreError> {
        self.storage.remove_item(&self.key)
    }
}

#[async_trait]
impl CartAdapter for LocalCartAdapter {
    async fn load(&self) -> Result<Option<Vec<CartLineItem>>, StoreError> {
        self.load_now()
    }

    async fn save(&self, state: &CartState) -> Result<(), StoreError> {
        self.save_now(state)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.clear_now()
    }
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::{CartAction, CartReducer, Product, RemoteCart};
    use crate::infra::{InMemoryCatalog, InMemoryLocalStorage, InMemoryRemoteCartStore};
    use fake::{Fake, Faker};
    use jiff::Timestamp;
    use rust_decimal::Decimal;

    fn product(id: &str, price: i64, inventory: u32) -> Product {
        Product {
            id: ProductId::from(id),
            price: Decimal::from(price),
            inventory: Some(inventory),
            ..Faker.fake()
        }
    }

    #[tokio::test]
    async fn remote_load_resolves_catalog_fields_and_drops_stale_entries() {
        let catalog = Arc::new(InMemoryCatalog::default());
        catalog.upsert(product("p1", 100, 4));
        let store = Arc::new(InMemoryRemoteCartStore::default());
        let user_id = UserId::new();
        let added_at = Timestamp::now();
        let remote: RemoteCart = [
            (ProductId::from("p1"), RemoteCartEntry { quantity: 2, added_at }),
            (ProductId::from("gone"), RemoteCartEntry { quantity: 1, added_at }),
        ]
        .into_iter()
        .collect();
        store.seed(user_id, remote);

        let adapter = RemoteCartAdapter::new(user_id, store, catalog);
        let items = adapter
            .load()
            .await
            .expect("Load should succeed.")
            .expect("A cart should be found.");

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.product_id, ProductId::from("p1"));
        assert_eq!(item.price, Decimal::from(100));
        assert_eq!(item.max_quantity, 4);
        assert_eq!(item.quantity, 2);
        assert_eq!(item.added_at, added_at);
    }

    #[tokio::test]
    async fn remote_save_writes_only_quantity_and_added_at() {
        let catalog = Arc::new(InMemoryCatalog::default());
        let store = Arc::new(InMemoryRemoteCartStore::default());
        let user_id = UserId::new();
        let adapter = RemoteCartAdapter::new(user_id, store.clone(), catalog);

        let line = CartLineItem::from_product(&product("p1", 100, 4), 3, Timestamp::now());
        let state = CartReducer::default()
            .reduce(CartState::default(), CartAction::AddItem(line.clone()));
        adapter.save(&state).await.expect("Save should succeed.");

        let written = store.document(&user_id).expect("Document should exist.");
        assert_eq!(
            written.get(&line.product_id),
            Some(&RemoteCartEntry {
                quantity: 3,
                added_at: line.added_at
            })
        );

        adapter.clear().await.expect("Clear should succeed.");
        assert_eq!(store.document(&user_id), Some(RemoteCart::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_load_gives_up_after_retries() {
        let catalog = Arc::new(InMemoryCatalog::default());
        let store = Arc::new(InMemoryRemoteCartStore::default());
        store.fail_reads(true);
        let adapter = RemoteCartAdapter::new(UserId::new(), store.clone(), catalog);

        assert!(adapter.load().await.is_err());
        assert_eq!(store.read_count(), 4);
    }

    #[tokio::test]
    async fn local_adapter_round_trips_the_whole_state() {
        let storage = Arc::new(InMemoryLocalStorage::default());
        let adapter = LocalCartAdapter::new(storage.clone(), "cart");
        assert_eq!(adapter.load().await.expect("Load should succeed."), None);

        let line = CartLineItem::from_product(&product("p1", 300, 4), 1, Timestamp::now());
        let state = CartReducer::default()
            .reduce(CartState::default(), CartAction::AddItem(line.clone()));
        adapter.save(&state).await.expect("Save should succeed.");

        let blob = storage
            .get_item("cart")
            .expect("Read should succeed.")
            .expect("Blob should exist.");
        assert!(blob.contains("\"totals\""));
        assert_eq!(adapter.load().await.expect("Load should succeed."), Some(vec![line]));

        adapter.clear().await.expect("Clear should succeed.");
        assert_eq!(storage.get_item("cart").expect("Read should succeed."), None);
    }

    #[test]
    fn corrupt_local_blob_is_an_error_not_a_panic() {
        let storage = Arc::new(InMemoryLocalStorage::default());
        storage.set_item("cart", "{not json").expect("Write should succeed.");
        let adapter = LocalCartAdapter::new(storage, "cart");
        assert!(adapter.load_now().is_err());
    }
}
