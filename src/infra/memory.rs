//! In-process collaborators for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::cart::{
    CatalogLookup, LocalStorage, Product, ProductId, RemoteCart, RemoteCartStore, StoreError,
    UserId,
};

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: Mutex<HashMap<ProductId, Product>>,
    unavailable: AtomicBool,
}

impl InMemoryCatalog {
    pub fn upsert(&self, product: Product) {
        self.products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product.id.clone(), product);
    }

    pub fn remove(&self, product_id: &ProductId) {
        self.products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(product_id);
    }

    pub fn set_inventory(&self, product_id: &ProductId, inventory: Option<u32>) {
        if let Some(product) = self
            .products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(product_id)
        {
            product.inventory = inventory;
        }
    }

    /// Makes every lookup fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn product_by_id(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("catalog is offline".to_owned()));
        }
        Ok(self
            .products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(product_id)
            .cloned())
    }
}

/// Remote cart documents held in memory. Every successful write is also appended to a
/// log so tests can count and inspect them.
#[derive(Debug, Default)]
pub struct InMemoryRemoteCartStore {
    documents: Mutex<HashMap<UserId, RemoteCart>>,
    writes: Mutex<Vec<(UserId, RemoteCart)>>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryRemoteCartStore {
    pub fn seed(&self, user_id: UserId, cart: RemoteCart) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, cart);
    }

    pub fn document(&self, user_id: &UserId) -> Option<RemoteCart> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    pub fn writes(&self) -> Vec<(UserId, RemoteCart)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteCartStore for InMemoryRemoteCartStore {
    async fn get_cart(&self, user_id: &UserId) -> Result<Option<RemoteCart>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("remote cart store is offline".to_owned()));
        }
        Ok(self.document(user_id))
    }

    async fn update_cart(&self, user_id: &UserId, cart: &RemoteCart) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("remote cart store is offline".to_owned()));
        }
        self.seed(*user_id, cart.clone());
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((*user_id, cart.clone()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLocalStorage {
    items: Mutex<HashMap<String, String>>,
}

impl LocalStorage for InMemoryLocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
