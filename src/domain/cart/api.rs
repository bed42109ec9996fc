//! The cart API handed to the storefront UI. It is the only way the rest of the
//! application touches the cart: no reducer actions or adapters leak through it.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::{
    CartError, CartOrchestrator, CartSettings, CartState, CatalogLookup, LocalStorage, Product,
    ProductId, RemoteCartStore, SyncPhase, UserId,
};

/// Snapshot of the derived totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CartSummary {
    /// Number of distinct lines.
    pub item_count: usize,
    pub total_items: u32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
}

impl CartSummary {
    pub fn of(state: &CartState) -> Self {
        let totals = state.totals;
        Self {
            item_count: state.items.len(),
            total_items: totals.total_items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            discount: totals.discount,
            total_amount: totals.total_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidationReport {
    /// Lines dropped because the product is gone or no longer has enough stock.
    pub removed: Vec<ProductId>,
    pub summary: CartSummary,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.removed.is_empty()
    }

    pub fn message(&self) -> Option<&'static str> {
        (!self.is_valid())
            .then_some("Some items in your cart are no longer available and have been removed.")
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct MergeReport {
    /// Guest lines added to the user cart.
    pub merged: usize,
    /// Guest lines rejected by a stock or quantity limit.
    pub skipped: Vec<ProductId>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.merged == 0 && self.skipped.is_empty()
    }
}

/// Cheap to clone; every clone drives the same cart.
#[derive(Clone)]
pub struct CartApi {
    inner: Arc<CartOrchestrator>,
}

impl CartApi {
    pub fn new(
        settings: CartSettings,
        catalog: Arc<dyn CatalogLookup>,
        remote_store: Arc<dyn RemoteCartStore>,
        local_storage: Arc<dyn LocalStorage>,
    ) -> Self {
        Self {
            inner: Arc::new(CartOrchestrator::new(
                settings,
                catalog,
                remote_store,
                local_storage,
            )),
        }
    }

    pub async fn set_auth(&self, user: Option<UserId>) -> Result<Option<MergeReport>, CartError> {
        self.inner.set_auth(user).await
    }

    pub async fn load_cart(&self) -> CartState {
        self.inner.ensure_loaded().await;
        self.inner.snapshot()
    }

    pub async fn add_to_cart(
        &self,
        product: &Product,
        quantity: i64,
    ) -> Result<CartSummary, CartError> {
        self.inner.add_to_cart(product, quantity).await
    }

    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartSummary, CartError> {
        self.inner.update_quantity(product_id, quantity).await
    }

    pub async fn remove_from_cart(&self, product_id: &ProductId) -> Result<CartSummary, CartError> {
        self.inner.remove_from_cart(product_id).await
    }

    pub async fn clear_cart(&self) -> Result<CartSummary, CartError> {
        self.inner.clear_cart().await
    }

    pub async fn validate_cart(&self) -> Result<ValidationReport, CartError> {
        self.inner.validate_cart().await
    }

    pub async fn merge_guest_cart(&self) -> Result<MergeReport, CartError> {
        self.inner.merge_guest_cart().await
    }

    /// Writes pending changes to the remote store without waiting for the debounce.
    pub async fn flush(&self) -> Result<(), CartError> {
        self.inner.flush().await
    }

    pub fn shutdown(&self) {
        self.inner.shutdown()
    }

    pub fn get_item_quantity(&self, product_id: &ProductId) -> u32 {
        self.inner.item_quantity(product_id)
    }

    pub fn is_in_cart(&self, product_id: &ProductId) -> bool {
        self.get_item_quantity(product_id) > 0
    }

    pub fn get_cart_summary(&self) -> CartSummary {
        self.inner.summary()
    }

    pub fn snapshot(&self) -> CartState {
        self.inner.snapshot()
    }

    pub fn clear_error(&self) {
        self.inner.clear_error()
    }

    pub fn user(&self) -> Option<UserId> {
        self.inner.user()
    }

    pub fn phase(&self) -> SyncPhase {
        self.inner.phase()
    }

    pub fn has_pending_write(&self) -> bool {
        self.inner.has_pending_write()
    }
}
