//! The stateful cart controller.
//!
//! Owns the cart state, picks the persistence adapter from the current identity, debounces
//! remote writes, merges guest carts on sign in and validates carts against the catalog.
//! Reducer transitions happen under a short synchronous lock; network I/O never holds it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::{StreamExt, stream};
use jiff::Timestamp;
use tracing::{debug, error, info, warn};

use super::{
    CartAction, CartAdapter, CartError, CartLineItem, CartReducer, CartState, CartSummary,
    CatalogLookup, LineItemPatch, LocalCartAdapter, LocalStorage, MergeReport, PricingPolicy,
    Product, ProductId, RemoteCart, RemoteCartAdapter, RemoteCartStore, SyncPhase, SyncQueue,
    UserId, ValidationReport, remote_cart_of,
};

const CATALOG_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct CartSettings {
    /// Quiet period after the last change before the remote cart is written.
    pub debounce: Duration,
    pub max_quantity_per_item: u32,
    pub pricing: PricingPolicy,
    /// Local storage key of the guest cart.
    pub guest_cart_key: String,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            max_quantity_per_item: 10,
            pricing: PricingPolicy::default(),
            guest_cart_key: "cart".to_owned(),
        }
    }
}

struct Controller {
    cart: CartState,
    user: Option<UserId>,
    /// Bumped on every identity change. Loads and writes started under an older epoch
    /// must not touch the current state.
    epoch: u64,
    phase: SyncPhase,
    /// What the remote store is known to hold for the current user.
    last_synced: Option<RemoteCart>,
    pending: SyncQueue,
}

pub struct CartOrchestrator {
    reducer: CartReducer,
    settings: CartSettings,
    catalog: Arc<dyn CatalogLookup>,
    remote_store: Arc<dyn RemoteCartStore>,
    local: LocalCartAdapter,
    controller: Mutex<Controller>,
    load_gate: tokio::sync::Mutex<()>,
    /// Held for the whole of a remote write so writes run one at a time.
    write_gate: tokio::sync::Mutex<()>,
}

impl CartOrchestrator {
    pub fn new(
        settings: CartSettings,
        catalog: Arc<dyn CatalogLookup>,
        remote_store: Arc<dyn RemoteCartStore>,
        local_storage: Arc<dyn LocalStorage>,
    ) -> Self {
        Self {
            reducer: CartReducer::new(settings.pricing),
            local: LocalCartAdapter::new(local_storage, settings.guest_cart_key.clone()),
            settings,
            catalog,
            remote_store,
            controller: Mutex::new(Controller {
                cart: CartState::default(),
                user: None,
                epoch: 0,
                phase: SyncPhase::Uninitialized,
                last_synced: None,
                pending: SyncQueue::default(),
            }),
            load_gate: tokio::sync::Mutex::new(()),
            write_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn controller(&self) -> MutexGuard<'_, Controller> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, ctl: &mut Controller, action: CartAction) {
        debug!("CartOrchestrator: dispatching {action}");
        ctl.cart = self.reducer.reduce(std::mem::take(&mut ctl.cart), action);
    }

    /// Records a failure in the cart state and hands it back for the caller.
    fn reject(&self, ctl: &mut Controller, error: CartError) -> CartError {
        warn!("CartOrchestrator: {error}");
        self.dispatch(ctl, CartAction::SetError(error.to_string()));
        error
    }

    fn remote_adapter(&self, user_id: UserId) -> RemoteCartAdapter {
        RemoteCartAdapter::new(user_id, self.remote_store.clone(), self.catalog.clone())
    }

    //---------------------- Identity & loading ----------------------

    pub fn user(&self) -> Option<UserId> {
        self.controller().user
    }

    pub fn phase(&self) -> SyncPhase {
        self.controller().phase
    }

    /// Switches the active identity. `None` is a guest session. Calling it again with the
    /// current identity does nothing. On sign in a stored guest cart is merged into the
    /// user cart.
    pub async fn set_auth(
        self: &Arc<Self>,
        user: Option<UserId>,
    ) -> Result<Option<MergeReport>, CartError> {
        {
            let mut ctl = self.controller();
            if ctl.user == user {
                return Ok(None);
            }
            if ctl.pending.cancel() {
                info!("CartOrchestrator: cancelled pending remote write on identity change");
            }
            ctl.epoch += 1;
            ctl.user = user;
            ctl.phase = SyncPhase::Uninitialized;
            ctl.last_synced = None;
            ctl.cart = CartState::default();
            match user {
                Some(user_id) => info!("CartOrchestrator: signed in as {user_id}"),
                None => info!("CartOrchestrator: signed out"),
            }
        }

        self.ensure_loaded().await;

        match user {
            Some(_) => self.merge_guest_cart().await.map(Some),
            None => Ok(None),
        }
    }

    /// Loads the cart from the active adapter unless it has already been loaded for the
    /// current identity.
    pub async fn ensure_loaded(self: &Arc<Self>) {
        loop {
            if self.controller().phase != SyncPhase::Uninitialized {
                return;
            }
            let _gate = self.load_gate.lock().await;

            let (user, epoch) = {
                let mut ctl = self.controller();
                if ctl.phase != SyncPhase::Uninitialized {
                    return;
                }
                self.dispatch(&mut ctl, CartAction::SetLoading(true));
                (ctl.user, ctl.epoch)
            };

            let loaded = match user {
                Some(user_id) => self.remote_adapter(user_id).load().await,
                None => self.local.load_now(),
            };

            let mut ctl = self.controller();
            if ctl.epoch != epoch {
                debug!("CartOrchestrator: discarding load for a previous identity");
                continue;
            }
            let (items, remote_ok) = match (loaded, user) {
                (Ok(items), _) => (items.unwrap_or_default(), true),
                (Err(err), Some(user_id)) => {
                    error!("CartOrchestrator: loading cart for user {user_id} failed with {err}");
                    self.dispatch(&mut ctl, CartAction::SetError(CartError::from(err).to_string()));
                    (Vec::new(), false)
                }
                (Err(err), None) => {
                    warn!("CartOrchestrator: ignoring unreadable guest cart: {err}");
                    (Vec::new(), true)
                }
            };
            info!("CartOrchestrator: loaded cart with {} line(s)", items.len());
            self.dispatch(&mut ctl, CartAction::SetCart(items));
            self.dispatch(&mut ctl, CartAction::SetLoading(false));
            ctl.last_synced = match user {
                Some(_) if remote_ok => Some(remote_cart_of(&ctl.cart.items)),
                _ => None,
            };
            ctl.phase = SyncPhase::Idle;
            return;
        }
    }

    /// The controller, once the cart for the current identity has been loaded.
    async fn loaded_controller(self: &Arc<Self>) -> MutexGuard<'_, Controller> {
        loop {
            self.ensure_loaded().await;
            let ctl = self.controller();
            if ctl.phase != SyncPhase::Uninitialized {
                return ctl;
            }
        }
    }

    //-------------------------- Mutations ---------------------------

    /// Checks a requested addition against the per-item limit and the product stock,
    /// counting what is already in the cart.
    fn check_add(
        &self,
        cart: &CartState,
        product: &Product,
        quantity: i64,
    ) -> Result<u32, CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity);
        }
        let limit = self.settings.max_quantity_per_item;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|quantity| *quantity <= limit)
            .ok_or(CartError::ExceedsPerItemLimit { limit })?;
        let available = product.inventory.unwrap_or_default();
        if available == 0 {
            return Err(CartError::OutOfStock {
                name: product.name.clone(),
            });
        }
        let in_cart = cart.quantity_of(&product.id);
        if in_cart.saturating_add(quantity) > available {
            return Err(CartError::ExceedsStock {
                name: product.name.clone(),
                available,
                in_cart,
            });
        }
        Ok(quantity)
    }

    pub async fn add_to_cart(
        self: &Arc<Self>,
        product: &Product,
        quantity: i64,
    ) -> Result<CartSummary, CartError> {
        let mut ctl = self.loaded_controller().await;
        match self.check_add(&ctl.cart, product, quantity) {
            Ok(quantity) => {
                let line = CartLineItem::from_product(product, quantity, Timestamp::now());
                self.dispatch(&mut ctl, CartAction::AddItem(line));
                self.items_changed(&mut ctl);
                info!("CartOrchestrator: added {quantity} x {}", product.id);
                Ok(CartSummary::of(&ctl.cart))
            }
            Err(err) => Err(self.reject(&mut ctl, err)),
        }
    }

    /// Sets the quantity of a line. Zero or less removes it.
    pub async fn update_quantity(
        self: &Arc<Self>,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartSummary, CartError> {
        if quantity <= 0 {
            return self.remove_from_cart(product_id).await;
        }
        let mut ctl = self.loaded_controller().await;
        let Some(line) = ctl.cart.item(product_id) else {
            return Err(self.reject(&mut ctl, CartError::NotInCart(product_id.clone())));
        };
        let max_quantity = line.max_quantity;
        let quantity = match u32::try_from(quantity) {
            Ok(quantity) if quantity <= max_quantity => quantity,
            _ => return Err(self.reject(&mut ctl, CartError::ExceedsMaxQuantity { max_quantity })),
        };
        self.dispatch(
            &mut ctl,
            CartAction::UpdateItem(product_id.clone(), LineItemPatch::quantity(quantity)),
        );
        self.items_changed(&mut ctl);
        Ok(CartSummary::of(&ctl.cart))
    }

    pub async fn remove_from_cart(
        self: &Arc<Self>,
        product_id: &ProductId,
    ) -> Result<CartSummary, CartError> {
        let mut ctl = self.loaded_controller().await;
        if ctl.cart.item(product_id).is_some() {
            self.dispatch(&mut ctl, CartAction::RemoveItem(product_id.clone()));
            self.items_changed(&mut ctl);
            info!("CartOrchestrator: removed {product_id}");
        }
        Ok(CartSummary::of(&ctl.cart))
    }

    /// Empties the cart and removes its persisted representation.
    pub async fn clear_cart(self: &Arc<Self>) -> Result<CartSummary, CartError> {
        let is_guest = {
            let mut ctl = self.loaded_controller().await;
            self.dispatch(&mut ctl, CartAction::ClearCart);
            if ctl.user.is_none() {
                if let Err(err) = self.local.clear_now() {
                    warn!("CartOrchestrator: could not remove guest cart: {err}");
                }
            }
            ctl.user.is_none()
        };
        if !is_guest {
            self.flush().await?;
        }
        info!("CartOrchestrator: cart cleared");
        Ok(self.summary())
    }

    /// Replays the stored guest cart into the signed in user's cart, then drops the guest
    /// cart. Lines that would break a stock ceiling are skipped.
    pub async fn merge_guest_cart(self: &Arc<Self>) -> Result<MergeReport, CartError> {
        let mut ctl = self.loaded_controller().await;
        if ctl.user.is_none() {
            return Err(self.reject(&mut ctl, CartError::NotAuthenticated));
        }

        let guest_items = match self.local.load_now() {
            Ok(items) => items.unwrap_or_default(),
            Err(err) => {
                warn!("CartOrchestrator: ignoring unreadable guest cart: {err}");
                Vec::new()
            }
        };

        let mut report = MergeReport::default();
        for item in guest_items {
            let product = Product {
                id: item.product_id.clone(),
                name: item.name.clone(),
                price: item.price,
                images: item.image.clone().into_iter().collect(),
                inventory: Some(item.max_quantity),
            };
            match self.check_add(&ctl.cart, &product, i64::from(item.quantity)) {
                Ok(_) => {
                    self.dispatch(&mut ctl, CartAction::AddItem(item));
                    report.merged += 1;
                }
                Err(err) => {
                    warn!("CartOrchestrator: skipping guest line {}: {err}", product.id);
                    report.skipped.push(product.id);
                }
            }
        }

        if report.merged > 0 {
            self.items_changed(&mut ctl);
        }
        if !report.is_empty() {
            info!(
                "CartOrchestrator: merged {} guest line(s), skipped {}",
                report.merged,
                report.skipped.len()
            );
        }
        if let Err(err) = self.local.clear_now() {
            warn!("CartOrchestrator: could not remove merged guest cart: {err}");
        }
        Ok(report)
    }

    /// Re-resolves every line against the catalog. Lines whose product is gone or whose
    /// stock no longer covers the quantity are removed; the rest get fresh price, name,
    /// image and stock ceiling.
    pub async fn validate_cart(self: &Arc<Self>) -> Result<ValidationReport, CartError> {
        loop {
            if let Some(report) = self.validate_loaded_cart().await? {
                return Ok(report);
            }
            debug!("CartOrchestrator: identity changed during validation, starting over");
        }
    }

    /// One validation pass over the cart of the current identity. `None` when the identity
    /// changed while the catalog was being queried; nothing is applied in that case.
    async fn validate_loaded_cart(
        self: &Arc<Self>,
    ) -> Result<Option<ValidationReport>, CartError> {
        let (epoch, product_ids) = {
            let ctl = self.loaded_controller().await;
            let product_ids: Vec<ProductId> = ctl
                .cart
                .items
                .iter()
                .map(|item| item.product_id.clone())
                .collect();
            (ctl.epoch, product_ids)
        };

        let lookups: Vec<_> = stream::iter(product_ids)
            .map(|product_id| async move {
                let result = self.catalog.product_by_id(&product_id).await;
                (product_id, result)
            })
            .buffered(CATALOG_CONCURRENCY)
            .collect()
            .await;

        let mut ctl = self.controller();
        if ctl.epoch != epoch {
            return Ok(None);
        }

        let mut resolved = Vec::with_capacity(lookups.len());
        for (product_id, result) in lookups {
            match result {
                Ok(product) => resolved.push((product_id, product)),
                Err(err) => {
                    error!("CartOrchestrator: catalog lookup of {product_id} failed with {err}");
                    return Err(self.reject(&mut ctl, CartError::CatalogUnavailable));
                }
            }
        }

        let before = ctl.cart.items.clone();
        let mut removed = Vec::new();
        for (product_id, product) in resolved {
            // The line may have changed while the catalog was being queried.
            let Some(quantity) = ctl.cart.item(&product_id).map(|line| line.quantity) else {
                continue;
            };
            match product {
                Some(product) if product.inventory.unwrap_or_default() >= quantity => {
                    self.dispatch(
                        &mut ctl,
                        CartAction::UpdateItem(product_id, LineItemPatch::refresh_from(&product)),
                    );
                }
                _ => {
                    self.dispatch(&mut ctl, CartAction::RemoveItem(product_id.clone()));
                    removed.push(product_id);
                }
            }
        }
        if ctl.cart.items != before {
            self.items_changed(&mut ctl);
        }
        if !removed.is_empty() {
            info!("CartOrchestrator: validation removed {} line(s)", removed.len());
        }
        Ok(Some(ValidationReport {
            removed,
            summary: CartSummary::of(&ctl.cart),
        }))
    }

    //------------------------ Persistence ---------------------------

    /// Persists a change to the active store: guests write through to local storage,
    /// signed in users get a debounced remote write.
    fn items_changed(self: &Arc<Self>, ctl: &mut Controller) {
        match ctl.user {
            Some(_) if ctl.phase == SyncPhase::Syncing => {
                debug!("CartOrchestrator: remote write in flight, change will follow it");
            }
            Some(_) => self.schedule_remote_write(ctl),
            None => {
                if let Err(err) = self.local.save_now(&ctl.cart) {
                    warn!("CartOrchestrator: could not store guest cart: {err}");
                }
            }
        }
    }

    fn schedule_remote_write(self: &Arc<Self>, ctl: &mut Controller) {
        let (ticket, token) = ctl.pending.schedule();
        let this = Arc::clone(self);
        let debounce = self.settings.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    // Failures are logged and recorded in the cart state.
                    let _ = this.write_remote(Some(ticket)).await;
                }
            }
        });
    }

    /// Writes any unsynced change now instead of waiting for the debounce timer. A write
    /// already in flight is awaited first, so on return the remote store holds the state
    /// as of this call.
    pub async fn flush(self: &Arc<Self>) -> Result<(), CartError> {
        self.write_remote(None).await
    }

    /// Writes the current items to the remote store. With a ticket, only runs if that
    /// ticket is still the pending write. Never overlaps an in-flight write.
    async fn write_remote(self: &Arc<Self>, ticket: Option<u64>) -> Result<(), CartError> {
        let _writing = self.write_gate.lock().await;
        let (user_id, epoch, snapshot) = {
            let mut ctl = self.controller();
            let claimed = match ticket {
                Some(ticket) => ctl.pending.claim(ticket),
                None => {
                    ctl.pending.cancel();
                    true
                }
            };
            if !claimed {
                return Ok(());
            }
            let Some(user_id) = ctl.user else {
                return Ok(());
            };
            if ctl.phase != SyncPhase::Idle {
                return Ok(());
            }
            let snapshot = remote_cart_of(&ctl.cart.items);
            if ctl.last_synced.as_ref() == Some(&snapshot) {
                return Ok(());
            }
            ctl.phase = SyncPhase::Syncing;
            self.dispatch(&mut ctl, CartAction::SetSyncing(true));
            (user_id, ctl.epoch, snapshot)
        };

        let result = self.remote_store.update_cart(&user_id, &snapshot).await;

        let mut ctl = self.controller();
        if ctl.epoch != epoch {
            return result.map_err(CartError::from);
        }
        ctl.phase = SyncPhase::Idle;
        self.dispatch(&mut ctl, CartAction::SetSyncing(false));
        match result {
            Ok(()) => {
                info!(
                    "CartOrchestrator: wrote {} line(s) for user {user_id}",
                    snapshot.len()
                );
                let diverged = remote_cart_of(&ctl.cart.items) != snapshot;
                ctl.last_synced = Some(snapshot);
                if diverged {
                    self.schedule_remote_write(&mut ctl);
                }
                Ok(())
            }
            Err(err) => {
                error!("CartOrchestrator: writing cart for user {user_id} failed with {err}");
                let err = CartError::from(err);
                self.dispatch(&mut ctl, CartAction::SetError(err.to_string()));
                Err(err)
            }
        }
    }

    /// Cancels any pending remote write without running it.
    pub fn shutdown(&self) {
        if self.controller().pending.cancel() {
            info!("CartOrchestrator: dropped pending remote write on shutdown");
        }
    }

    //---------------------------- Reads -----------------------------

    pub fn snapshot(&self) -> CartState {
        self.controller().cart.clone()
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary::of(&self.controller().cart)
    }

    pub fn item_quantity(&self, product_id: &ProductId) -> u32 {
        self.controller().cart.quantity_of(product_id)
    }

    pub fn clear_error(&self) {
        let mut ctl = self.controller();
        self.dispatch(&mut ctl, CartAction::ClearError);
    }

    pub fn has_pending_write(&self) -> bool {
        self.controller().pending.is_pending()
    }
}

//-------------------------- Tests -------------------------------
