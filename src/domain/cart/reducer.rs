//! Cart state and its pure transition function.
//!
//! The reducer trusts its inputs. Stock ceilings and quantity limits are checked by the
//! orchestrator before an action is dispatched, so every action here is total: unknown
//! product ids are no-ops, never errors.

use jiff::{SignedDuration, Timestamp};
use strum_macros::Display;

use super::{CartLineItem, CartTotals, LineItemPatch, PricingPolicy, ProductId};

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CartState {
    pub items: Vec<CartLineItem>,
    pub totals: CartTotals,
    #[serde(skip)]
    pub loading: bool,
    #[serde(skip)]
    pub syncing: bool,
    #[serde(skip)]
    pub error: Option<String>,
    pub last_updated: Option<Timestamp>,
}

impl CartState {
    pub fn item(&self, product_id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.item(product_id).map(|item| item.quantity).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum CartAction {
    /// Replaces all lines. Only used when rehydrating from a persistence adapter.
    SetCart(Vec<CartLineItem>),
    AddItem(CartLineItem),
    UpdateItem(ProductId, LineItemPatch),
    RemoveItem(ProductId),
    ClearCart,
    SetLoading(bool),
    SetSyncing(bool),
    SetError(String),
    ClearError,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CartReducer {
    policy: PricingPolicy,
}

impl CartReducer {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    pub fn reduce(&self, mut state: CartState, action: CartAction) -> CartState {
        match action {
            CartAction::SetCart(items) => {
                state.items = dedupe(items);
                self.recompute(&mut state);
                touch(&mut state);
            }
            CartAction::AddItem(item) => {
                if item.quantity == 0 {
                    return state;
                }
                match state
                    .items
                    .iter_mut()
                    .find(|line| line.product_id == item.product_id)
                {
                    Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                    None => state.items.push(item),
                }
                self.recompute(&mut state);
                touch(&mut state);
            }
            CartAction::UpdateItem(product_id, patch) => {
                let Some(position) = state
                    .items
                    .iter()
                    .position(|line| line.product_id == product_id)
                else {
                    return state;
                };
                if patch.quantity == Some(0) {
                    state.items.remove(position);
                } else if let Some(line) = state.items.get_mut(position) {
                    line.apply(patch);
                }
                self.recompute(&mut state);
                touch(&mut state);
            }
            CartAction::RemoveItem(product_id) => {
                state.items.retain(|line| line.product_id != product_id);
                self.recompute(&mut state);
                touch(&mut state);
            }
            CartAction::ClearCart => {
                state = CartState {
                    loading: state.loading,
                    syncing: state.syncing,
                    error: state.error,
                    last_updated: state.last_updated,
                    ..Default::default()
                };
                touch(&mut state);
            }
            CartAction::SetLoading(loading) => state.loading = loading,
            CartAction::SetSyncing(syncing) => state.syncing = syncing,
            CartAction::SetError(message) => state.error = Some(message),
            CartAction::ClearError => state.error = None,
        }
        state
    }

    fn recompute(&self, state: &mut CartState) {
        state.totals = self.policy.totals(&state.items);
    }
}

/// Sets `last_updated` to now, moving it forward by at least a nanosecond so consecutive
/// actions always compare as newer.
fn touch(state: &mut CartState) {
    let now = Timestamp::now();
    state.last_updated = Some(match state.last_updated {
        Some(previous) if now <= previous => previous
            .checked_add(SignedDuration::from_nanos(1))
            .unwrap_or(previous),
        _ => now,
    });
}

/// Collapses duplicate product ids from a loaded cart into one line, keeping the first
/// snapshot and accumulating quantities. Zero quantity lines are dropped.
fn dedupe(items: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut lines: Vec<CartLineItem> = Vec::with_capacity(items.len());
    for item in items.into_iter().filter(|item| item.quantity > 0) {
        match lines.iter_mut().find(|line| line.product_id == item.product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
            None => lines.push(item),
        }
    }
    lines
}

//-------------------------- Tests -------------------------------
