mod adapters;
mod api;
mod collaborators;
mod errors;
mod ids;
mod line_item;
mod orchestrator;
mod reducer;
mod sync;
mod totals;

pub use adapters::{CartAdapter, LocalCartAdapter, RemoteCartAdapter};
pub use api::{CartApi, CartSummary, MergeReport, ValidationReport};
pub use collaborators::{
    CatalogLookup, LocalStorage, RemoteCart, RemoteCartEntry, RemoteCartStore, remote_cart_of,
};
pub use errors::{CartError, StoreError};
pub use ids::*;
pub use line_item::{CartLineItem, LineItemPatch, Product};
pub use orchestrator::{CartOrchestrator, CartSettings};
pub use reducer::{CartAction, CartReducer, CartState};
pub use sync::{SyncPhase, SyncQueue};
pub use totals::{CartTotals, PricingPolicy, compute_totals};
