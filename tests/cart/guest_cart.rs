use std::sync::Arc;

use rust_decimal::Decimal;
use storefront_cart::domain::cart::{CartApi, CartError, CartSettings, LocalStorage};

use crate::test_utils::{Stores, file_storage};

#[tokio::test]
async fn a_guest_cart_prices_lines_and_ships_free_over_the_threshold() {
    let stores = Stores::default();
    let cart = stores.cart();
    let lamp = stores.stock("lamp", 1000, 5);
    let mug = stores.stock("mug", 300, 5);

    let summary = cart.add_to_cart(&mug, 1).await.expect("Add should succeed.");
    assert_eq!(summary.subtotal, Decimal::from(300));
    assert_eq!(summary.tax, Decimal::from(54));
    assert_eq!(summary.shipping, Decimal::from(50));
    assert_eq!(summary.total_amount, Decimal::from(404));

    cart.remove_from_cart(&mug.id).await.expect("Remove should succeed.");
    let summary = cart.add_to_cart(&lamp, 2).await.expect("Add should succeed.");
    assert_eq!(summary.subtotal, Decimal::from(2000));
    assert_eq!(summary.tax, Decimal::from(360));
    assert_eq!(summary.shipping, Decimal::ZERO);
    assert_eq!(summary.total_amount, Decimal::from(2360));

    assert!(cart.is_in_cart(&lamp.id));
    assert!(!cart.is_in_cart(&mug.id));
    assert_eq!(cart.get_cart_summary(), summary);
}

#[tokio::test]
async fn stock_is_enforced_before_anything_changes() {
    let stores = Stores::default();
    let cart = stores.cart();
    let chair = stores.stock("chair", 150, 5);

    let err = cart.add_to_cart(&chair, 6).await.expect_err("Add should fail.");
    assert!(matches!(err, CartError::ExceedsStock { available: 5, in_cart: 0, .. }));
    assert!(cart.snapshot().is_empty());

    cart.add_to_cart(&chair, 5).await.expect("Add should succeed.");
    let err = cart.add_to_cart(&chair, 5).await.expect_err("Add should fail.");
    assert!(matches!(err, CartError::ExceedsStock { available: 5, in_cart: 5, .. }));
    assert_eq!(cart.get_item_quantity(&chair.id), 5);
    assert!(cart.snapshot().error.is_some());
}

#[tokio::test]
async fn quantities_at_or_below_zero_remove_the_line() {
    let stores = Stores::default();
    let cart = stores.cart();
    let chair = stores.stock("chair", 150, 5);
    let desk = stores.stock("desk", 400, 5);

    cart.add_to_cart(&chair, 2).await.expect("Add should succeed.");
    cart.add_to_cart(&desk, 2).await.expect("Add should succeed.");

    cart.update_quantity(&chair.id, 0).await.expect("Update should succeed.");
    cart.update_quantity(&desk.id, -3).await.expect("Update should succeed.");

    assert!(cart.snapshot().is_empty());
    assert_eq!(cart.get_cart_summary().total_amount, Decimal::ZERO);
}

#[tokio::test]
async fn a_guest_cart_survives_a_restart_on_disk() {
    let stores = Stores::default();
    let storage = Arc::new(file_storage());
    let open = || {
        CartApi::new(
            CartSettings::default(),
            stores.catalog.clone(),
            stores.remote.clone(),
            storage.clone(),
        )
    };
    let lamp = stores.stock("lamp", 1000, 5);

    let first = open();
    first.add_to_cart(&lamp, 3).await.expect("Add should succeed.");
    drop(first);

    let second = open();
    let state = second.load_cart().await;
    assert_eq!(state.quantity_of(&lamp.id), 3);
    assert_eq!(state.totals.total_items, 3);

    second.clear_cart().await.expect("Clear should succeed.");
    assert_eq!(storage.get_item("cart").expect("Read should succeed."), None);

    std::fs::remove_dir_all(storage.directory()).expect("Cleanup should succeed.");
}

#[tokio::test]
async fn validation_before_checkout_reports_removed_lines() {
    let stores = Stores::default();
    let cart = stores.cart();
    let lamp = stores.stock("lamp", 1000, 5);
    let mug = stores.stock("mug", 300, 5);
    cart.add_to_cart(&lamp, 1).await.expect("Add should succeed.");
    cart.add_to_cart(&mug, 4).await.expect("Add should succeed.");

    stores.catalog.set_inventory(&mug.id, Some(1));
    let report = cart.validate_cart().await.expect("Validation should succeed.");

    assert_eq!(report.removed, vec![mug.id.clone()]);
    assert_eq!(
        report.message(),
        Some("Some items in your cart are no longer available and have been removed.")
    );
    assert!(!cart.is_in_cart(&mug.id));
    assert!(cart.is_in_cart(&lamp.id));

    let report = cart.validate_cart().await.expect("Validation should succeed.");
    assert!(report.is_valid());
}
