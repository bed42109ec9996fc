use std::time::Duration;

use storefront_cart::domain::cart::{SyncPhase, UserId};

use crate::test_utils::Stores;

async fn settle(duration_ms: u64) {
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
}

#[tokio::test(start_paused = true)]
async fn a_signed_in_cart_follows_the_user_to_another_device() {
    let stores = Stores::default();
    let user = UserId::new();
    let shirt = stores.stock("shirt", 300, 10);

    let laptop = stores.cart();
    laptop.set_auth(Some(user)).await.expect("Sign in should succeed.");
    laptop.add_to_cart(&shirt, 1).await.expect("Add should succeed.");
    laptop.update_quantity(&shirt.id, 2).await.expect("Update should succeed.");
    laptop.update_quantity(&shirt.id, 3).await.expect("Update should succeed.");
    settle(1500).await;
    assert_eq!(stores.remote.write_count(), 1);

    let phone = stores.cart();
    phone.set_auth(Some(user)).await.expect("Sign in should succeed.");
    assert_eq!(phone.get_item_quantity(&shirt.id), 3);
    assert_eq!(phone.phase(), SyncPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn signing_in_moves_the_guest_cart_and_signing_out_leaves_it_behind() {
    let stores = Stores::default();
    let user = UserId::new();
    let shirt = stores.stock("shirt", 300, 10);
    let cart = stores.cart();

    cart.add_to_cart(&shirt, 2).await.expect("Add should succeed.");
    let report = cart
        .set_auth(Some(user))
        .await
        .expect("Sign in should succeed.")
        .expect("Sign in should merge.");
    assert_eq!(report.merged, 1);
    assert_eq!(cart.user(), Some(user));

    let again = cart.merge_guest_cart().await.expect("Merge should succeed.");
    assert!(again.is_empty());
    assert_eq!(cart.get_item_quantity(&shirt.id), 2);

    cart.flush().await.expect("Flush should succeed.");
    cart.set_auth(None).await.expect("Sign out should succeed.");
    assert!(cart.load_cart().await.is_empty());
    settle(3000).await;

    cart.set_auth(Some(user)).await.expect("Sign in should succeed.");
    assert_eq!(cart.get_item_quantity(&shirt.id), 2);
    assert_eq!(stores.remote.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_drops_the_pending_write() {
    let stores = Stores::default();
    let user = UserId::new();
    let shirt = stores.stock("shirt", 300, 10);
    let cart = stores.cart();
    cart.set_auth(Some(user)).await.expect("Sign in should succeed.");

    cart.add_to_cart(&shirt, 1).await.expect("Add should succeed.");
    assert!(cart.has_pending_write());
    cart.shutdown();
    settle(3000).await;

    assert!(!cart.has_pending_write());
    assert_eq!(stores.remote.write_count(), 0);
}
