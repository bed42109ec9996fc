use serial_test::serial;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use storefront_cart::domain::cart::{CatalogLookup, ProductId, RemoteCartStore, UserId};
use storefront_cart::infra::PgRemoteCartStore;

use crate::test_utils::{assert_until_eq, construct_test_app};

async fn insert_product(pool: &sqlx::PgPool, id: &str, inventory: i32) {
    sqlx::query(
        "INSERT INTO products (product_id, name, price, images, inventory)
         VALUES ($1, $2, 300, ARRAY['/img/shirt.png'], $3)",
    )
    .bind(id)
    .bind(format!("Product {id}"))
    .bind(inventory)
    .execute(pool)
    .await
    .expect("Product should be inserted.");
}

#[sqlx::test]
#[serial]
#[ignore = "needs a running Postgres"]
async fn a_signed_in_cart_is_written_to_postgres_after_the_debounce(
    _pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let app_state = construct_test_app(connect_options).await;
    let pool = app_state.pool.clone().expect("Online app should hold a pool.");
    insert_product(&pool, "shirt", 5).await;
    let user = UserId::new();
    let shirt_id = ProductId::from("shirt");

    let api = app_state.api.clone();
    api.set_auth(Some(user)).await.expect("Sign in should succeed.");
    let shirt = app_state
        .catalog
        .product_by_id(&shirt_id)
        .await
        .expect("Lookup should succeed.")
        .expect("Product should exist.");
    api.add_to_cart(&shirt, 2).await.expect("Add should succeed.");

    let store = &PgRemoteCartStore::new(pool.clone());
    let shirt_id = &shirt_id;
    assert_until_eq(
        || async move {
            store.get_cart(&user).await.map(|cart| {
                cart.and_then(|cart| cart.get(shirt_id).map(|entry| entry.quantity))
            })
        },
        Some(2),
        "waiting for debounced cart write",
    )
    .await;

    app_state.close().await.expect("App should close cleanly.");
}

#[sqlx::test]
#[serial]
#[ignore = "needs a running Postgres"]
async fn stale_remote_lines_are_dropped_on_load(
    _pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let app_state = construct_test_app(connect_options).await;
    let pool = app_state.pool.clone().expect("Online app should hold a pool.");
    insert_product(&pool, "kept", 5).await;
    let user = UserId::new();

    sqlx::query(
        r#"INSERT INTO cart_documents (user_id, items)
           VALUES ($1, '{"kept": {"quantity": 1, "addedAt": "2025-01-01T00:00:00Z"},
                         "retired": {"quantity": 2, "addedAt": "2025-01-01T00:00:01Z"}}'::jsonb)"#,
    )
    .bind(user)
    .execute(&pool)
    .await
    .expect("Cart document should be inserted.");

    app_state.api.set_auth(Some(user)).await.expect("Sign in should succeed.");
    let state = app_state.api.load_cart().await;

    assert_eq!(state.items.len(), 1);
    assert_eq!(state.quantity_of(&"kept".into()), 1);
    assert_eq!(state.items[0].image.as_deref(), Some("/img/shirt.png"));

    app_state.close().await.expect("App should close cleanly.");
}
