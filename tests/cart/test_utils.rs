use std::{future::Future, sync::Arc, time::Duration};

use camino::Utf8PathBuf;
use fake::{Fake, Faker};
use rust_decimal::Decimal;
use storefront_cart::{
    construct_app_state,
    domain::cart::{CartApi, CartSettings, Product, ProductId},
    infra::{
        FileLocalStorage, InMemoryCatalog, InMemoryLocalStorage, InMemoryRemoteCartStore,
        get_config_settings,
    },
    AppState,
};
use sqlx::postgres::PgConnectOptions;
use uuid::Uuid;

/// Asserts that a function returns an expected value or retries until it does.
/// Retries every 250ms if the values do not match.
/// Will fail immediately on an error or after 40 retries (10 seconds).
pub async fn assert_until_eq<F, Fut, T, E>(f: F, expected_value: T, label: &str)
where
    F: Fn() -> Fut,
    E: std::fmt::Debug,
    Fut: Future<Output = Result<T, E>>,
    T: PartialEq + std::fmt::Debug,
{
    let delay_ms = 250;
    let max_times = 40;
    let mut times: usize = 0;
    let mut result: T = f().await.unwrap();
    while times < max_times {
        times += 1;
        if result == expected_value {
            break;
        } else {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            println!("Retry #{times} {label}");
            result = f().await.unwrap();
        }
    }
    assert_eq!(result, expected_value);
}

/// Collaborators shared by every cart built in one test, so a test can play two devices
/// or two sessions against the same stores.
#[derive(Default, Clone)]
pub struct Stores {
    pub catalog: Arc<InMemoryCatalog>,
    pub remote: Arc<InMemoryRemoteCartStore>,
    pub local: Arc<InMemoryLocalStorage>,
}

impl Stores {
    pub fn cart(&self) -> CartApi {
        CartApi::new(
            CartSettings::default(),
            self.catalog.clone(),
            self.remote.clone(),
            self.local.clone(),
        )
    }

    pub fn stock(&self, id: &str, price: i64, inventory: u32) -> Product {
        let product = Product {
            id: ProductId::from(id),
            price: Decimal::from(price),
            inventory: Some(inventory),
            ..Faker.fake()
        };
        self.catalog.upsert(product.clone());
        product
    }
}

pub fn scratch_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .expect("Temp dir should be UTF-8.")
        .join(format!("storefront-cart-test-{}", Uuid::new_v4()))
}

pub fn file_storage() -> FileLocalStorage {
    FileLocalStorage::new(scratch_directory()).expect("Local storage should be created.")
}

/// Builds the application against the database `sqlx::test` created for this test.
pub async fn construct_test_app(connect_options: PgConnectOptions) -> AppState {
    let mut settings = get_config_settings().expect("Failed to read configuration.");
    settings.database.database_name = connect_options
        .get_database()
        .expect("Test database should be named.")
        .to_owned();
    settings.application.local_storage_directory = scratch_directory();
    construct_app_state(settings, false)
        .await
        .expect("App state should be constructed.")
}
