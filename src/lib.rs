pub mod domain;
pub mod infra;

use std::sync::Arc;

use anyhow::Context;
use domain::cart::{
    CartApi, CartSettings, CatalogLookup, LocalStorage, Product, RemoteCartStore,
};
use infra::{
    DatabaseSettings, FileLocalStorage, InMemoryCatalog, InMemoryRemoteCartStore, PgCatalog,
    PgRemoteCartStore, Settings,
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing_appender::non_blocking::WorkerGuard;

/// Local storage key of the product list used by offline runs.
pub const OFFLINE_CATALOG_KEY: &str = "catalog";

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub api: CartApi,
    pub catalog: Arc<dyn CatalogLookup>,
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Flushes unsynced changes and releases the database connections.
    pub async fn close(self) -> anyhow::Result<()> {
        let flushed = self.api.flush().await;
        self.api.shutdown();
        if let Some(pool) = self.pool {
            pool.close().await;
        }
        flushed.context("Could not write the cart before exiting.")
    }
}

pub fn configure_tracing(settings: &Settings) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(
        settings.application.logs_directory.clone(),
        "storefront_cart.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(non_blocking)
        .init();
    _guard
}

/// Builds the cart and its collaborators. Offline runs keep signed in carts in memory
/// and read the catalog from the local storage directory.
pub async fn construct_app_state(settings: Settings, offline: bool) -> anyhow::Result<AppState> {
    let local_storage = FileLocalStorage::new(settings.application.local_storage_directory.clone())
        .with_context(|| {
            format!(
                "Could not open local storage in {}.",
                settings.application.local_storage_directory
            )
        })?;

    let catalog: Arc<dyn CatalogLookup>;
    let remote_store: Arc<dyn RemoteCartStore>;
    let pool = if offline {
        let offline_catalog_store = InMemoryCatalog::default();
        for product in offline_catalog(&local_storage)? {
            offline_catalog_store.upsert(product);
        }
        catalog = Arc::new(offline_catalog_store);
        remote_store = Arc::new(InMemoryRemoteCartStore::default());
        None
    } else {
        let pool = construct_db_pool(&settings.database).await?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("Failed to run database migrations.")?;
        catalog = Arc::new(PgCatalog::new(pool.clone()));
        remote_store = Arc::new(PgRemoteCartStore::new(pool.clone()));
        Some(pool)
    };

    let api = CartApi::new(
        CartSettings::from(&settings.cart),
        catalog.clone(),
        remote_store,
        Arc::new(local_storage),
    );

    Ok(AppState {
        settings,
        api,
        catalog,
        pool,
    })
}

fn offline_catalog(storage: &FileLocalStorage) -> anyhow::Result<Vec<Product>> {
    match storage.get_item(OFFLINE_CATALOG_KEY)? {
        Some(blob) => serde_json::from_str(&blob).with_context(|| {
            format!("Could not parse {OFFLINE_CATALOG_KEY}.json in {}.", storage.directory())
        }),
        None => Ok(Vec::new()),
    }
}

pub async fn construct_db_pool(settings: &DatabaseSettings) -> Result<PgPool, anyhow::Error> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_with(settings.with_db_name())
        .await
        .context("Failed to connect to Postgres database.\n1. Check database is running.\n2. Check Postgres database settings in configuration file(s).")
}
