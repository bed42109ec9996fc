//! Postgres backed collaborators. A signed in user's cart is one JSONB document that is
//! replaced wholesale on every write.

use async_trait::async_trait;
use jiff_sqlx::{Timestamp, ToSqlx};
use rust_decimal::Decimal;
use sqlx::{PgPool, types::Json};
use tracing::debug;

use crate::domain::cart::{
    CatalogLookup, Product, ProductId, RemoteCart, RemoteCartStore, StoreError, UserId,
};

#[derive(sqlx::FromRow, Debug)]
struct CartDocumentRow {
    items: Json<RemoteCart>,
}

#[derive(Debug, Clone)]
pub struct PgRemoteCartStore {
    pool: PgPool,
}

impl PgRemoteCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RemoteCartStore for PgRemoteCartStore {
    async fn get_cart(&self, user_id: &UserId) -> Result<Option<RemoteCart>, StoreError> {
        let row = sqlx::query_as::<_, CartDocumentRow>(
            "SELECT items FROM cart_documents WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| row.items.0))
    }

    async fn update_cart(&self, user_id: &UserId, cart: &RemoteCart) -> Result<(), StoreError> {
        let now: Timestamp = jiff::Timestamp::now().to_sqlx();
        sqlx::query(
            "INSERT INTO cart_documents (user_id, items, updated_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO UPDATE
             SET items = EXCLUDED.items, updated_at = EXCLUDED.updated_at",
        )
        .bind(user_id)
        .bind(Json(cart))
        .bind(now)
        .execute(&self.pool)
        .await?;
        debug!(%user_id, lines = cart.len(), "Replaced remote cart document.");
        Ok(())
    }
}

#[derive(sqlx::FromRow, Debug)]
struct ProductRow {
    product_id: String,
    name: String,
    price: Decimal,
    images: Vec<String>,
    inventory: Option<i32>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(row.product_id),
            name: row.name,
            price: row.price,
            images: row.images,
            inventory: row.inventory.map(|stock| u32::try_from(stock).unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogLookup for PgCatalog {
    async fn product_by_id(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT product_id, name, price, images, inventory
             FROM products WHERE product_id = $1",
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Product::from))
    }
}
