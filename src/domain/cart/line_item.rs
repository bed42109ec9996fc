//! Cart lines and the catalog records they are built from.

use jiff::Timestamp;
use rust_decimal::Decimal;

use super::ProductId;

/// One product entry in a cart. `name`, `price`, `image` and `max_quantity` are snapshots
/// taken from the catalog when the line was added or last validated.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: u32,
    pub max_quantity: u32,
    pub added_at: Timestamp,
}

impl CartLineItem {
    /// Builds a line from a catalog product. The stock ceiling is the product inventory at
    /// this moment.
    pub fn from_product(product: &Product, quantity: u32, added_at: Timestamp) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.images.first().cloned(),
            quantity,
            max_quantity: product.inventory.unwrap_or_default(),
            added_at,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    pub fn apply(&mut self, patch: LineItemPatch) {
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(max_quantity) = patch.max_quantity {
            self.max_quantity = max_quantity;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
    }
}

/// Partial update of a cart line. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemPatch {
    pub quantity: Option<u32>,
    pub max_quantity: Option<u32>,
    pub price: Option<Decimal>,
    pub name: Option<String>,
    pub image: Option<Option<String>>,
}

impl LineItemPatch {
    pub fn quantity(quantity: u32) -> Self {
        Self {
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    /// Refreshes every catalog-derived snapshot of a line from a live product.
    pub fn refresh_from(product: &Product) -> Self {
        Self {
            quantity: None,
            max_quantity: Some(product.inventory.unwrap_or_default()),
            price: Some(product.price),
            name: Some(product.name.clone()),
            image: Some(product.images.first().cloned()),
        }
    }
}

/// A catalog product as returned by the catalog lookup. `inventory` is `None` when the
/// catalog has no stock figure for the product.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize, fake::Dummy)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[dummy(faker = "crate::domain::Price")]
    pub price: Decimal,
    pub images: Vec<String>,
    #[dummy(expr = "Some(fake::Fake::fake::<u32>(&crate::domain::Stock))")]
    pub inventory: Option<u32>,
}
