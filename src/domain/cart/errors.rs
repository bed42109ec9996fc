use super::ProductId;

/// Failures surfaced to callers of the cart API. The messages are user facing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("Quantity must be at least 1.")]
    InvalidQuantity,
    #[error("You can add at most {limit} of an item to your cart.")]
    ExceedsPerItemLimit { limit: u32 },
    #[error("{name} is out of stock.")]
    OutOfStock { name: String },
    #[error("Only {available} of {name} available ({in_cart} already in your cart).")]
    ExceedsStock {
        name: String,
        available: u32,
        in_cart: u32,
    },
    #[error("Only {max_quantity} of this item available.")]
    ExceedsMaxQuantity { max_quantity: u32 },
    #[error("Item {0} is not in your cart.")]
    NotInCart(ProductId),
    #[error("Sign in to merge your guest cart.")]
    NotAuthenticated,
    #[error("Could not check your cart against the catalog. Please try again.")]
    CatalogUnavailable,
    #[error("Could not sync your cart: {0}")]
    Persistence(String),
}

/// Failures of the collaborators behind the cart: catalog, remote store and local storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Unavailable(String),
}

impl From<StoreError> for CartError {
    fn from(error: StoreError) -> Self {
        CartError::Persistence(error.to_string())
    }
}
