use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Drives the cart from the command line. Guest carts live in the local storage
/// directory; signed in carts are kept in Postgres.
#[derive(Debug, Parser)]
#[command(name = "storefront-cart")]
#[command(author, version, about = "Storefront shopping cart tools")]
pub struct Cli {
    /// Act as this signed in user. Omit to use the guest cart.
    #[arg(short, long)]
    pub user: Option<Uuid>,

    /// Use in-memory collaborators instead of Postgres.
    #[arg(long)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: CartCommand,
}

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    /// Print the cart and its totals
    Show,
    /// Add a product to the cart
    Add {
        product_id: String,
        #[arg(default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Set the quantity of a line. Zero or less removes it.
    Update {
        product_id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line from the cart
    Remove { product_id: String },
    /// Empty the cart
    Clear,
    /// Re-check every line against the catalog
    Validate,
    /// Fold the guest cart into the signed in user's cart
    Merge,
}
