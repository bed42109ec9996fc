pub mod cart;
mod helpers;

pub use helpers::fake::{Price, Stock};
