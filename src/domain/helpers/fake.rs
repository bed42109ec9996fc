use fake::{Dummy, rand::seq::IteratorRandom};
use rust_decimal::Decimal;

pub struct Price;

impl Dummy<Price> for Decimal {
    fn dummy_with_rng<R: fake::Rng + ?Sized>(_config: &Price, rng: &mut R) -> Self {
        let value = (10..100_000).choose(rng).unwrap_or(100);
        Decimal::new(value, 2)
    }
}

/// Catalog stock between 1 and 50 units.
pub struct Stock;

impl Dummy<Stock> for u32 {
    fn dummy_with_rng<R: fake::Rng + ?Sized>(_config: &Stock, rng: &mut R) -> Self {
        (1..=50).choose(rng).unwrap_or(1)
    }
}
