//! Derived cart totals.

use rust_decimal::{Decimal, RoundingStrategy};

use super::CartLineItem;

/// Tax, shipping and free-shipping rules applied to a cart.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PricingPolicy {
    pub tax_rate: Decimal,
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(18, 2),
            free_shipping_threshold: Decimal::from(999),
            flat_shipping_fee: Decimal::from(50),
        }
    }
}

impl PricingPolicy {
    pub fn totals(&self, items: &[CartLineItem]) -> CartTotals {
        let total_items = items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity));
        let subtotal: Decimal = items.iter().map(CartLineItem::line_total).sum();
        let tax = round2(subtotal * self.tax_rate);
        let shipping = if subtotal > Decimal::ZERO && subtotal < self.free_shipping_threshold {
            self.flat_shipping_fee
        } else {
            Decimal::ZERO
        };

        CartTotals {
            total_items,
            subtotal,
            tax,
            shipping,
            discount: Decimal::ZERO,
            total_amount: subtotal + tax + shipping,
        }
    }
}

/// Totals under the default business policy.
pub fn compute_totals(items: &[CartLineItem]) -> CartTotals {
    PricingPolicy::default().totals(items)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CartTotals {
    pub total_items: u32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
}

impl CartTotals {
    /// Applies a coupon amount. The discount never takes the total below zero.
    pub fn with_discount(self, amount: Decimal) -> Self {
        let gross = self.subtotal + self.tax + self.shipping;
        let discount = amount.max(Decimal::ZERO).min(gross);
        Self {
            discount,
            total_amount: gross - discount,
            ..self
        }
    }
}

/// Round half up to two decimal places.
fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

//-------------------------- Tests -------------------------------
