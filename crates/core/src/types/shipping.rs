//! Shipping fee rule and cart totals.

use serde::{Deserialize, Serialize};

use super::money::Money;

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Money,
    /// Fee charged below the threshold.
    pub flat_fee: Money,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::from_units(50_000),
            flat_fee: Money::from_units(1_500),
        }
    }
}

impl ShippingPolicy {
    /// Shipping fee for a non-empty cart with the given subtotal.
    #[must_use]
    pub fn fee_for(&self, subtotal: Money) -> Money {
        if subtotal >= self.free_shipping_threshold {
            Money::ZERO
        } else {
            self.flat_fee
        }
    }

    /// Compute totals for an iterator of `(unit_price, quantity)` pairs.
    ///
    /// The fee is zero only for an empty cart or a subtotal at the
    /// threshold. Zero-priced lines still pay the flat fee.
    #[must_use]
    pub fn totals<I>(&self, lines: I) -> CartTotals
    where
        I: IntoIterator<Item = (Money, i32)>,
    {
        let mut line_count = 0_usize;
        let subtotal: Money = lines
            .into_iter()
            .inspect(|_| line_count += 1)
            .map(|(price, quantity)| price.times(quantity))
            .sum();
        let shipping_fee = if line_count == 0 {
            Money::ZERO
        } else {
            self.fee_for(subtotal)
        };
        CartTotals {
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
        }
    }
}

/// Subtotal, shipping fee, and grand total of a cart or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ShippingPolicy {
        ShippingPolicy {
            free_shipping_threshold: Money::from_units(50_000),
            flat_fee: Money::from_units(1_500),
        }
    }

    #[test]
    fn test_below_threshold_pays_flat_fee() {
        let totals = policy().totals([(Money::from_units(24_000), 2)]);
        assert_eq!(totals.subtotal, Money::from_units(48_000));
        assert_eq!(totals.shipping_fee, Money::from_units(1_500));
        assert_eq!(totals.total, Money::from_units(49_500));
    }

    #[test]
    fn test_above_threshold_ships_free() {
        let totals = policy().totals([
            (Money::from_units(20_000), 2),
            (Money::from_units(12_000), 1),
        ]);
        assert_eq!(totals.subtotal, Money::from_units(52_000));
        assert_eq!(totals.shipping_fee, Money::ZERO);
        assert_eq!(totals.total, Money::from_units(52_000));
    }

    #[test]
    fn test_exact_threshold_ships_free() {
        assert_eq!(policy().fee_for(Money::from_units(50_000)), Money::ZERO);
    }

    #[test]
    fn test_free_items_still_pay_flat_fee() {
        let totals = policy().totals([(Money::ZERO, 2)]);
        assert_eq!(totals.subtotal, Money::ZERO);
        assert_eq!(totals.shipping_fee, Money::from_units(1_500));
        assert_eq!(totals.total, Money::from_units(1_500));
        assert_eq!(policy().fee_for(Money::ZERO), Money::from_units(1_500));
    }

    #[test]
    fn test_empty_cart_has_no_fee() {
        let totals = policy().totals(std::iter::empty());
        assert_eq!(totals, CartTotals::default());
    }
}
