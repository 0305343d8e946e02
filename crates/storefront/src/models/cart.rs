//! Cart domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use stockroom_core::{CartLineId, CartOwner, CartTotals, Money, ProductId};

/// A reserved line in a shopper's cart.
///
/// Stock for `quantity` units has already been debited from the product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Unique line ID.
    pub id: CartLineId,
    /// Who owns the line.
    pub owner: CartOwner,
    /// Reserved product.
    pub product_id: ProductId,
    /// Reserved units (at least 1 while the line is live).
    pub quantity: i32,
    /// Unit price when the line was first created.
    pub unit_price: Money,
    /// Tombstone. Removed lines are invisible to every read path.
    pub removed: bool,
    /// When the line was created.
    pub created_at: DateTime<Utc>,
    /// When the quantity last changed.
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counts for a cart badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, sqlx::FromRow)]
pub struct CartStats {
    /// Distinct products in the cart.
    pub items_count: i64,
    /// Total reserved units.
    pub total_quantity: i64,
}

/// A cart line joined with its (still purchasable) product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Money,
}

impl CartItem {
    /// `quantity × unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Everything the cart page needs.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub stats: CartStats,
    #[serde(flatten)]
    pub totals: CartTotals,
}
