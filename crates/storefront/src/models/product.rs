//! Product domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Money, ProductId, ProductStatus};

/// A sellable product and its authoritative stock count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current unit price. Cart lines snapshot this on creation.
    pub price: Money,
    /// Units available for reservation. Never negative.
    pub stock: i32,
    /// Whether the product is on sale.
    pub status: ProductStatus,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether new units of this product may be reserved.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Active && self.deleted_at.is_none()
    }
}

/// Input for creating a product (seeding and admin tooling).
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: i32,
    #[serde(default)]
    pub status: ProductStatus,
}
