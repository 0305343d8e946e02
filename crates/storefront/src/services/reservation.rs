//! Cart reservations.
//!
//! Adding a product to a cart debits its stock immediately; shrinking or
//! removing a line credits exactly what the line released. Every operation
//! runs in one store transaction, so the cart line and the stock counter
//! change together or not at all.
//!
//! Locks are taken product first, then cart line. When a line ID is the
//! starting point, the line is read unlocked to learn its product, the
//! product is locked, and the line is locked and read again.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use stockroom_core::{
    CartLineId, CartOwner, MAX_QUANTITY_PER_REQUEST, ProductId, Quantity, ShippingPolicy,
};

use super::CommerceError;
use crate::db::{DebitOutcome, InventoryStore, RepositoryError, StoreTx};
use crate::models::{CartStats, CartSummary};

/// The product side of a successful add.
#[derive(Debug, Clone, Serialize)]
pub struct ReservedProduct {
    pub id: ProductId,
    pub name: String,
    pub remaining_stock: i32,
}

/// Result of [`ReservationService::add_item`].
#[derive(Debug, Clone, Serialize)]
pub struct AddItemOutcome {
    pub cart: CartStats,
    pub product: ReservedProduct,
}

/// Reserves and releases stock through cart lines.
#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn InventoryStore>,
    shipping: ShippingPolicy,
}

impl ReservationService {
    /// Create a reservation service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn InventoryStore>, shipping: ShippingPolicy) -> Self {
        Self { store, shipping }
    }

    /// Reserve `quantity` more units of a product for `owner`.
    ///
    /// Merges into the owner's live line for the product if there is one.
    ///
    /// # Errors
    ///
    /// - `ProductNotFound` if the product is unknown, inactive, or deleted.
    /// - `OutOfStock` if the merged line quantity exceeds current stock.
    /// - `Storage` if the transaction fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn add_item(
        &self,
        owner: CartOwner,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<AddItemOutcome, CommerceError> {
        let mut tx = self.store.begin().await?;

        let product = tx
            .lock_product(product_id)
            .await?
            .filter(|product| product.is_purchasable())
            .ok_or(CommerceError::ProductNotFound(product_id))?;

        let existing = tx.find_active_line(owner, product_id).await?;
        let requested = quantity.get();
        let merged = existing
            .as_ref()
            .map_or(Some(requested), |line| line.quantity.checked_add(requested));
        let new_quantity = match merged {
            Some(quantity) if quantity <= product.stock => quantity,
            _ => {
                return Err(CommerceError::OutOfStock {
                    product_id,
                    requested: merged.unwrap_or(i32::MAX),
                    available: product.stock,
                });
            }
        };

        let remaining_stock = match tx.debit(product_id, requested).await? {
            DebitOutcome::Applied { remaining } => remaining,
            DebitOutcome::Insufficient { available } => {
                return Err(CommerceError::OutOfStock {
                    product_id,
                    requested,
                    available,
                });
            }
        };

        match existing {
            Some(line) => tx.set_line_quantity(line.id, new_quantity).await?,
            None => {
                tx.insert_line(owner, product_id, requested, product.price)
                    .await?;
            }
        }

        let cart = tx.stats(owner).await?;
        tx.commit().await?;

        tracing::info!(
            %product_id,
            quantity = requested,
            line_quantity = new_quantity,
            remaining_stock,
            "reserved stock"
        );

        Ok(AddItemOutcome {
            cart,
            product: ReservedProduct {
                id: product.id,
                name: product.name,
                remaining_stock,
            },
        })
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// Increases debit the difference; decreases credit it back.
    ///
    /// # Errors
    ///
    /// - `Validation` if `new_quantity` is outside `0..=99`.
    /// - `CartLineNotFound` if the line is not a live line of `owner`.
    /// - `ProductNotFound` when increasing a line whose product is no longer for sale.
    /// - `OutOfStock` if an increase exceeds current stock.
    /// - `Storage` if the transaction fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn update_quantity(
        &self,
        owner: CartOwner,
        line_id: CartLineId,
        new_quantity: i32,
    ) -> Result<CartSummary, CommerceError> {
        if !(0..=MAX_QUANTITY_PER_REQUEST).contains(&new_quantity) {
            return Err(CommerceError::Validation(format!(
                "quantity must be between 0 and {MAX_QUANTITY_PER_REQUEST}"
            )));
        }
        if new_quantity == 0 {
            return self.remove_item(owner, line_id).await;
        }

        let mut tx = self.store.begin().await?;

        let product_id = tx
            .line(owner, line_id)
            .await?
            .ok_or(CommerceError::CartLineNotFound(line_id))?
            .product_id;
        let product = tx
            .lock_product(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))?;
        let line = tx
            .lock_line(owner, line_id)
            .await?
            .ok_or(CommerceError::CartLineNotFound(line_id))?;

        match new_quantity.cmp(&line.quantity) {
            Ordering::Greater => {
                if !product.is_purchasable() {
                    return Err(CommerceError::ProductNotFound(product_id));
                }
                let delta = new_quantity - line.quantity;
                if let DebitOutcome::Insufficient { available } =
                    tx.debit(product_id, delta).await?
                {
                    return Err(CommerceError::OutOfStock {
                        product_id,
                        requested: delta,
                        available,
                    });
                }
            }
            Ordering::Less => {
                tx.credit(product_id, line.quantity - new_quantity).await?;
            }
            Ordering::Equal => {}
        }

        tx.set_line_quantity(line_id, new_quantity).await?;
        let summary = self.summarize(tx.as_mut(), owner).await?;
        tx.commit().await?;

        tracing::info!(
            %line_id,
            from = line.quantity,
            to = new_quantity,
            "updated cart line"
        );
        Ok(summary)
    }

    /// Remove a line and return its units to stock.
    ///
    /// # Errors
    ///
    /// - `CartLineNotFound` if the line is not a live line of `owner`.
    /// - `Storage` if the transaction fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn remove_item(
        &self,
        owner: CartOwner,
        line_id: CartLineId,
    ) -> Result<CartSummary, CommerceError> {
        let mut tx = self.store.begin().await?;

        let product_id = tx
            .line(owner, line_id)
            .await?
            .ok_or(CommerceError::CartLineNotFound(line_id))?
            .product_id;
        tx.lock_product(product_id).await?;
        let line = tx
            .lock_line(owner, line_id)
            .await?
            .ok_or(CommerceError::CartLineNotFound(line_id))?;

        tx.credit(product_id, line.quantity).await?;
        tx.remove_line(line_id).await?;

        let summary = self.summarize(tx.as_mut(), owner).await?;
        tx.commit().await?;

        tracing::info!(%line_id, %product_id, released = line.quantity, "removed cart line");
        Ok(summary)
    }

    /// Remove every live line of `owner`, returning all units to stock.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the transaction fails; nothing is released then.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn clear_cart(&self, owner: CartOwner) -> Result<CartSummary, CommerceError> {
        let mut tx = self.store.begin().await?;

        let lines = tx.active_lines(owner).await?;
        let products: BTreeSet<ProductId> = lines.iter().map(|line| line.product_id).collect();
        for product_id in products {
            tx.lock_product(product_id).await?;
        }

        let mut released = 0;
        for candidate in &lines {
            let Some(line) = tx.lock_line(owner, candidate.id).await? else {
                continue;
            };
            tx.credit(line.product_id, line.quantity).await?;
            tx.remove_line(line.id).await?;
            released += line.quantity;
        }

        let summary = self.summarize(tx.as_mut(), owner).await?;
        tx.commit().await?;

        tracing::info!(lines = lines.len(), released, "cleared cart");
        Ok(summary)
    }

    /// Priced cart contents with subtotal, shipping, and total.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the read fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn list_cart(&self, owner: CartOwner) -> Result<CartSummary, CommerceError> {
        let mut tx = self.store.begin().await?;
        let summary = self.summarize(tx.as_mut(), owner).await?;
        tx.commit().await?;
        Ok(summary)
    }

    /// Line and unit counts for the cart badge.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the read fails.
    pub async fn cart_stats(&self, owner: CartOwner) -> Result<CartStats, CommerceError> {
        let mut tx = self.store.begin().await?;
        let stats = tx.stats(owner).await?;
        tx.commit().await?;
        Ok(stats)
    }

    async fn summarize(
        &self,
        tx: &mut dyn StoreTx,
        owner: CartOwner,
    ) -> Result<CartSummary, RepositoryError> {
        let items = tx.priced_lines(owner).await?;
        let stats = tx.stats(owner).await?;
        let totals = self
            .shipping
            .totals(items.iter().map(|item| (item.unit_price, item.quantity)));
        Ok(CartSummary {
            items,
            stats,
            totals,
        })
    }
}
