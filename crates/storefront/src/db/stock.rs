//! Stock ledger: the authoritative per-product unit counter.
//!
//! A debit only succeeds when enough units remain; the check and the
//! decrement are one conditional statement so concurrent debits can never
//! drive `stock` below zero.

use async_trait::async_trait;
use sqlx::PgPool;

use stockroom_core::ProductId;

use super::{PgTx, RepositoryError};
use crate::models::{NewProduct, Product};

/// Result of a conditional debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Units were taken; `remaining` is the stock after the debit.
    Applied { remaining: i32 },
    /// Not enough stock; nothing changed.
    Insufficient { available: i32 },
}

/// Row-level stock operations inside a transaction.
#[async_trait]
pub trait StockLedger: Send {
    /// Lock a product row until the transaction ends and return it.
    ///
    /// Returns `None` for unknown IDs. Soft-deleted and inactive products are
    /// still returned so callers can credit them back.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Take `units` from a product if at least that many remain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    async fn debit(&mut self, id: ProductId, units: i32) -> Result<DebitOutcome, RepositoryError>;

    /// Return `units` to a product and report the new stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    async fn credit(&mut self, id: ProductId, units: i32) -> Result<i32, RepositoryError>;
}

const PRODUCT_COLUMNS: &str =
    "id, name, price, stock, status, deleted_at, created_at, updated_at";

#[async_trait]
impl StockLedger for PgTx {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn debit(&mut self, id: ProductId, units: i32) -> Result<DebitOutcome, RepositoryError> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE storefront.product
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING stock
            ",
        )
        .bind(id)
        .bind(units)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(DebitOutcome::Applied { remaining });
        }

        let available: Option<i32> =
            sqlx::query_scalar("SELECT stock FROM storefront.product WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;

        available
            .map(|available| DebitOutcome::Insufficient { available })
            .ok_or(RepositoryError::NotFound)
    }

    async fn credit(&mut self, id: ProductId, units: i32) -> Result<i32, RepositoryError> {
        sqlx::query_scalar(
            r"
            UPDATE storefront.product
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING stock
            ",
        )
        .bind(id)
        .bind(units)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Insert a product outside any reservation flow (seeding, tooling).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn create_product(pool: &PgPool, new: &NewProduct) -> Result<Product, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        r"
        INSERT INTO storefront.product (name, price, stock, status)
        VALUES ($1, $2, $3, $4)
        RETURNING {PRODUCT_COLUMNS}
        "
    ))
    .bind(&new.name)
    .bind(new.price)
    .bind(new.stock)
    .bind(new.status)
    .fetch_one(pool)
    .await?;
    Ok(product)
}

/// List products that are not soft-deleted, by ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_products(pool: &PgPool) -> Result<Vec<Product>, RepositoryError> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE deleted_at IS NULL ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(products)
}
