//! Persistence for the reservation and order engine.
//!
//! # Database: `stockroom`
//!
//! ## Tables (schema `storefront`)
//!
//! - `product` - Catalogue rows and the authoritative `stock` counter
//! - `cart_line` - Reserved cart lines, tombstoned on removal
//! - `customer_order` - Order headers with one canonical status
//! - `order_item` - Immutable order lines with price snapshots
//! - `order_tracking` - Append-only status history, one current row per order
//! - `user` - Identities issued by the auth subsystem
//!
//! # Backends
//!
//! Services talk to an [`InventoryStore`], which hands out one [`StoreTx`]
//! per logical action. [`PgInventoryStore`] is the production backend;
//! [`MemoryInventoryStore`] serialises whole transactions in memory for
//! tests and local development. Dropping a transaction without committing
//! rolls it back in both.
//!
//! # Lock order
//!
//! Every code path acquires row locks in the same order: order row, then
//! tracking rows, then product rows (ascending ID), then cart lines.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/`, embedded in
//! [`MIGRATOR`], and run via:
//! ```bash
//! cargo run -p stockroom-cli -- migrate
//! ```

pub mod cart_lines;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod stock;
pub mod store;
pub mod tracking;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart_lines::CartStore;
pub use memory::{FailurePoint, MemoryInventoryStore};
pub use orders::OrderStore;
pub use postgres::{PgInventoryStore, PgTx};
pub use stock::{DebitOutcome, StockLedger};
pub use store::{InventoryStore, StoreTx};
pub use tracking::TrackingLog;

/// Embedded storefront migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., a second live line for the same product).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Fault injected by the in-memory backend.
    #[error("injected failure at {0:?}")]
    Injected(FailurePoint),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}
