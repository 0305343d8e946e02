//! `PostgreSQL` backend.
//!
//! Each [`PgTx`] wraps one sqlx transaction at the server's default
//! isolation (read committed). Row locks are taken with `SELECT ... FOR
//! UPDATE`; stock decrements are single conditional `UPDATE` statements.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::{InventoryStore, RepositoryError, StoreTx};

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// An open `PostgreSQL` transaction.
///
/// sqlx rolls the transaction back when this is dropped uncommitted.
pub struct PgTx {
    pub(super) tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
