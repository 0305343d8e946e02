//! Transaction seam shared by every storage backend.

use async_trait::async_trait;

use super::{CartStore, OrderStore, RepositoryError, StockLedger, TrackingLog};

/// A source of transactions.
///
/// Implementations must be thread-safe; the store is shared by every request.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Open a transaction. Writes become visible to others only on commit.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// One open transaction spanning stock, carts, orders, and tracking.
///
/// Dropping a `StoreTx` without calling [`commit`](Self::commit) rolls back
/// every write made through it.
#[async_trait]
pub trait StoreTx: StockLedger + CartStore + OrderStore + TrackingLog {
    /// Make all writes durable and visible.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}
