//! Order fulfilment commands.

use std::sync::Arc;

use stockroom_core::{OrderId, OrderStatus, ShippingPolicy};
use stockroom_storefront::db::PgInventoryStore;
use stockroom_storefront::services::{LogNotifier, OrderService};

use super::{CliError, connect};

/// Move an order forward to `to`, recording a tracking event.
///
/// # Errors
///
/// Returns an error if the order does not exist, the move is not allowed
/// from its current status, or the database fails.
pub async fn advance(order_id: OrderId, to: OrderStatus) -> Result<(), CliError> {
    let pool = connect().await?;
    let orders = OrderService::new(
        Arc::new(PgInventoryStore::new(pool)),
        Arc::new(LogNotifier),
        ShippingPolicy::default(),
    );

    let order = orders.advance_order(order_id, to).await?;
    tracing::info!(order_id = %order.id, status = %order.status, "order advanced");
    Ok(())
}
