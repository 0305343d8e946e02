//! Append-only order tracking log.
//!
//! A partial unique index allows one `is_current` row per order, so an
//! append always clears the old marker before inserting the new row.

use async_trait::async_trait;

use stockroom_core::{OrderId, OrderStatus};

use super::{PgTx, RepositoryError};
use crate::models::TrackingEvent;

/// Tracking log operations inside a transaction.
#[async_trait]
pub trait TrackingLog: Send {
    /// Record a new current event for an order.
    async fn append(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        description: &str,
    ) -> Result<TrackingEvent, RepositoryError>;

    /// Every event of an order in append order.
    async fn history(&mut self, order_id: OrderId) -> Result<Vec<TrackingEvent>, RepositoryError>;
}

const EVENT_COLUMNS: &str = "id, order_id, status, description, is_current, created_at";

#[async_trait]
impl TrackingLog for PgTx {
    async fn append(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        description: &str,
    ) -> Result<TrackingEvent, RepositoryError> {
        sqlx::query(
            "UPDATE storefront.order_tracking SET is_current = FALSE \
             WHERE order_id = $1 AND is_current",
        )
        .bind(order_id)
        .execute(&mut *self.tx)
        .await?;

        let event = sqlx::query_as::<_, TrackingEvent>(&format!(
            r"
            INSERT INTO storefront.order_tracking (order_id, status, description, is_current)
            VALUES ($1, $2, $3, TRUE)
            RETURNING {EVENT_COLUMNS}
            "
        ))
        .bind(order_id)
        .bind(status)
        .bind(description)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn history(&mut self, order_id: OrderId) -> Result<Vec<TrackingEvent>, RepositoryError> {
        let events = sqlx::query_as::<_, TrackingEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM storefront.order_tracking \
             WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(events)
    }
}
