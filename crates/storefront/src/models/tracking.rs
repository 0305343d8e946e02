//! Order tracking events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use stockroom_core::{OrderId, OrderStatus, TrackingEventId};

/// One row of an order's append-only status history.
///
/// Exactly one event per order has `is_current` set once any exist.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrackingEvent {
    pub id: TrackingEventId,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub description: String,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
}
