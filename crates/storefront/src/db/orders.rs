//! Order header and line persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockroom_core::{OrderId, OrderStatus, UserId};

use super::{PgTx, RepositoryError};
use crate::models::{NewOrder, NewOrderItem, Order, OrderItem};

/// Order operations inside a transaction.
#[async_trait]
pub trait OrderStore: Send {
    /// Lock an order row until the transaction ends and return it.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Read an order without locking it.
    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// A user's orders, newest first.
    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Insert a pending, unpaid order header.
    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order, RepositoryError>;

    /// Insert one order line.
    async fn insert_item(
        &mut self,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError>;

    /// Lines of an order, by ID.
    async fn items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError>;

    /// Write a new status. `cancelled_at` is only overwritten when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    async fn update_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Result<Order, RepositoryError>;
}

const ORDER_COLUMNS: &str = "id, user_id, status, payment_status, subtotal, shipping_fee, total, \
                             created_at, updated_at, cancelled_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, variant_id, quantity, unit_price";

#[async_trait]
impl OrderStore for PgTx {
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(order)
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(order)
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(orders)
    }

    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO storefront.customer_order (user_id, subtotal, shipping_fee, total)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(new.user_id)
        .bind(new.totals.subtotal)
        .bind(new.totals.shipping_fee)
        .bind(new.totals.total)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(order)
    }

    async fn insert_item(
        &mut self,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        let item = sqlx::query_as::<_, OrderItem>(&format!(
            r"
            INSERT INTO storefront.order_item (order_id, product_id, variant_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ITEM_COLUMNS}
            "
        ))
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.variant_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM storefront.order_item WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn update_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE storefront.customer_order
            SET status = $2, updated_at = $3, cancelled_at = COALESCE($4, cancelled_at)
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .bind(at)
        .bind(cancelled_at)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
