//! Order lifecycle: checkout, fulfilment moves, and cancellation.
//!
//! Status changes go through [`OrderStatus::transition_to`], so an illegal
//! move fails before anything is written. Cancellation returns every order
//! item's units to stock in the same transaction that flips the status.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use stockroom_core::{CartOwner, OrderId, OrderStatus, ShippingPolicy, UserId};

use super::CommerceError;
use super::notification::{CancellationNotice, OrderNotifier};
use crate::db::InventoryStore;
use crate::models::{CurrentUser, NewOrder, NewOrderItem, Order, OrderDetail, OrderItem};

/// Places, advances, cancels, and reads orders.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn InventoryStore>,
    notifier: Arc<dyn OrderNotifier>,
    shipping: ShippingPolicy,
}

impl OrderService {
    /// Create an order service.
    #[must_use]
    pub fn new(
        store: Arc<dyn InventoryStore>,
        notifier: Arc<dyn OrderNotifier>,
        shipping: ShippingPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            shipping,
        }
    }

    /// Turn a user's purchasable cart lines into a pending order.
    ///
    /// Reserved stock carries over to the order, so no stock moves. Lines of
    /// products no longer for sale stay in the cart.
    ///
    /// # Errors
    ///
    /// - `EmptyCart` if nothing in the cart can be bought.
    /// - `Storage` if the transaction fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn place_order(&self, user_id: UserId) -> Result<Order, CommerceError> {
        let owner = CartOwner::User(user_id);
        let mut tx = self.store.begin().await?;

        let candidates = tx.priced_lines(owner).await?;
        let products: BTreeSet<_> = candidates.iter().map(|item| item.product_id).collect();
        for product_id in products {
            tx.lock_product(product_id).await?;
        }

        let mut lines = Vec::with_capacity(candidates.len());
        for item in candidates {
            if let Some(line) = tx.lock_line(owner, item.line_id).await? {
                lines.push((line.id, NewOrderItem {
                    product_id: line.product_id,
                    variant_id: None,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                }));
            }
        }
        if lines.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let totals = self
            .shipping
            .totals(lines.iter().map(|(_, item)| (item.unit_price, item.quantity)));
        let order = tx.insert_order(&NewOrder { user_id, totals }).await?;
        tx.append(
            order.id,
            OrderStatus::Pending,
            OrderStatus::Pending.tracking_description(),
        )
        .await?;
        for (line_id, item) in &lines {
            tx.insert_item(order.id, item).await?;
            tx.remove_line(*line_id).await?;
        }
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            lines = lines.len(),
            total = %order.total,
            "order placed"
        );
        Ok(order)
    }

    /// Cancel one of the user's orders and return its units to stock.
    ///
    /// The cancellation email is sent in the background after commit; a
    /// failed send is logged and does not undo the cancellation.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if the order does not exist or is not the user's.
    /// - `InvalidTransition` if the order is shipped, delivered, or already cancelled.
    /// - `Storage` if the transaction fails; nothing changes then.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn cancel_order(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
    ) -> Result<Order, CommerceError> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .filter(|order| order.user_id == user.id)
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        let status = order.status.transition_to(OrderStatus::Cancelled)?;

        let now = Utc::now();
        let order = tx.update_status(order_id, status, now, Some(now)).await?;
        tx.append(order_id, status, status.tracking_description())
            .await?;

        let mut items = tx.items(order_id).await?;
        items.sort_by_key(|item| (item.product_id, item.id));
        for item in &items {
            tx.credit(item.product_id, item.quantity).await?;
        }

        tx.commit().await?;

        tracing::info!(
            %order_id,
            restored_units = items.iter().map(|item| item.quantity).sum::<i32>(),
            "order cancelled"
        );

        self.notify_cancellation(user, &order, items);
        Ok(order)
    }

    /// Move an order forward through fulfilment.
    ///
    /// # Errors
    ///
    /// - `Validation` if `to` is `cancelled`; use [`cancel_order`](Self::cancel_order).
    /// - `OrderNotFound` if the order does not exist.
    /// - `InvalidTransition` if the move is not allowed from the current status.
    /// - `Storage` if the transaction fails.
    #[instrument(skip(self))]
    pub async fn advance_order(
        &self,
        order_id: OrderId,
        to: OrderStatus,
    ) -> Result<Order, CommerceError> {
        if to == OrderStatus::Cancelled {
            return Err(CommerceError::Validation(
                "orders are cancelled through cancel_order".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        let status = order.status.transition_to(to)?;

        let order = tx.update_status(order_id, status, Utc::now(), None).await?;
        tx.append(order_id, status, status.tracking_description())
            .await?;
        tx.commit().await?;

        tracing::info!(%order_id, status = %status, "order advanced");
        Ok(order)
    }

    /// An order with its lines and tracking history.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if the order does not exist or is not the user's.
    /// - `Storage` if the read fails.
    pub async fn order_detail(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetail, CommerceError> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .order(order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        let items = tx.items(order_id).await?;
        let tracking = tx.history(order_id).await?;
        tx.commit().await?;

        Ok(OrderDetail {
            order,
            items,
            tracking,
        })
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the read fails.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, CommerceError> {
        let mut tx = self.store.begin().await?;
        let orders = tx.orders_for_user(user_id).await?;
        tx.commit().await?;
        Ok(orders)
    }

    fn notify_cancellation(&self, user: &CurrentUser, order: &Order, items: Vec<OrderItem>) {
        let notice = CancellationNotice {
            order_id: order.id,
            email: user.email.clone(),
            total: order.total,
            cancelled_at: order.cancelled_at.unwrap_or(order.updated_at),
            items,
        };
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.send_order_cancellation_email(&notice).await {
                tracing::warn!(
                    order_id = %notice.order_id,
                    error = %e,
                    "failed to send cancellation email"
                );
            }
        });
    }
}
