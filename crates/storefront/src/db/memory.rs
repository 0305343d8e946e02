//! In-memory backend for tests and local development.
//!
//! A transaction holds the single state mutex for its whole lifetime and
//! works on a private copy of every table. Commit swaps the copy in; drop
//! discards it. Concurrent transactions therefore run one after another,
//! which gives the same all-or-nothing outcome as the `PostgreSQL` backend.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockroom_core::{
    CartLineId, CartOwner, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId,
    ProductStatus, ShippingPolicy, TrackingEventId, UserId,
};

use super::{
    CartStore, DebitOutcome, InventoryStore, OrderStore, RepositoryError, StockLedger, StoreTx,
    TrackingLog,
};
use crate::models::{
    CartItem, CartLine, CartStats, NewOrder, NewOrderItem, NewProduct, Order, OrderItem, Product,
    TrackingEvent,
};

/// A write at which the in-memory backend can be told to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// The next stock credit.
    Credit,
    /// The next tracking append.
    TrackingAppend,
    /// The next commit.
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    products: BTreeMap<ProductId, Product>,
    lines: BTreeMap<CartLineId, CartLine>,
    orders: BTreeMap<OrderId, Order>,
    items: BTreeMap<OrderItemId, OrderItem>,
    tracking: BTreeMap<TrackingEventId, TrackingEvent>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: Tables,
    failpoint: Option<FailurePoint>,
}

/// Store that keeps every table in process memory.
#[derive(Clone, Default)]
pub struct MemoryInventoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryInventoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write at `point` fail with `RepositoryError::Injected`.
    pub async fn inject_failure(&self, point: FailurePoint) {
        self.state.lock().await.failpoint = Some(point);
    }

    /// Insert a product directly, outside any reservation flow.
    pub async fn insert_product(&self, new: NewProduct) -> Product {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let id = ProductId::new(state.tables.next_id());
        let product = Product {
            id,
            name: new.name,
            price: new.price,
            stock: new.stock,
            status: new.status,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.tables.products.insert(id, product.clone());
        product
    }

    /// Change a product's sale status.
    pub async fn set_product_status(&self, id: ProductId, status: ProductStatus) {
        if let Some(product) = self.state.lock().await.tables.products.get_mut(&id) {
            product.status = status;
        }
    }

    /// Soft-delete a product.
    pub async fn soft_delete_product(&self, id: ProductId) {
        if let Some(product) = self.state.lock().await.tables.products.get_mut(&id) {
            product.deleted_at = Some(Utc::now());
        }
    }

    /// Insert an order already in `status`, with one current tracking event
    /// for that status. No stock moves.
    pub async fn insert_order(
        &self,
        user_id: UserId,
        status: OrderStatus,
        items: &[NewOrderItem],
    ) -> Order {
        let mut state = self.state.lock().await;
        let tables = &mut state.tables;
        let now = Utc::now();
        let totals = ShippingPolicy::default()
            .totals(items.iter().map(|item| (item.unit_price, item.quantity)));
        let id = OrderId::new(tables.next_id());
        let order = Order {
            id,
            user_id,
            status,
            payment_status: PaymentStatus::Pending,
            subtotal: totals.subtotal,
            shipping_fee: totals.shipping_fee,
            total: totals.total,
            created_at: now,
            updated_at: now,
            cancelled_at: (status == OrderStatus::Cancelled).then_some(now),
        };
        tables.orders.insert(id, order.clone());
        for item in items {
            let item_id = OrderItemId::new(tables.next_id());
            tables.items.insert(item_id, order_item(item_id, id, item));
        }
        let event_id = TrackingEventId::new(tables.next_id());
        tables.tracking.insert(
            event_id,
            TrackingEvent {
                id: event_id,
                order_id: id,
                status,
                description: status.tracking_description().to_owned(),
                is_current: true,
                created_at: now,
            },
        );
        order
    }

    /// Committed state of a product.
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.state.lock().await.tables.products.get(&id).cloned()
    }

    /// Committed state of an order.
    pub async fn order(&self, id: OrderId) -> Option<Order> {
        self.state.lock().await.tables.orders.get(&id).cloned()
    }

    /// Every line an owner ever had, tombstoned ones included.
    pub async fn cart_lines(&self, owner: CartOwner) -> Vec<CartLine> {
        self.state
            .lock()
            .await
            .tables
            .lines
            .values()
            .filter(|line| line.owner == owner)
            .cloned()
            .collect()
    }

    /// Committed tracking history of an order.
    pub async fn tracking_events(&self, order_id: OrderId) -> Vec<TrackingEvent> {
        self.state
            .lock()
            .await
            .tables
            .tracking
            .values()
            .filter(|event| event.order_id == order_id)
            .cloned()
            .collect()
    }
}

fn order_item(id: OrderItemId, order_id: OrderId, item: &NewOrderItem) -> OrderItem {
    OrderItem {
        id,
        order_id,
        product_id: item.product_id,
        variant_id: item.variant_id,
        quantity: item.quantity,
        unit_price: item.unit_price,
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.tables.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// An open in-memory transaction.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: Tables,
}

impl MemoryTx {
    fn trip(&mut self, point: FailurePoint) -> Result<(), RepositoryError> {
        match self.guard.failpoint.take_if(|armed| *armed == point) {
            Some(point) => Err(RepositoryError::Injected(point)),
            None => Ok(()),
        }
    }

    fn live_line(&self, owner: CartOwner, id: CartLineId) -> Option<CartLine> {
        self.working
            .lines
            .get(&id)
            .filter(|line| line.owner == owner && !line.removed)
            .cloned()
    }

    fn live_line_mut(&mut self, id: CartLineId) -> Result<&mut CartLine, RepositoryError> {
        self.working
            .lines
            .get_mut(&id)
            .filter(|line| !line.removed)
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let mut tx = *self;
        tx.trip(FailurePoint::Commit)?;
        let MemoryTx { mut guard, working } = tx;
        guard.tables = working;
        Ok(())
    }
}

#[async_trait]
impl StockLedger for MemoryTx {
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn debit(&mut self, id: ProductId, units: i32) -> Result<DebitOutcome, RepositoryError> {
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if product.stock < units {
            return Ok(DebitOutcome::Insufficient {
                available: product.stock,
            });
        }
        product.stock -= units;
        product.updated_at = Utc::now();
        Ok(DebitOutcome::Applied {
            remaining: product.stock,
        })
    }

    async fn credit(&mut self, id: ProductId, units: i32) -> Result<i32, RepositoryError> {
        self.trip(FailurePoint::Credit)?;
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        product.stock += units;
        product.updated_at = Utc::now();
        Ok(product.stock)
    }
}

#[async_trait]
impl CartStore for MemoryTx {
    async fn line(
        &mut self,
        owner: CartOwner,
        id: CartLineId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        Ok(self.live_line(owner, id))
    }

    async fn lock_line(
        &mut self,
        owner: CartOwner,
        id: CartLineId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        Ok(self.live_line(owner, id))
    }

    async fn find_active_line(
        &mut self,
        owner: CartOwner,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        Ok(self
            .working
            .lines
            .values()
            .find(|line| line.owner == owner && line.product_id == product_id && !line.removed)
            .cloned())
    }

    async fn insert_line(
        &mut self,
        owner: CartOwner,
        product_id: ProductId,
        quantity: i32,
        unit_price: Money,
    ) -> Result<CartLine, RepositoryError> {
        if self.find_active_line(owner, product_id).await?.is_some() {
            return Err(RepositoryError::Conflict(
                "cart line for this product already exists".to_owned(),
            ));
        }
        let now = Utc::now();
        let id = CartLineId::new(self.working.next_id());
        let line = CartLine {
            id,
            owner,
            product_id,
            quantity,
            unit_price,
            removed: false,
            created_at: now,
            updated_at: now,
        };
        self.working.lines.insert(id, line.clone());
        Ok(line)
    }

    async fn set_line_quantity(
        &mut self,
        id: CartLineId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let line = self.live_line_mut(id)?;
        line.quantity = quantity;
        line.updated_at = Utc::now();
        Ok(())
    }

    async fn remove_line(&mut self, id: CartLineId) -> Result<(), RepositoryError> {
        let line = self.live_line_mut(id)?;
        line.removed = true;
        line.updated_at = Utc::now();
        Ok(())
    }

    async fn active_lines(&mut self, owner: CartOwner) -> Result<Vec<CartLine>, RepositoryError> {
        Ok(self
            .working
            .lines
            .values()
            .filter(|line| line.owner == owner && !line.removed)
            .cloned()
            .collect())
    }

    async fn priced_lines(&mut self, owner: CartOwner) -> Result<Vec<CartItem>, RepositoryError> {
        let products = &self.working.products;
        Ok(self
            .working
            .lines
            .values()
            .filter(|line| line.owner == owner && !line.removed)
            .filter_map(|line| {
                let product = products.get(&line.product_id)?;
                product.is_purchasable().then(|| CartItem {
                    line_id: line.id,
                    product_id: line.product_id,
                    name: product.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
            })
            .collect())
    }

    async fn stats(&mut self, owner: CartOwner) -> Result<CartStats, RepositoryError> {
        let mut products = BTreeSet::new();
        let mut total_quantity = 0_i64;
        for line in self
            .working
            .lines
            .values()
            .filter(|line| line.owner == owner && !line.removed)
        {
            products.insert(line.product_id);
            total_quantity += i64::from(line.quantity);
        }
        Ok(CartStats {
            items_count: i64::try_from(products.len()).unwrap_or(i64::MAX),
            total_quantity,
        })
    }
}

#[async_trait]
impl OrderStore for MemoryTx {
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .working
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let now = Utc::now();
        let id = OrderId::new(self.working.next_id());
        let order = Order {
            id,
            user_id: new.user_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            subtotal: new.totals.subtotal,
            shipping_fee: new.totals.shipping_fee,
            total: new.totals.total,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };
        self.working.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn insert_item(
        &mut self,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        if !self.working.orders.contains_key(&order_id) {
            return Err(RepositoryError::NotFound);
        }
        let id = OrderItemId::new(self.working.next_id());
        let item = order_item(id, order_id, item);
        self.working.items.insert(id, item.clone());
        Ok(item)
    }

    async fn items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        Ok(self
            .working
            .items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Result<Order, RepositoryError> {
        let order = self
            .working
            .orders
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = status;
        order.updated_at = at;
        if cancelled_at.is_some() {
            order.cancelled_at = cancelled_at;
        }
        Ok(order.clone())
    }
}

#[async_trait]
impl TrackingLog for MemoryTx {
    async fn append(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        description: &str,
    ) -> Result<TrackingEvent, RepositoryError> {
        self.trip(FailurePoint::TrackingAppend)?;
        for event in self
            .working
            .tracking
            .values_mut()
            .filter(|event| event.order_id == order_id)
        {
            event.is_current = false;
        }
        let id = TrackingEventId::new(self.working.next_id());
        let event = TrackingEvent {
            id,
            order_id,
            status,
            description: description.to_owned(),
            is_current: true,
            created_at: Utc::now(),
        };
        self.working.tracking.insert(id, event.clone());
        Ok(event)
    }

    async fn history(&mut self, order_id: OrderId) -> Result<Vec<TrackingEvent>, RepositoryError> {
        Ok(self
            .working
            .tracking
            .values()
            .filter(|event| event.order_id == order_id)
            .cloned()
            .collect())
    }
}
