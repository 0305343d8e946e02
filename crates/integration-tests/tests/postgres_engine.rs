//! The reservation and order engine over `PostgreSQL`.
//!
//! These tests share one `PostgreSQL` container and need Docker. Run with:
//!
//! ```bash
//! cargo test -p stockroom-integration-tests --test postgres_engine -- --ignored --test-threads=1
//! ```
//!
//! Tests do not truncate; each one creates its own users and products.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use stockroom_core::{
    CartOwner, GuestKey, Money, OrderStatus, ProductStatus, Quantity, ShippingPolicy, UserId,
};
use stockroom_integration_tests::RecordingNotifier;
use stockroom_storefront::db::{
    InventoryStore, MIGRATOR, PgInventoryStore, RepositoryError, stock::create_product,
};
use stockroom_storefront::models::{CurrentUser, NewProduct, Product};
use stockroom_storefront::services::{CommerceError, OrderService, ReservationService};

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string = format!("postgres://postgres:postgres@{host}:{port}/postgres");

            let pool = PgPool::connect(&connection_string).await.unwrap();
            MIGRATOR.run(&pool).await.unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

struct PgEngine {
    pool: PgPool,
    store: Arc<PgInventoryStore>,
    reservations: ReservationService,
    orders: OrderService,
}

impl PgEngine {
    async fn new() -> Self {
        let info = container_info().await;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&info.connection_string)
            .await
            .unwrap();
        let store = Arc::new(PgInventoryStore::new(pool.clone()));
        let shipping = ShippingPolicy::default();
        Self {
            reservations: ReservationService::new(store.clone(), shipping),
            orders: OrderService::new(
                store.clone(),
                Arc::new(RecordingNotifier::default()),
                shipping,
            ),
            pool,
            store,
        }
    }

    async fn product(&self, stock: i32) -> Product {
        create_product(
            &self.pool,
            &NewProduct {
                name: "Oak bookshelf".to_string(),
                price: Money::from_units(18_500),
                stock,
                status: ProductStatus::Active,
            },
        )
        .await
        .unwrap()
    }

    async fn user(&self) -> CurrentUser {
        let email = format!("{}@example.com", GuestKey::generate());
        let id: i64 =
            sqlx::query_scalar("INSERT INTO storefront.user (email) VALUES ($1) RETURNING id")
                .bind(&email)
                .fetch_one(&self.pool)
                .await
                .unwrap();
        CurrentUser {
            id: UserId::new(id),
            email,
        }
    }

    async fn stock(&self, product: &Product) -> i32 {
        sqlx::query_scalar("SELECT stock FROM storefront.product WHERE id = $1")
            .bind(product.id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

fn qty(n: i32) -> Quantity {
    Quantity::new(n).unwrap()
}

fn guest() -> CartOwner {
    CartOwner::Guest(GuestKey::generate())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires Docker"]
async fn test_pg_merge_rejection_keeps_line_and_stock() {
    let engine = PgEngine::new().await;
    let product = engine.product(5).await;
    let owner = guest();

    engine.reservations.add_item(owner, product.id, qty(3)).await.unwrap();
    let err = engine
        .reservations
        .add_item(owner, product.id, qty(3))
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::OutOfStock { .. }));

    assert_eq!(engine.stock(&product).await, 2);
    let summary = engine.reservations.list_cart(owner).await.unwrap();
    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.items[0].quantity, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires Docker"]
async fn test_pg_concurrent_adds_never_oversell() {
    let engine = PgEngine::new().await;
    let product = engine.product(5).await;
    let product_id = product.id;

    let mut handles = Vec::new();
    for _ in 0..12 {
        let reservations = engine.reservations.clone();
        handles.push(tokio::spawn(async move {
            reservations.add_item(guest(), product_id, qty(1)).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(CommerceError::OutOfStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 5);
    assert_eq!(engine.stock(&product).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires Docker"]
async fn test_pg_same_owner_concurrent_adds_merge_into_one_line() {
    let engine = PgEngine::new().await;
    let product = engine.product(20).await;
    let owner = guest();
    let product_id = product.id;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let reservations = engine.reservations.clone();
        handles.push(tokio::spawn(async move {
            reservations.add_item(owner, product_id, qty(2)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let summary = engine.reservations.list_cart(owner).await.unwrap();
    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.items[0].quantity, 8);
    assert_eq!(engine.stock(&product).await, 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires Docker"]
async fn test_pg_checkout_and_cancel_restore_stock() {
    let engine = PgEngine::new().await;
    let product = engine.product(6).await;
    let user = engine.user().await;

    engine
        .reservations
        .add_item(CartOwner::User(user.id), product.id, qty(2))
        .await
        .unwrap();
    let order = engine.orders.place_order(user.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(engine.stock(&product).await, 4);

    let cancelled = engine.orders.cancel_order(&user, order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(engine.stock(&product).await, 6);

    let detail = engine.orders.order_detail(user.id, order.id).await.unwrap();
    assert_eq!(detail.tracking.len(), 2);
    assert_eq!(detail.tracking.iter().filter(|e| e.is_current).count(), 1);
    assert_eq!(detail.tracking[1].status, OrderStatus::Cancelled);
    assert!(detail.tracking[1].is_current);

    let err = engine
        .orders
        .cancel_order(&user, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::InvalidTransition(_)));
    assert_eq!(engine.stock(&product).await, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires Docker"]
async fn test_pg_shipped_order_cannot_be_cancelled() {
    let engine = PgEngine::new().await;
    let product = engine.product(3).await;
    let user = engine.user().await;

    engine
        .reservations
        .add_item(CartOwner::User(user.id), product.id, qty(1))
        .await
        .unwrap();
    let order = engine.orders.place_order(user.id).await.unwrap();
    engine
        .orders
        .advance_order(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    engine
        .orders
        .advance_order(order.id, OrderStatus::Shipped)
        .await
        .unwrap();

    let err = engine
        .orders
        .cancel_order(&user, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::InvalidTransition(_)));

    let detail = engine.orders.order_detail(user.id, order.id).await.unwrap();
    assert_eq!(detail.order.status, OrderStatus::Shipped);
    assert_eq!(detail.tracking.len(), 3);
    assert_eq!(engine.stock(&product).await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires Docker"]
async fn test_pg_rollback_on_drop_and_missing_rows() {
    let engine = PgEngine::new().await;
    let product = engine.product(4).await;

    {
        let mut tx = engine.store.begin().await.unwrap();
        tx.debit(product.id, 3).await.unwrap();
    }
    assert_eq!(engine.stock(&product).await, 4);

    let mut tx = engine.store.begin().await.unwrap();
    let missing = stockroom_core::ProductId::new(i64::MAX);
    assert!(matches!(
        tx.credit(missing, 1).await,
        Err(RepositoryError::NotFound)
    ));
    drop(tx);

    engine.store.ping().await.unwrap();
}
