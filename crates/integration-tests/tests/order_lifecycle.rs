//! Checkout, fulfilment moves, and cancellation.

#![allow(clippy::unwrap_used)]

use stockroom_core::{CartOwner, Money, OrderId, OrderStatus, ProductStatus, Quantity, UserId};
use stockroom_integration_tests::{RecordingNotifier, TestEngine, customer};
use stockroom_storefront::db::{FailurePoint, RepositoryError};
use stockroom_storefront::models::{NewOrderItem, Order, Product};
use stockroom_storefront::services::CommerceError;

fn qty(n: i32) -> Quantity {
    Quantity::new(n).unwrap()
}

fn item(product: &Product, quantity: i32) -> NewOrderItem {
    NewOrderItem {
        product_id: product.id,
        variant_id: None,
        quantity,
        unit_price: product.price,
    }
}

async fn seeded_order(
    engine: &TestEngine,
    user_id: UserId,
    status: OrderStatus,
    items: &[NewOrderItem],
) -> Order {
    engine.store.insert_order(user_id, status, items).await
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_converts_cart_without_moving_stock() {
    let engine = TestEngine::new();
    let desk = engine.product("Walnut desk", 24_000, 10).await;
    let lamp = engine.product("Table lamp", 4_200, 10).await;
    let user = customer(1);
    let owner = CartOwner::User(user.id);

    engine.reservations.add_item(owner, desk.id, qty(2)).await.unwrap();
    engine.reservations.add_item(owner, lamp.id, qty(1)).await.unwrap();

    let order = engine.orders.place_order(user.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.user_id, user.id);
    assert_eq!(order.subtotal, Money::from_units(52_200));
    assert_eq!(order.shipping_fee, Money::ZERO);
    assert_eq!(order.total, Money::from_units(52_200));

    assert_eq!(engine.stock(&desk).await, 8);
    assert_eq!(engine.stock(&lamp).await, 9);
    assert!(engine.store.cart_lines(owner).await.iter().all(|line| line.removed));

    let detail = engine.orders.order_detail(user.id, order.id).await.unwrap();
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.tracking.len(), 1);
    assert_eq!(detail.tracking[0].status, OrderStatus::Pending);
    assert!(detail.tracking[0].is_current);
}

#[tokio::test]
async fn test_checkout_of_empty_cart_fails() {
    let engine = TestEngine::new();
    let err = engine.orders.place_order(UserId::new(1)).await.unwrap_err();
    assert!(matches!(err, CommerceError::EmptyCart));
    assert!(engine.orders.list_orders(UserId::new(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_leaves_unavailable_lines_in_cart() {
    let engine = TestEngine::new();
    let desk = engine.product("Walnut desk", 24_000, 10).await;
    let lamp = engine.product("Table lamp", 4_200, 10).await;
    let owner = CartOwner::User(UserId::new(3));

    engine.reservations.add_item(owner, desk.id, qty(1)).await.unwrap();
    engine.reservations.add_item(owner, lamp.id, qty(1)).await.unwrap();
    engine
        .store
        .set_product_status(lamp.id, ProductStatus::Inactive)
        .await;

    let order = engine.orders.place_order(UserId::new(3)).await.unwrap();
    assert_eq!(order.subtotal, Money::from_units(24_000));

    let live: Vec<_> = engine
        .store
        .cart_lines(owner)
        .await
        .into_iter()
        .filter(|line| !line.removed)
        .collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].product_id, lamp.id);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_pending_order_restores_stock() {
    let engine = TestEngine::new();
    let product = engine.product("Ceramic lamp", 4_200, 5).await;
    let user = customer(1);
    let order = seeded_order(&engine, user.id, OrderStatus::Pending, &[item(&product, 2)]).await;

    let cancelled = engine.orders.cancel_order(&user, order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(engine.stock(&product).await, 7);

    let events = engine.store.tracking_events(order.id).await;
    let current: Vec<_> = events.iter().filter(|event| event.is_current).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].status, OrderStatus::Cancelled);
    assert!(
        events
            .iter()
            .filter(|event| event.status != OrderStatus::Cancelled)
            .all(|event| !event.is_current)
    );
}

#[tokio::test]
async fn test_cancel_after_checkout_round_trips_stock() {
    let engine = TestEngine::new();
    let desk = engine.product("Walnut desk", 24_000, 6).await;
    let user = customer(2);

    engine
        .reservations
        .add_item(CartOwner::User(user.id), desk.id, qty(4))
        .await
        .unwrap();
    let order = engine.orders.place_order(user.id).await.unwrap();
    assert_eq!(engine.stock(&desk).await, 2);

    engine.orders.cancel_order(&user, order.id).await.unwrap();
    assert_eq!(engine.stock(&desk).await, 6);
}

#[tokio::test]
async fn test_cancel_processing_order_is_allowed() {
    let engine = TestEngine::new();
    let product = engine.product("Oak bookshelf", 18_500, 1).await;
    let user = customer(1);
    let order =
        seeded_order(&engine, user.id, OrderStatus::Processing, &[item(&product, 3)]).await;

    engine.orders.cancel_order(&user, order.id).await.unwrap();
    assert_eq!(engine.stock(&product).await, 4);
}

#[tokio::test]
async fn test_cancel_shipped_order_changes_nothing() {
    let engine = TestEngine::new();
    let product = engine.product("Brass clock", 7_900, 3).await;
    let user = customer(1);
    let order = seeded_order(&engine, user.id, OrderStatus::Shipped, &[item(&product, 2)]).await;

    let err = engine.orders.cancel_order(&user, order.id).await.unwrap_err();
    assert!(matches!(
        err,
        CommerceError::InvalidTransition(e)
            if e.from == OrderStatus::Shipped && e.to == OrderStatus::Cancelled
    ));

    assert_eq!(engine.stock(&product).await, 3);
    assert_eq!(
        engine.store.order(order.id).await.unwrap().status,
        OrderStatus::Shipped
    );
    assert_eq!(engine.store.tracking_events(order.id).await.len(), 1);
}

#[tokio::test]
async fn test_second_cancellation_is_rejected() {
    let engine = TestEngine::new();
    let product = engine.product("Wool throw", 3_600, 0).await;
    let user = customer(1);
    let order = seeded_order(&engine, user.id, OrderStatus::Pending, &[item(&product, 2)]).await;

    engine.orders.cancel_order(&user, order.id).await.unwrap();
    let err = engine.orders.cancel_order(&user, order.id).await.unwrap_err();
    assert!(matches!(err, CommerceError::InvalidTransition(_)));

    assert_eq!(engine.stock(&product).await, 2);
    assert_eq!(engine.store.tracking_events(order.id).await.len(), 2);
}

#[tokio::test]
async fn test_cancel_someone_elses_order_is_not_found() {
    let engine = TestEngine::new();
    let product = engine.product("Wool throw", 3_600, 0).await;
    let owner = customer(1);
    let stranger = customer(2);
    let order = seeded_order(&engine, owner.id, OrderStatus::Pending, &[item(&product, 1)]).await;

    let err = engine
        .orders
        .cancel_order(&stranger, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::OrderNotFound(id) if id == order.id));

    let err = engine
        .orders
        .cancel_order(&stranger, OrderId::new(9_999))
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::OrderNotFound(_)));
    assert_eq!(engine.stock(&product).await, 0);
}

#[tokio::test]
async fn test_failure_mid_cancellation_rolls_back() {
    let engine = TestEngine::new();
    let desk = engine.product("Walnut desk", 24_000, 1).await;
    let lamp = engine.product("Table lamp", 4_200, 1).await;
    let user = customer(1);
    let order = seeded_order(
        &engine,
        user.id,
        OrderStatus::Pending,
        &[item(&desk, 1), item(&lamp, 2)],
    )
    .await;

    for point in [
        FailurePoint::TrackingAppend,
        FailurePoint::Credit,
        FailurePoint::Commit,
    ] {
        engine.store.inject_failure(point).await;
        let err = engine.orders.cancel_order(&user, order.id).await.unwrap_err();
        assert!(
            matches!(err, CommerceError::Storage(RepositoryError::Injected(p)) if p == point),
            "unexpected error for {point:?}: {err}"
        );

        assert_eq!(
            engine.store.order(order.id).await.unwrap().status,
            OrderStatus::Pending
        );
        assert_eq!(engine.stock(&desk).await, 1);
        assert_eq!(engine.stock(&lamp).await, 1);
        let events = engine.store.tracking_events(order.id).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_current);
    }
    assert!(engine.notifier.sent().is_empty());

    // The failure fires once; a retry goes through.
    engine.orders.cancel_order(&user, order.id).await.unwrap();
    assert_eq!(engine.stock(&desk).await, 2);
    assert_eq!(engine.stock(&lamp).await, 3);
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_cancellation_sends_notice() {
    let engine = TestEngine::new();
    let product = engine.product("Linen armchair", 32_000, 0).await;
    let user = customer(4);
    let order = seeded_order(&engine, user.id, OrderStatus::Pending, &[item(&product, 1)]).await;

    engine.orders.cancel_order(&user, order.id).await.unwrap();

    let sent = engine.notifier.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].order_id, order.id);
    assert_eq!(sent[0].email, "customer4@example.com");
    assert_eq!(sent[0].total, order.total);
    assert_eq!(sent[0].items.len(), 1);
}

#[tokio::test]
async fn test_failing_notifier_does_not_undo_cancellation() {
    let engine = TestEngine::with_notifier(RecordingNotifier::failing());
    let product = engine.product("Linen armchair", 32_000, 0).await;
    let user = customer(1);
    let order = seeded_order(&engine, user.id, OrderStatus::Pending, &[item(&product, 1)]).await;

    let cancelled = engine.orders.cancel_order(&user, order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    engine.notifier.wait_for(1).await;
    assert_eq!(
        engine.store.order(order.id).await.unwrap().status,
        OrderStatus::Cancelled
    );
    assert_eq!(engine.stock(&product).await, 1);
}

// =============================================================================
// Fulfilment
// =============================================================================

#[tokio::test]
async fn test_advance_through_fulfilment() {
    let engine = TestEngine::new();
    let product = engine.product("Oak bookshelf", 18_500, 5).await;
    let user = customer(1);
    let order = seeded_order(&engine, user.id, OrderStatus::Pending, &[item(&product, 1)]).await;

    for next in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        let advanced = engine.orders.advance_order(order.id, next).await.unwrap();
        assert_eq!(advanced.status, next);
        assert!(advanced.cancelled_at.is_none());
    }

    let detail = engine.orders.order_detail(user.id, order.id).await.unwrap();
    let statuses: Vec<_> = detail.tracking.iter().map(|event| event.status).collect();
    assert_eq!(
        statuses,
        [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ]
    );
    assert_eq!(detail.tracking.iter().filter(|e| e.is_current).count(), 1);
    assert!(detail.tracking[3].is_current);
    assert_eq!(engine.stock(&product).await, 5);

    let err = engine
        .orders
        .cancel_order(&user, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_advance_rejects_skips_and_cancellation() {
    let engine = TestEngine::new();
    let user = customer(1);
    let order = seeded_order(&engine, user.id, OrderStatus::Pending, &[]).await;

    let err = engine
        .orders
        .advance_order(order.id, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::InvalidTransition(_)));

    let err = engine
        .orders
        .advance_order(order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::Validation(_)));

    let err = engine
        .orders
        .advance_order(OrderId::new(9_999), OrderStatus::Processing)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::OrderNotFound(_)));

    assert_eq!(engine.store.tracking_events(order.id).await.len(), 1);
}

// =============================================================================
// Reading
// =============================================================================

#[tokio::test]
async fn test_orders_are_listed_newest_first_and_scoped_to_user() {
    let engine = TestEngine::new();
    let user = customer(1);
    let first = seeded_order(&engine, user.id, OrderStatus::Delivered, &[]).await;
    let second = seeded_order(&engine, user.id, OrderStatus::Pending, &[]).await;
    let other = seeded_order(&engine, UserId::new(2), OrderStatus::Pending, &[]).await;

    let ids: Vec<_> = engine
        .orders
        .list_orders(user.id)
        .await
        .unwrap()
        .iter()
        .map(|order| order.id)
        .collect();
    assert_eq!(ids, [second.id, first.id]);

    let err = engine
        .orders
        .order_detail(user.id, other.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::OrderNotFound(_)));
}
