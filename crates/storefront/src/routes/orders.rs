//! Checkout and account order handlers.
//!
//! Checkout and cancellation are browser form actions: they always answer
//! with a 302 redirect and report failures through an `error` query code.
//! The read endpoints return JSON.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;

use stockroom_core::OrderId;

use super::redirect_found;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderDetail};
use crate::services::CommerceError;
use crate::state::AppState;

/// Cancel link query parameters.
#[derive(Debug, Deserialize)]
pub struct CancelParams {
    pub id: Option<String>,
}

/// Place an order from the user's cart.
///
/// POST /checkout
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn checkout(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Response {
    match state.orders().place_order(user.id).await {
        Ok(order) => redirect_found(&format!("/account/orders/{}?placed=1", order.id)),
        Err(CommerceError::EmptyCart) => redirect_found("/cart?error=empty_cart"),
        Err(err) => {
            tracing::error!(error = %err, "checkout failed");
            redirect_found("/cart?error=checkout_failed")
        }
    }
}

/// The user's orders, newest first.
///
/// GET /account/orders
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_orders(user.id).await?))
}

/// One order with items and tracking history.
///
/// GET /account/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>> {
    let order_id =
        OrderId::parse_positive(&id).ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    match state.orders().order_detail(user.id, order_id).await {
        Ok(detail) => Ok(Json(detail)),
        Err(CommerceError::OrderNotFound(_)) => Err(AppError::NotFound(format!("order {order_id}"))),
        Err(err) => Err(err.into()),
    }
}

/// Cancel an order and return its stock.
///
/// GET /account/orders/cancel?id={id}
#[instrument(skip(state, user, params), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<CancelParams>,
) -> Response {
    let Some(order_id) = params.id.as_deref().and_then(OrderId::parse_positive) else {
        return redirect_found("/account/orders?error=invalid_order");
    };

    match state.orders().cancel_order(&user, order_id).await {
        Ok(_) => redirect_found(&format!("/account/orders/{order_id}?cancelled=1")),
        Err(CommerceError::OrderNotFound(_)) => redirect_found("/account/orders?error=not_found"),
        Err(CommerceError::InvalidTransition(err)) => {
            tracing::info!(%order_id, error = %err, "cancellation refused");
            redirect_found(&format!("/account/orders/{order_id}?error=not_cancellable"))
        }
        Err(err) => {
            let event_id = sentry::capture_error(&err);
            tracing::error!(
                %order_id,
                error = %err,
                sentry_event_id = %event_id,
                "cancellation failed"
            );
            redirect_found(&format!("/account/orders/{order_id}?error=cancel_failed"))
        }
    }
}
