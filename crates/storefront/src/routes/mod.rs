//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (pings the store)
//!
//! # Cart (JSON)
//! GET  /cart                   - Priced cart with totals
//! GET  /cart/count             - Cart badge counts
//! POST /cart/add               - Reserve units (405 JSON for other methods)
//! POST /cart/update            - Change a line's quantity
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Remove every line
//!
//! # Orders (requires auth)
//! POST /checkout               - Place order, 302 to the order
//! GET  /account/orders         - Order list (JSON)
//! GET  /account/orders/{id}    - Order detail with tracking (JSON)
//! GET  /account/orders/cancel  - Cancel via ?id=, 302 back with a status code
//! ```

pub mod cart;
pub mod health;
pub mod orders;

use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::middleware::rate_limit::{RateLimiterLayer, cart_rate_limiter};
use crate::state::AppState;

/// A 302 Found redirect.
pub(crate) fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Endpoints that reserve or release stock.
fn mutation_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/add", post(cart::add).fallback(cart::method_not_allowed))
        .route("/cart/update", post(cart::update))
        .route("/cart/remove", post(cart::remove))
        .route("/cart/clear", post(cart::clear))
        .route("/checkout", post(orders::checkout))
}

fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/cart", get(cart::show))
        .route("/cart/count", get(cart::count))
        .route("/account/orders", get(orders::index))
        .route("/account/orders/cancel", get(orders::cancel))
        .route("/account/orders/{id}", get(orders::show))
}

fn build(limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let mutations = match limiter {
        Some(limiter) => mutation_routes().route_layer(limiter),
        None => mutation_routes(),
    };
    Router::new().merge(mutations).merge(read_routes())
}

/// All storefront routes, without rate limiting.
pub fn routes() -> Router<AppState> {
    build(None)
}

/// All storefront routes, with stock-mutating endpoints rate limited per IP.
pub fn rate_limited_routes() -> Router<AppState> {
    build(Some(cart_rate_limiter()))
}
