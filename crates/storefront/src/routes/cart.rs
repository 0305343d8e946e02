//! Cart route handlers.
//!
//! Every cart endpoint answers with JSON. The owner comes from
//! [`CartIdentity`]: the logged-in user, or the session's guest key.
//! Form fields are read as strings and validated here so that bad input
//! gets the same JSON error envelope as business failures.

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockroom_core::{CartLineId, ProductId, Quantity};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::CartIdentity;
use crate::models::{CartStats, CartSummary};
use crate::services::ReservedProduct;
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: Option<String>,
    pub quantity: Option<String>,
}

/// Update cart line form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: Option<String>,
    pub quantity: Option<String>,
}

/// Remove cart line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: Option<String>,
}

/// Successful add-to-cart response.
#[derive(Debug, Serialize)]
pub struct AddToCartResponse {
    pub success: bool,
    pub message: String,
    pub cart: CartStats,
    pub product: ReservedProduct,
}

fn form_body<T>(form: std::result::Result<Form<T>, FormRejection>) -> Result<T> {
    form.map(|Form(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn parse_product_id(raw: Option<&str>) -> Result<ProductId> {
    raw.and_then(ProductId::parse_positive)
        .ok_or_else(|| AppError::BadRequest("invalid product".to_string()))
}

fn parse_line_id(raw: Option<&str>) -> Result<CartLineId> {
    raw.and_then(CartLineId::parse_positive)
        .ok_or_else(|| AppError::BadRequest("invalid cart item".to_string()))
}

/// Reserve units of a product.
///
/// POST /cart/add
#[instrument(skip(state, form), fields(owner = %owner))]
pub async fn add(
    State(state): State<AppState>,
    CartIdentity(owner): CartIdentity,
    form: std::result::Result<Form<AddToCartForm>, FormRejection>,
) -> Result<Json<AddToCartResponse>> {
    let form = form_body(form)?;
    let product_id = parse_product_id(form.product_id.as_deref())?;
    let quantity = Quantity::parse_or_one(form.quantity.as_deref())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state
        .reservations()
        .add_item(owner, product_id, quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", product_id.to_string()),
            ("quantity", quantity.get().to_string()),
        ],
    );

    Ok(Json(AddToCartResponse {
        success: true,
        message: format!("Added {} to your cart", outcome.product.name),
        cart: outcome.cart,
        product: outcome.product,
    }))
}

/// Any non-POST request to a POST-only cart endpoint.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(serde_json::json!({
            "success": false,
            "message": "Method not allowed",
        })),
    )
}

/// Priced cart contents.
///
/// GET /cart
#[instrument(skip(state), fields(owner = %owner))]
pub async fn show(
    State(state): State<AppState>,
    CartIdentity(owner): CartIdentity,
) -> Result<Json<CartSummary>> {
    Ok(Json(state.reservations().list_cart(owner).await?))
}

/// Cart badge counts.
///
/// GET /cart/count
pub async fn count(
    State(state): State<AppState>,
    CartIdentity(owner): CartIdentity,
) -> Result<Json<CartStats>> {
    Ok(Json(state.reservations().cart_stats(owner).await?))
}

/// Change a line's quantity; zero removes it.
///
/// POST /cart/update
#[instrument(skip(state, form), fields(owner = %owner))]
pub async fn update(
    State(state): State<AppState>,
    CartIdentity(owner): CartIdentity,
    form: std::result::Result<Form<UpdateCartForm>, FormRejection>,
) -> Result<Json<CartSummary>> {
    let form = form_body(form)?;
    let line_id = parse_line_id(form.line_id.as_deref())?;
    let quantity = form
        .quantity
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .ok_or_else(|| AppError::BadRequest("quantity must be a whole number".to_string()))?;

    let summary = state
        .reservations()
        .update_quantity(owner, line_id, quantity)
        .await?;
    Ok(Json(summary))
}

/// Remove a line.
///
/// POST /cart/remove
#[instrument(skip(state, form), fields(owner = %owner))]
pub async fn remove(
    State(state): State<AppState>,
    CartIdentity(owner): CartIdentity,
    form: std::result::Result<Form<RemoveFromCartForm>, FormRejection>,
) -> Result<Json<CartSummary>> {
    let form = form_body(form)?;
    let line_id = parse_line_id(form.line_id.as_deref())?;
    Ok(Json(state.reservations().remove_item(owner, line_id).await?))
}

/// Empty the cart.
///
/// POST /cart/clear
#[instrument(skip(state), fields(owner = %owner))]
pub async fn clear(
    State(state): State<AppState>,
    CartIdentity(owner): CartIdentity,
) -> Result<Json<CartSummary>> {
    Ok(Json(state.reservations().clear_cart(owner).await?))
}
