//! Cart route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use printhub_core::CartItemId;

use crate::error::{AppError, Result};
use crate::middleware::RequireBuyer;
use crate::services::cart::{AddToCart, CartService, CartView};
use crate::state::AppState;

/// Query parameters for the cart view.
#[derive(Debug, Deserialize)]
pub struct CartQuery {
    /// Comma-separated cart item ids to total, e.g. `1,2`.
    pub selected: Option<String>,
}

/// New quantity for a cart line.
#[derive(Debug, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: u32,
}

/// Parse `1,2,3` into cart item ids; blanks are skipped.
///
/// # Errors
///
/// Returns `AppError::BadRequest` naming the first malformed id.
pub fn parse_selection(raw: Option<&str>) -> Result<Vec<CartItemId>> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| AppError::BadRequest(format!("invalid cart item id '{s}'")))
        })
        .collect()
}

/// GET /cart?selected=1,2
///
/// # Errors
///
/// Returns 400 for a malformed selection.
#[instrument(skip(state, buyer), fields(buyer_id = %buyer.buyer_id))]
pub async fn show(
    State(state): State<AppState>,
    buyer: RequireBuyer,
    Query(query): Query<CartQuery>,
) -> Result<Json<CartView>> {
    let selected = parse_selection(query.selected.as_deref())?;
    Ok(Json(
        CartService::new(state.store())
            .view(buyer.buyer_id, &selected)
            .await?,
    ))
}

/// POST /cart/items
///
/// # Errors
///
/// Returns 404 for unknown products and 422 for an invalid line.
#[instrument(skip(state, buyer, form), fields(buyer_id = %buyer.buyer_id, product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    buyer: RequireBuyer,
    Json(form): Json<AddToCart>,
) -> Result<impl IntoResponse> {
    let item = CartService::new(state.store())
        .add(buyer.buyer_id, &form)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PATCH /cart/items/{id}
///
/// # Errors
///
/// Returns 404 if the line is not in the cart.
#[instrument(skip(state, buyer), fields(buyer_id = %buyer.buyer_id))]
pub async fn update(
    State(state): State<AppState>,
    buyer: RequireBuyer,
    Path(id): Path<CartItemId>,
    Json(update): Json<QuantityUpdate>,
) -> Result<impl IntoResponse> {
    let item = CartService::new(state.store())
        .update_quantity(buyer.buyer_id, id, update.quantity)
        .await?;
    Ok(Json(item))
}

/// DELETE /cart/items/{id}
///
/// # Errors
///
/// Returns 404 if the line is not in the cart.
#[instrument(skip(state, buyer), fields(buyer_id = %buyer.buyer_id))]
pub async fn remove(
    State(state): State<AppState>,
    buyer: RequireBuyer,
    Path(id): Path<CartItemId>,
) -> Result<StatusCode> {
    CartService::new(state.store())
        .remove(buyer.buyer_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
