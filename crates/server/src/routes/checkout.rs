//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireBuyer;
use crate::services::checkout::{CheckoutForm, CheckoutService};
use crate::state::AppState;

/// Place an order for the selected cart lines.
///
/// POST /checkout
///
/// # Errors
///
/// Returns 422 for incomplete delivery details or an empty selection, 404
/// for ids outside the cart, and 409 listing every stock violation.
#[instrument(skip(state, buyer, form), fields(buyer_id = %buyer.buyer_id))]
pub async fn checkout(
    State(state): State<AppState>,
    buyer: RequireBuyer,
    Json(form): Json<CheckoutForm>,
) -> Result<impl IntoResponse> {
    add_breadcrumb(
        "checkout",
        "Checkout submitted",
        &[("items", form.cart_item_ids.len().to_string())],
    );

    let placed = CheckoutService::new(state.store())
        .checkout(buyer.buyer_id, &form)
        .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}
