//! Buyer order history and cancellation.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use printhub_core::{OrderId, OrderItemId, OrderStatus};

use crate::error::Result;
use crate::middleware::RequireBuyer;
use crate::models::{Order, StatusChange};
use crate::services::orders::OrderService;
use crate::state::AppState;

/// An order with its aggregate status.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub status: OrderStatus,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            status: order.status(),
            order,
        }
    }
}

/// GET /orders
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state, buyer), fields(buyer_id = %buyer.buyer_id))]
pub async fn index(
    State(state): State<AppState>,
    buyer: RequireBuyer,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = OrderService::new(state.store())
        .buyer_orders(buyer.buyer_id)
        .await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}
///
/// # Errors
///
/// Returns 404 if the order is not the buyer's.
#[instrument(skip(state, buyer), fields(buyer_id = %buyer.buyer_id))]
pub async fn show(
    State(state): State<AppState>,
    buyer: RequireBuyer,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>> {
    let order = OrderService::new(state.store())
        .buyer_order(buyer.buyer_id, id)
        .await?;
    Ok(Json(order.into()))
}

/// Cancel one pending item.
///
/// POST /orders/{id}/items/{item}/cancel
///
/// # Errors
///
/// Returns 404 for unknown items, 403 once the item has left `pending`,
/// and 409 if it is already cancelled.
#[instrument(skip(state, buyer), fields(buyer_id = %buyer.buyer_id))]
pub async fn cancel_item(
    State(state): State<AppState>,
    buyer: RequireBuyer,
    Path((id, item)): Path<(OrderId, OrderItemId)>,
) -> Result<Json<StatusChange>> {
    Ok(Json(
        OrderService::new(state.store())
            .cancel_item(buyer.buyer_id, id, item)
            .await?,
    ))
}
