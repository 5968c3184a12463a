//! Press (seller) back office: dashboard, profile, inventory and orders.
//!
//! Every handler takes [`RequireSeller`], so buyers get 403 here.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use printhub_core::{OrderItemId, OrderStatus, ProductId};

use crate::error::Result;
use crate::middleware::RequireSeller;
use crate::models::{Product, ProductInput, Seller, SellerOrder, SellerProfileUpdate, StatusChange};
use crate::services::catalog::{CatalogService, Dashboard};
use crate::services::orders::OrderService;
use crate::services::profile::ProfileService;
use crate::state::AppState;

/// Requested status for an order item.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// GET /press/dashboard
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state, seller), fields(seller_id = %seller.seller_id))]
pub async fn dashboard(
    State(state): State<AppState>,
    seller: RequireSeller,
) -> Result<Json<Dashboard>> {
    Ok(Json(
        CatalogService::new(state.store())
            .dashboard(seller.seller_id)
            .await?,
    ))
}

/// GET /press/profile
///
/// # Errors
///
/// Returns 404 if the profile row is gone.
pub async fn profile(State(state): State<AppState>, seller: RequireSeller) -> Result<Json<Seller>> {
    Ok(Json(
        ProfileService::new(state.store())
            .seller(seller.seller_id)
            .await?,
    ))
}

/// PUT /press/profile
///
/// # Errors
///
/// Returns 422 for blank fields.
#[instrument(skip(state, seller, update), fields(seller_id = %seller.seller_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    seller: RequireSeller,
    Json(update): Json<SellerProfileUpdate>,
) -> Result<Json<Seller>> {
    Ok(Json(
        ProfileService::new(state.store())
            .update_seller(seller.seller_id, &update)
            .await?,
    ))
}

/// GET /press/inventory
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn inventory(
    State(state): State<AppState>,
    seller: RequireSeller,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(
        CatalogService::new(state.store())
            .inventory(seller.seller_id)
            .await?,
    ))
}

/// POST /press/inventory
///
/// # Errors
///
/// Returns 422 listing every invalid field.
#[instrument(skip(state, seller, input), fields(seller_id = %seller.seller_id))]
pub async fn create_product(
    State(state): State<AppState>,
    seller: RequireSeller,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse> {
    let product = CatalogService::new(state.store())
        .create_product(seller.seller_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /press/inventory/{id}
///
/// # Errors
///
/// Returns 404 for another press's product and 422 for invalid fields.
#[instrument(skip(state, seller, input), fields(seller_id = %seller.seller_id))]
pub async fn update_product(
    State(state): State<AppState>,
    seller: RequireSeller,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    Ok(Json(
        CatalogService::new(state.store())
            .update_product(seller.seller_id, id, &input)
            .await?,
    ))
}

/// DELETE /press/inventory/{id}
///
/// # Errors
///
/// Returns 404 for another press's product.
#[instrument(skip(state, seller), fields(seller_id = %seller.seller_id))]
pub async fn delete_product(
    State(state): State<AppState>,
    seller: RequireSeller,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    CatalogService::new(state.store())
        .delete_product(seller.seller_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Order fragments with buyer delivery details.
///
/// GET /press/orders
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state, seller), fields(seller_id = %seller.seller_id))]
pub async fn orders(
    State(state): State<AppState>,
    seller: RequireSeller,
) -> Result<Json<Vec<SellerOrder>>> {
    Ok(Json(
        OrderService::new(state.store())
            .seller_orders(seller.seller_id)
            .await?,
    ))
}

/// PUT /press/orders/items/{item}/status
///
/// # Errors
///
/// Returns 404 for another press's item and 409 for a backwards or
/// frozen transition.
#[instrument(skip(state, seller, update), fields(seller_id = %seller.seller_id, status = %update.status))]
pub async fn update_item_status(
    State(state): State<AppState>,
    seller: RequireSeller,
    Path(item): Path<OrderItemId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<StatusChange>> {
    Ok(Json(
        OrderService::new(state.store())
            .update_item_status(seller.seller_id, item, update.status)
            .await?,
    ))
}
