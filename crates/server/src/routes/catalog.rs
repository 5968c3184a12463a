//! Public catalog: products, categories, presses and reviews.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use printhub_core::{ProductId, SellerId};

use crate::error::Result;
use crate::middleware::RequireBuyer;
use crate::models::{CategoryCount, NewReview, Product, SellerSummary};
use crate::services::catalog::{
    CatalogService, PressDetail, PressProductQuery, PressQuery, ProductDetail, ProductQuery,
};
use crate::services::reviews::ReviewService;
use crate::state::AppState;

/// Product listing.
///
/// GET /products?category=&seller=&q=&limit=&offset=
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(CatalogService::new(state.store()).products(query).await?))
}

/// GET /products/{id}
///
/// # Errors
///
/// Returns 404 for unknown products.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    Ok(Json(
        CatalogService::new(state.store()).product_detail(id).await?,
    ))
}

/// Post a review.
///
/// POST /products/{id}/reviews
///
/// # Errors
///
/// Returns 403 before delivery and 409 for a second review.
#[instrument(skip(state, buyer, review), fields(buyer_id = %buyer.buyer_id))]
pub async fn post_review(
    State(state): State<AppState>,
    buyer: RequireBuyer,
    Path(id): Path<ProductId>,
    Json(review): Json<NewReview>,
) -> Result<impl IntoResponse> {
    let review = ReviewService::new(state.store())
        .post(buyer.buyer_id, id, &review)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /categories
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryCount>>> {
    Ok(Json(CatalogService::new(state.store()).categories().await?))
}

/// Press directory.
///
/// GET /presses?city=&q=
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn presses(
    State(state): State<AppState>,
    Query(query): Query<PressQuery>,
) -> Result<Json<Vec<SellerSummary>>> {
    Ok(Json(
        CatalogService::new(state.store())
            .presses(query)
            .await?,
    ))
}

/// GET /presses/{id}?q=
///
/// # Errors
///
/// Returns 404 for unknown presses.
pub async fn press(
    State(state): State<AppState>,
    Path(id): Path<SellerId>,
    Query(query): Query<PressProductQuery>,
) -> Result<Json<PressDetail>> {
    Ok(Json(
        CatalogService::new(state.store())
            .press_detail(id, query)
            .await?,
    ))
}
