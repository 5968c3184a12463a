//! Buyer profile.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireBuyer;
use crate::models::{Buyer, BuyerProfileUpdate};
use crate::services::profile::ProfileService;
use crate::state::AppState;

/// GET /profile
///
/// # Errors
///
/// Returns 404 if the profile row is gone.
pub async fn show(State(state): State<AppState>, buyer: RequireBuyer) -> Result<Json<Buyer>> {
    Ok(Json(
        ProfileService::new(state.store())
            .buyer(buyer.buyer_id)
            .await?,
    ))
}

/// PUT /profile
///
/// # Errors
///
/// Returns 422 for a blank name.
#[instrument(skip(state, buyer, update), fields(buyer_id = %buyer.buyer_id))]
pub async fn update(
    State(state): State<AppState>,
    buyer: RequireBuyer,
    Json(update): Json<BuyerProfileUpdate>,
) -> Result<Json<Buyer>> {
    Ok(Json(
        ProfileService::new(state.store())
            .update_buyer(buyer.buyer_id, &update)
            .await?,
    ))
}
