//! Authentication route handlers.
//!
//! Sign-up for buyers, registration for presses, and password login for
//! both. A successful sign-up also signs the new account in.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use printhub_core::AccountRole;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAccount, clear_current_account, set_current_account};
use crate::models::CurrentAccount;
use crate::services::auth::{AuthService, BuyerSignup, SellerRegistration};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

async fn sign_in(session: &Session, account: &CurrentAccount) -> Result<()> {
    set_current_account(session, account).await?;
    set_sentry_user(&account.id, Some(account.email.as_str()));
    Ok(())
}

/// Buyer sign-up.
///
/// POST /auth/signup
///
/// # Errors
///
/// Returns 422 for invalid input and 409 if the email is taken.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<BuyerSignup>,
) -> Result<impl IntoResponse> {
    let buyer = AuthService::new(state.store())
        .register_buyer(&form)
        .await?;

    sign_in(
        &session,
        &CurrentAccount {
            id: buyer.id.into(),
            email: buyer.email.clone(),
            role: AccountRole::Buyer,
        },
    )
    .await?;

    tracing::info!(buyer_id = %buyer.id, "Buyer signed up");
    Ok((StatusCode::CREATED, Json(buyer)))
}

/// Press registration.
///
/// POST /auth/press/register
///
/// # Errors
///
/// Returns 422 for invalid input and 409 if the email is taken.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register_press(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SellerRegistration>,
) -> Result<impl IntoResponse> {
    let seller = AuthService::new(state.store())
        .register_seller(&form)
        .await?;

    sign_in(
        &session,
        &CurrentAccount {
            id: seller.id.into(),
            email: seller.email.clone(),
            role: AccountRole::Seller,
        },
    )
    .await?;

    tracing::info!(seller_id = %seller.id, "Press registered");
    Ok((StatusCode::CREATED, Json(seller)))
}

/// Password login for buyers and presses.
///
/// POST /auth/login
///
/// # Errors
///
/// Returns 401 for a wrong email or password.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<CurrentAccount>> {
    let account = AuthService::new(state.store())
        .login(&form.email, &form.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;

    sign_in(&session, &account).await?;
    tracing::info!(account_id = %account.id, role = %account.role, "Signed in");
    Ok(Json(account))
}

/// POST /auth/logout
///
/// # Errors
///
/// Returns 500 if the session store fails.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_account(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in account.
///
/// GET /auth/me
///
/// # Errors
///
/// Returns 401 when no one is signed in.
pub async fn me(OptionalAccount(account): OptionalAccount) -> Result<Json<CurrentAccount>> {
    account
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("not signed in".to_string()))
}
