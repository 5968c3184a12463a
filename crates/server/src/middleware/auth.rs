//! Authentication extractors.
//!
//! The signed-in account lives in the session; handlers receive it through
//! one of these extractors and pass the typed id to services.
//!
//! A missing session is rejected with 401, a signed-in account on the wrong
//! side of the marketplace with 403.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use printhub_core::{BuyerId, SellerId};

use crate::error::AppError;
use crate::models::{CurrentAccount, session_keys};

/// Extractor that requires a signed-in buyer.
///
/// # Example
///
/// ```rust,ignore
/// async fn cart(RequireBuyer { buyer_id, .. }: RequireBuyer) -> impl IntoResponse {
///     format!("cart of buyer {buyer_id}")
/// }
/// ```
pub struct RequireBuyer {
    pub buyer_id: BuyerId,
    pub account: CurrentAccount,
}

/// Extractor that requires a signed-in press.
pub struct RequireSeller {
    pub seller_id: SellerId,
    pub account: CurrentAccount,
}

/// Extractor that optionally gets the current account.
///
/// Unlike `RequireBuyer` and `RequireSeller`, this never rejects.
pub struct OptionalAccount(pub Option<CurrentAccount>);

async fn current_account(parts: &Parts) -> Result<Option<CurrentAccount>, AppError> {
    // Set by SessionManagerLayer
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    Ok(session
        .get::<CurrentAccount>(session_keys::CURRENT_ACCOUNT)
        .await?)
}

async fn require_account(parts: &Parts) -> Result<CurrentAccount, AppError> {
    current_account(parts)
        .await?
        .ok_or_else(|| AppError::Unauthorized("sign in to continue".to_string()))
}

impl<S> FromRequestParts<S> for RequireBuyer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = require_account(parts).await?;
        let buyer_id = account
            .buyer_id()
            .ok_or_else(|| AppError::Forbidden("this action is for buyers".to_string()))?;
        Ok(Self { buyer_id, account })
    }
}

impl<S> FromRequestParts<S> for RequireSeller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = require_account(parts).await?;
        let seller_id = account
            .seller_id()
            .ok_or_else(|| AppError::Forbidden("this action is for presses".to_string()))?;
        Ok(Self { seller_id, account })
    }
}

impl<S> FromRequestParts<S> for OptionalAccount
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_account(parts).await.ok().flatten()))
    }
}

/// Helper to set the current account in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_account(
    session: &Session,
    account: &CurrentAccount,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ACCOUNT, account).await
}

/// Helper to clear the current account from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_account(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
