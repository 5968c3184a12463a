//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error is rendered as JSON:
//!
//! ```json
//! { "error": "some items cannot be ordered", "details": [ ... ] }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::{CheckoutError, ReviewError, StatusChangeError};
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderError;
use crate::services::profile::ProfileError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Review(#[from] ReviewError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No one is signed in.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signed in, but on the wrong side of the marketplace.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::AccountAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::PasswordMismatch
                | AuthError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound | CartError::ItemNotFound => StatusCode::NOT_FOUND,
                CartError::QuantityBelowMinimum { .. }
                | CartError::MissingInstructions
                | CartError::MissingDesign
                | CartError::TotalTooLarge(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(err) => match err {
                CatalogError::ProductNotFound | CatalogError::SellerNotFound => {
                    StatusCode::NOT_FOUND
                }
                CatalogError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidDelivery(_)
                | CheckoutError::EmptySelection
                | CheckoutError::TotalTooLarge(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::UnknownCartItems(_) => StatusCode::NOT_FOUND,
                CheckoutError::OutOfStock(_) => StatusCode::CONFLICT,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Order(err) => match err {
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::Status(status) => status_change_code(status),
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Profile(err) => match err {
                ProfileError::NotFound => StatusCode::NOT_FOUND,
                ProfileError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ProfileError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Review(err) => match err {
                ReviewError::ProductNotFound => StatusCode::NOT_FOUND,
                ReviewError::NotDelivered => StatusCode::FORBIDDEN,
                ReviewError::AlreadyReviewed => StatusCode::CONFLICT,
                ReviewError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Server errors never expose their cause.
    fn message(&self) -> String {
        if self.status().is_server_error() {
            return "Internal server error".to_string();
        }
        match self {
            Self::Auth(err) => err.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Structured details, such as every stock violation of a checkout.
    fn details(&self) -> Vec<Value> {
        match self {
            Self::Checkout(CheckoutError::InvalidDelivery(problems))
            | Self::Catalog(CatalogError::Invalid(problems)) => {
                problems.iter().map(|p| json!(p)).collect()
            }
            Self::Checkout(CheckoutError::UnknownCartItems(ids)) => {
                ids.iter().map(|id| json!({ "cart_item_id": id })).collect()
            }
            Self::Checkout(CheckoutError::OutOfStock(violations)) => violations
                .iter()
                .map(|v| {
                    json!({
                        "cart_item_id": v.cart_item_id,
                        "product_id": v.product_id,
                        "product_name": v.product_name,
                        "requested": v.requested,
                        "available": v.available,
                        "reason": v.reason,
                        "message": v.reason.message(),
                    })
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

const fn status_change_code(err: &StatusChangeError) -> StatusCode {
    match err {
        StatusChangeError::NotFound => StatusCode::NOT_FOUND,
        StatusChangeError::NotPermitted => StatusCode::FORBIDDEN,
        StatusChangeError::Transition(_) | StatusChangeError::Stale => StatusCode::CONFLICT,
        StatusChangeError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "error": self.message(),
            "details": self.details(),
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use printhub_core::{CartItemId, MoneyError, OrderStatus, ProductId, StatusTransitionError};

    use super::*;
    use crate::models::{StockViolation, StockViolationReason};

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Unauthorized("test".to_string()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("test".to_string()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(AuthError::AccountAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(ReviewError::AlreadyReviewed).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(OrderError::Status(StatusChangeError::Transition(
                StatusTransitionError::Terminal(OrderStatus::Delivered)
            )))
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(OrderError::Status(StatusChangeError::NotPermitted)).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(CartError::TotalTooLarge(MoneyError::Overflow)).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(CheckoutError::TotalTooLarge(MoneyError::Overflow)).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Internal("test".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_stock_violations_in_details() {
        let err = AppError::from(CheckoutError::OutOfStock(vec![StockViolation {
            cart_item_id: CartItemId::new(7),
            product_id: ProductId::new(3),
            product_name: "Stickers".to_string(),
            requested: 10,
            available: 4,
            reason: StockViolationReason::InsufficientStock,
        }]));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["error"], "some items cannot be ordered");
        assert_eq!(body["details"][0]["cart_item_id"], 7);
        assert_eq!(body["details"][0]["available"], 4);
        assert_eq!(body["details"][0]["reason"], "insufficient_stock");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = AppError::Internal("pool exhausted".to_string()).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["details"], json!([]));
    }
}
