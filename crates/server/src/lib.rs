//! PrintHub marketplace API.
//!
//! This crate provides the server as a library, allowing the full router to
//! be driven from tests against the in-memory store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, routing::get};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::state::AppState;

/// Build the application router.
///
/// Layers, innermost first: rate limits (when enabled in config), session,
/// request id, tracing. Sentry layers are added by the binary.
pub fn build_router<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let mut auth = routes::auth_routes();
    let mut api = routes::api_routes();
    if state.config().rate_limit {
        match (
            middleware::auth_rate_limiter(),
            middleware::api_rate_limiter(),
        ) {
            (Some(auth_limit), Some(api_limit)) => {
                auth = auth.layer(auth_limit);
                api = api.layer(api_limit);
            }
            _ => tracing::warn!("Rate limiter quota rejected, serving without limits"),
        }
    }

    let session_layer = middleware::create_session_layer(session_store, state.config());

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/health/ready", get(routes::health::readiness))
        .nest("/auth", auth)
        .merge(api)
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
