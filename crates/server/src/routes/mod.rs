//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (store ping)
//!
//! # Auth
//! POST /auth/signup            - Buyer sign-up
//! POST /auth/press/register    - Press registration
//! POST /auth/login             - Login (both roles)
//! POST /auth/logout            - Logout
//! GET  /auth/me                - Current account
//!
//! # Catalog
//! GET  /products               - Product listing (category, seller, q, limit, offset)
//! GET  /products/{id}          - Product detail with reviews and similar products
//! POST /products/{id}/reviews  - Post a review (buyer)
//! GET  /categories             - Categories with counts
//! GET  /presses                - Press directory (city, search)
//! GET  /presses/{id}           - Press detail with products (search)
//!
//! # Buyer (requires buyer session)
//! GET    /cart                 - Cart (?selected=1,2)
//! POST   /cart/items           - Add line
//! PATCH  /cart/items/{id}      - Change quantity
//! DELETE /cart/items/{id}      - Remove line
//! POST   /checkout             - Place order
//! GET    /orders               - Order history
//! GET    /orders/{id}          - Order detail
//! POST   /orders/{id}/items/{item}/cancel - Cancel a pending item
//! GET    /profile              - Profile
//! PUT    /profile              - Update profile
//!
//! # Press (requires seller session)
//! GET    /press/dashboard
//! GET    /press/profile
//! PUT    /press/profile
//! GET    /press/inventory
//! POST   /press/inventory
//! PUT    /press/inventory/{id}
//! DELETE /press/inventory/{id}
//! GET    /press/orders
//! PUT    /press/orders/items/{item}/status
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod press;
pub mod profile;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router, mounted at `/auth`.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/press/register", post(auth::register_press))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the public catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route("/products/{id}/reviews", post(catalog::post_review))
        .route("/categories", get(catalog::categories))
        .route("/presses", get(catalog::presses))
        .route("/presses/{id}", get(catalog::press))
}

/// Create the buyer routes router.
pub fn buyer_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show))
        .route("/cart/items", post(cart::add))
        .route(
            "/cart/items/{id}",
            axum::routing::patch(cart::update).delete(cart::remove),
        )
        .route("/checkout", post(checkout::checkout))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/items/{item}/cancel", post(orders::cancel_item))
        .route("/profile", get(profile::show).put(profile::update))
}

/// Create the press back-office routes router, mounted at `/press`.
pub fn press_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(press::dashboard))
        .route("/profile", get(press::profile).put(press::update_profile))
        .route(
            "/inventory",
            get(press::inventory).post(press::create_product),
        )
        .route(
            "/inventory/{id}",
            put(press::update_product).delete(press::delete_product),
        )
        .route("/orders", get(press::orders))
        .route("/orders/items/{item}/status", put(press::update_item_status))
}

/// Every route except `/auth` and the health checks.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .merge(buyer_routes())
        .nest("/press", press_routes())
}
