//! Integration test harness for PrintHub.
//!
//! Drives the full router (sessions, request ids, error mapping) against the
//! in-memory store. Each [`TestClient`] holds its own session cookie, so one
//! test can act as several buyers and presses at once.
//!
//! # Example
//!
//! ```rust,ignore
//! let app = TestApp::new();
//! let buyer = app.buyer("asha@example.com").await;
//! let (status, me) = buyer.get("/auth/me").await;
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use printhub_core::OrderStatus;
use printhub_server::build_router;
use printhub_server::config::{PrintHubConfig, StoreBackend};
use printhub_server::db::MemoryStore;
use printhub_server::state::AppState;

/// Password used for every account the harness creates.
pub const PASSWORD: &str = "correct horse battery";

/// Name of the session cookie set by the server.
const SESSION_COOKIE: &str = "printhub_session";

fn test_config() -> PrintHubConfig {
    PrintHubConfig {
        store: StoreBackend::Memory,
        database_url: None,
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("integration-suite-Kx81vQz0LmP3wR7tYb5nHc2"),
        log_json: false,
        rate_limit: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A running application over a fresh in-memory store.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Build the router over an empty store.
    #[must_use]
    pub fn new() -> Self {
        let state = AppState::new(test_config(), Arc::new(MemoryStore::new()));
        let router = build_router(state, tower_sessions::MemoryStore::default());
        Self { router }
    }

    /// A client with no session.
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: Arc::new(Mutex::new(None)),
        }
    }

    /// A client signed in as a newly registered press.
    pub async fn press(&self, email: &str, press_name: &str, city: &str) -> TestClient {
        let client = self.client();
        let (status, body) = client
            .post(
                "/auth/press/register",
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "password_confirmation": PASSWORD,
                    "press_name": press_name,
                    "owner_number": "+92 300 1234567",
                    "city": city,
                    "address": "12 Mall Road",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "press registration failed: {body}");
        client
    }

    /// A client signed in as a newly registered buyer.
    pub async fn buyer(&self, email: &str) -> TestClient {
        let client = self.client();
        let (status, body) = client
            .post(
                "/auth/signup",
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "password_confirmation": PASSWORD,
                    "name": "Asha Khan",
                    "phone": "0300 7654321",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "buyer sign-up failed: {body}");
        client
    }
}

/// A cookie-carrying client for the test router.
#[derive(Clone)]
pub struct TestClient {
    router: Router,
    cookie: Arc<Mutex<Option<String>>>,
}

impl TestClient {
    /// Send a request and decode the response body.
    ///
    /// JSON bodies are parsed; any other body comes back as a string, and an
    /// empty body as `Value::Null`.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = self.cookie.lock().unwrap().as_deref() {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={cookie}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        self.remember_cookie(response.headers());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    fn remember_cookie(&self, headers: &axum::http::HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let Some(pair) = value.split(';').next() else { continue };
            let Some((name, token)) = pair.trim().split_once('=') else { continue };
            if name != SESSION_COOKIE {
                continue;
            }
            let expired = token.is_empty() || value.to_ascii_lowercase().contains("max-age=0");
            *self.cookie.lock().unwrap() = (!expired).then(|| token.to_string());
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Create a product in this press's inventory and return its id.
    pub async fn create_product(
        &self,
        name: &str,
        category: &str,
        price: &str,
        inventory: u32,
        minimum: u32,
    ) -> i64 {
        let (status, body) = self
            .post(
                "/press/inventory",
                json!({
                    "name": name,
                    "description": format!("{name} printed to order"),
                    "price": price,
                    "inventory_quantity": inventory,
                    "minimum_order_quantity": minimum,
                    "category": category,
                    "image_urls": [format!("https://cdn.example.com/{}.jpg", name.to_lowercase().replace(' ', "-"))],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "product creation failed: {body}");
        body["id"].as_i64().unwrap()
    }

    /// Add a product to this buyer's cart and return the line id.
    pub async fn add_to_cart(&self, product_id: i64, quantity: u32) -> i64 {
        let (status, body) = self
            .post(
                "/cart/items",
                json!({
                    "product_id": product_id,
                    "quantity": quantity,
                    "design_urls": ["https://designs.example.com/front.pdf"],
                    "instructions": "Matte finish, trim to size",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "add to cart failed: {body}");
        body["id"].as_i64().unwrap()
    }

    /// Check out the given cart lines with valid delivery details.
    pub async fn checkout(&self, cart_item_ids: &[i64]) -> (StatusCode, Value) {
        self.post(
            "/checkout",
            json!({
                "cart_item_ids": cart_item_ids,
                "delivery": delivery(),
            }),
        )
        .await
    }

    /// Current stock of one of this press's products.
    pub async fn stock_of(&self, product_id: i64) -> u64 {
        let (status, body) = self.get("/press/inventory").await;
        assert_eq!(status, StatusCode::OK, "inventory failed: {body}");
        body.as_array()
            .unwrap()
            .iter()
            .find(|p| p["id"].as_i64() == Some(product_id))
            .and_then(|p| p["inventory_quantity"].as_u64())
            .unwrap()
    }
}

/// Valid delivery details.
#[must_use]
pub fn delivery() -> Value {
    json!({
        "name": "Asha Khan",
        "phone": "0300 7654321",
        "city": "Lahore",
        "postal_code": "54000",
        "address": "7 Canal View",
        "payment_method": "cash_on_delivery",
    })
}

/// Read an order or item status.
#[must_use]
pub fn status_of(value: &Value) -> OrderStatus {
    serde_json::from_value(value.clone()).unwrap()
}

/// Read a money amount, which the API renders as a decimal string.
#[must_use]
pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a money value: {other}"),
    }
}
