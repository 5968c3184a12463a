//! Sign-up, login, sessions and role checks.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use printhub_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn health_checks_respond() {
    let app = TestApp::new();
    let client = app.client();

    let (status, body) = client.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));

    let (status, _) = client.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signup_signs_the_buyer_in() {
    let app = TestApp::new();
    let buyer = app.buyer("asha@example.com").await;

    let (status, me) = buyer.get("/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "asha@example.com");
    assert_eq!(me["role"], "buyer");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    let buyer = app.buyer("asha@example.com").await;

    let (status, _) = buyer.post("/auth/logout", json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = buyer.get("/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn login_with_correct_and_wrong_password() {
    let app = TestApp::new();
    app.press("press@example.com", "Lahore Offset", "Lahore").await;

    let client = app.client();
    let (status, _) = client
        .post(
            "/auth/login",
            json!({ "email": "press@example.com", "password": "not the password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, account) = client
        .post(
            "/auth/login",
            json!({ "email": "press@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["role"], "seller");

    let (status, _) = client.get("/press/dashboard").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new();
    app.buyer("asha@example.com").await;

    let (status, _) = app
        .client()
        .post(
            "/auth/press/register",
            json!({
                "email": "asha@example.com",
                "password": PASSWORD,
                "password_confirmation": PASSWORD,
                "press_name": "Second Press",
                "owner_number": "0300 0000000",
                "city": "Karachi",
                "address": "1 Saddar",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn signup_rejects_mismatched_passwords() {
    let app = TestApp::new();
    let (status, _) = app
        .client()
        .post(
            "/auth/signup",
            json!({
                "email": "asha@example.com",
                "password": PASSWORD,
                "password_confirmation": "something else entirely",
                "name": "Asha",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn role_areas_are_guarded() {
    let app = TestApp::new();
    let anonymous = app.client();
    let buyer = app.buyer("asha@example.com").await;
    let press = app.press("press@example.com", "Lahore Offset", "Lahore").await;

    let (status, _) = anonymous.get("/cart").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = anonymous.get("/press/inventory").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = buyer.get("/press/inventory").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = press.get("/cart").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = buyer.get("/cart").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = press.get("/press/inventory").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profiles_can_be_updated() {
    let app = TestApp::new();
    let buyer = app.buyer("asha@example.com").await;

    let (status, profile) = buyer
        .put("/profile", json!({ "name": "Asha K.", "phone": "0321 1111111" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Asha K.");

    let (status, _) = buyer
        .put("/profile", json!({ "name": "   ", "phone": "0321 1111111" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
