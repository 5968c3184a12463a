//! Public catalog browsing and delivered-only reviews.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use printhub_core::OrderStatus;
use printhub_integration_tests::{TestApp, TestClient, money};

/// Walk an ordered item through to delivered.
async fn deliver(press: &TestClient, item_id: i64) {
    for next in [
        OrderStatus::Processing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ] {
        let (status, body) = press
            .put(
                &format!("/press/orders/items/{item_id}/status"),
                json!({ "status": next }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
}

#[tokio::test]
async fn listing_filters_and_pages() {
    let app = TestApp::new();
    let lahore = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let karachi = app.press("karachi@example.com", "Karachi Prints", "Karachi").await;
    lahore.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;
    lahore.create_product("Wedding Cards", "Cards", "40", 500, 50).await;
    lahore.create_product("Flyers", "Flyers", "2", 5000, 500).await;
    karachi.create_product("Vinyl Banner", "Banners", "1200", 10, 1).await;

    let visitor = app.client();
    let (status, all) = visitor.get("/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 4);
    assert_eq!(all[0]["name"], "Vinyl Banner");

    let (_, cards) = visitor.get("/products?category=cards").await;
    assert_eq!(cards.as_array().unwrap().len(), 2);

    let (_, search) = visitor.get("/products?q=WEDDING").await;
    assert_eq!(search.as_array().unwrap().len(), 1);
    assert_eq!(search[0]["name"], "Wedding Cards");

    let (_, profile) = karachi.get("/press/profile").await;
    let karachi_id = profile["id"].as_i64().unwrap();
    let (_, by_press) = visitor.get(&format!("/products?seller={karachi_id}")).await;
    assert_eq!(by_press.as_array().unwrap().len(), 1);

    let (_, page) = visitor.get("/products?limit=2&offset=2").await;
    let names: Vec<&str> = page
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Wedding Cards", "Visiting Cards"]);

    let (status, categories) = visitor.get("/categories").await;
    assert_eq!(status, StatusCode::OK);
    let cards_row = categories
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["category"] == "Cards")
        .unwrap();
    assert_eq!(cards_row["product_count"], 2);
}

#[tokio::test]
async fn product_page_shows_similar_products() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let visiting = press.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;
    for name in ["Wedding Cards", "Greeting Cards", "Gift Cards", "Loyalty Cards"] {
        press.create_product(name, "Cards", "10", 100, 10).await;
    }
    press.create_product("Flyers", "Flyers", "2", 5000, 500).await;

    let (status, detail) = app.client().get(&format!("/products/{visiting}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["product"]["name"], "Visiting Cards");
    assert_eq!(detail["seller"]["press_name"], "Lahore Offset");
    assert_eq!(detail["rating"]["count"], 0);

    let similar = detail["similar"].as_array().unwrap();
    assert_eq!(similar.len(), 3);
    for product in similar {
        assert_eq!(product["category"], "Cards");
        assert_ne!(product["id"].as_i64(), Some(visiting));
    }

    let (status, _) = app.client().get("/products/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn press_directory_filters_by_city_and_search() {
    let app = TestApp::new();
    let lahore = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let (status, body) = lahore
        .put(
            "/press/profile",
            json!({
                "press_name": "Lahore Offset",
                "owner_number": "+92 300 1234567",
                "city": "Lahore",
                "address": "Anarkali Bazaar",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let karachi = app.press("karachi@example.com", "Karachi Prints", "Karachi").await;
    karachi.create_product("Vinyl Banner", "Banners", "1200", 10, 1).await;
    karachi.create_product("Paper Banner", "Banners", "300", 10, 1).await;
    karachi.create_product("Photo Mug", "Gifts", "450", 10, 1).await;
    let visitor = app.client();

    for (query, expected) in [
        ("offset", vec!["Lahore Offset"]),
        ("ANARKALI", vec!["Lahore Offset"]),
        ("arach", vec!["Karachi Prints"]),
        ("mall%20road", vec!["Karachi Prints"]),
        ("r", vec!["Karachi Prints", "Lahore Offset"]),
        ("100%25", vec![]),
    ] {
        let (status, found) = visitor.get(&format!("/presses?q={query}")).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = found
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["press_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, expected, "q={query}");
    }

    let (_, none) = visitor.get("/presses?city=lahore&q=prints").await;
    assert!(none.as_array().unwrap().is_empty());

    let (status, presses) = visitor.get("/presses").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(presses.as_array().unwrap().len(), 2);

    let (_, in_karachi) = visitor.get("/presses?city=karachi").await;
    let in_karachi = in_karachi.as_array().unwrap();
    assert_eq!(in_karachi.len(), 1);
    assert_eq!(in_karachi[0]["press_name"], "Karachi Prints");

    let id = in_karachi[0]["id"].as_i64().unwrap();
    let (status, press) = visitor.get(&format!("/presses/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(press["products"].as_array().unwrap().len(), 3);
    assert_eq!(press["address"], "12 Mall Road");

    let (status, banners) = visitor.get(&format!("/presses/{id}?q=banner")).await;
    assert_eq!(status, StatusCode::OK);
    let banners = banners["products"].as_array().unwrap();
    assert_eq!(banners.len(), 2);
    assert!(banners.iter().all(|p| p["category"] == "Banners"));
}

#[tokio::test]
async fn reviews_open_after_delivery_once_per_buyer() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let cards = press.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;
    let buyer = app.buyer("asha@example.com").await;
    let review = json!({ "rating": 4, "comment": "  Crisp print, fast turnaround  " });
    let uri = format!("/products/{cards}/reviews");

    let line = buyer.add_to_cart(cards, 100).await;
    let (_, placed) = buyer.checkout(&[line]).await;
    let item_id = placed["order"]["items"][0]["id"].as_i64().unwrap();

    let (status, _) = buyer.post(&uri, review.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    deliver(&press, item_id).await;

    let (status, posted) = buyer.post(&uri, review.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{posted}");
    assert_eq!(posted["rating"], 4);
    assert_eq!(posted["comment"], "Crisp print, fast turnaround");
    assert_eq!(posted["reviewer_name"], "Asha Khan");

    let (status, _) = buyer.post(&uri, review).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, detail) = app.client().get(&format!("/products/{cards}")).await;
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 1);
    assert_eq!(detail["rating"]["count"], 1);
    assert_eq!(money(&detail["rating"]["average"]), Decimal::from(4));
}

#[tokio::test]
async fn racing_reviews_keep_one() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let cards = press.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;
    let buyer = app.buyer("asha@example.com").await;
    let line = buyer.add_to_cart(cards, 100).await;
    let (_, placed) = buyer.checkout(&[line]).await;
    deliver(&press, placed["order"]["items"][0]["id"].as_i64().unwrap()).await;

    let uri = format!("/products/{cards}/reviews");
    let second_tab = buyer.clone();
    let ((a, _), (b, _)) = tokio::join!(
        buyer.post(&uri, json!({ "rating": 5, "comment": "Sharp" })),
        second_tab.post(&uri, json!({ "rating": 3, "comment": "Late" })),
    );
    let mut codes = [a.as_u16(), b.as_u16()];
    codes.sort_unstable();
    assert_eq!(codes, [201, 409]);

    let (_, detail) = app.client().get(&format!("/products/{cards}")).await;
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn review_rating_must_be_in_range() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let cards = press.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;
    let buyer = app.buyer("asha@example.com").await;

    let (status, _) = buyer
        .post(&format!("/products/{cards}/reviews"), json!({ "rating": 6 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn press_manages_inventory() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;

    let (status, body) = press
        .post(
            "/press/inventory",
            json!({
                "name": " ",
                "price": "0",
                "inventory_quantity": 10,
                "minimum_order_quantity": 1,
                "category": "Cards",
                "image_urls": [],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"].as_array().unwrap().len(), 3);

    for (price, problem) in [
        ("0.001", "price can have at most 2 decimal places"),
        ("10000000000", "price must be at most Rs. 9999999999.99"),
        ("79228162514264337593543950335", "price must be at most Rs. 9999999999.99"),
    ] {
        let (status, body) = press
            .post(
                "/press/inventory",
                json!({
                    "name": "Stickers",
                    "price": price,
                    "inventory_quantity": 10,
                    "minimum_order_quantity": 1,
                    "category": "Labels",
                    "image_urls": ["https://cdn.example.com/stickers.jpg"],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{price}: {body}");
        assert_eq!(body["details"], json!([problem]));
    }

    let cards = press.create_product("Visiting Cards", "Cards", "5", 50, 100).await;
    let (_, dashboard) = press.get("/press/dashboard").await;
    assert_eq!(dashboard["product_count"], 1);
    assert_eq!(dashboard["low_stock"][0]["id"].as_i64(), Some(cards));

    let rival = app.press("karachi@example.com", "Karachi Prints", "Karachi").await;
    let (status, _) = rival.delete(&format!("/press/inventory/{cards}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = press.delete(&format!("/press/inventory/{cards}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, inventory) = press.get("/press/inventory").await;
    assert!(inventory.as_array().unwrap().is_empty());
}
