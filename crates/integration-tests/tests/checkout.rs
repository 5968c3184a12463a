//! Checkout: splitting by press, stock checks and concurrent buyers.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use printhub_core::OrderStatus;
use printhub_integration_tests::{TestApp, delivery, money, status_of};

#[tokio::test]
async fn order_is_split_by_press_and_unselected_lines_stay() {
    let app = TestApp::new();
    let lahore = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let karachi = app.press("karachi@example.com", "Karachi Prints", "Karachi").await;
    let cards = lahore.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;
    let flyers = lahore.create_product("Flyers", "Flyers", "2", 5000, 500).await;
    let banner = karachi.create_product("Vinyl Banner", "Banners", "1200", 10, 1).await;
    let mugs = karachi.create_product("Photo Mug", "Gifts", "450", 50, 1).await;

    let buyer = app.buyer("asha@example.com").await;
    let cards_line = buyer.add_to_cart(cards, 200).await;
    let banner_line = buyer.add_to_cart(banner, 2).await;
    let flyers_line = buyer.add_to_cart(flyers, 500).await;
    let mugs_line = buyer.add_to_cart(mugs, 4).await;

    let (status, placed) = buyer.checkout(&[cards_line, banner_line]).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");

    let order = &placed["order"];
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(money(&order["total_price"]), Decimal::from(1000 + 2400));
    assert_eq!(order["delivery"]["city"], "Lahore");

    let fragments = placed["seller_orders"].as_array().unwrap();
    assert_eq!(fragments.len(), 2);
    for fragment in fragments {
        assert_eq!(fragment["order_id"], order["id"]);
        assert_eq!(fragment["items"].as_array().unwrap().len(), 1);
        let item = &fragment["items"][0];
        assert_eq!(item["seller_id"], fragment["seller_id"]);
        assert_eq!(status_of(&item["status"]), OrderStatus::Pending);
    }

    assert_eq!(lahore.stock_of(cards).await, 800);
    assert_eq!(karachi.stock_of(banner).await, 8);
    assert_eq!(lahore.stock_of(flyers).await, 5000);

    let (status, cart) = buyer.get("/cart").await;
    assert_eq!(status, StatusCode::OK);
    let remaining: Vec<i64> = cart["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["id"].as_i64().unwrap())
        .collect();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.contains(&flyers_line));
    assert!(remaining.contains(&mugs_line));
    assert_eq!(money(&cart["subtotal"]), Decimal::ZERO);

    let (status, cart) = buyer.get(&format!("/cart?selected={mugs_line}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&cart["subtotal"]), Decimal::from(1800));

    let (status, orders) = buyer.get("/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(status_of(&orders[0]["status"]), OrderStatus::Pending);

    let (status, press_orders) = karachi.get("/press/orders").await;
    assert_eq!(status, StatusCode::OK);
    let press_orders = press_orders.as_array().unwrap();
    assert_eq!(press_orders.len(), 1);
    assert_eq!(press_orders[0]["delivery"]["name"], "Asha Khan");
    assert_eq!(press_orders[0]["items"][0]["product_name"], "Vinyl Banner");
}

#[tokio::test]
async fn stock_shortfall_rejects_the_whole_order() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let cards = press.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;
    let stickers = press.create_product("Stickers", "Labels", "1", 300, 50).await;

    let buyer = app.buyer("asha@example.com").await;
    let cards_line = buyer.add_to_cart(cards, 100).await;
    let stickers_line = buyer.add_to_cart(stickers, 250).await;

    let (status, _) = press
        .put(
            &format!("/press/inventory/{stickers}"),
            json!({
                "name": "Stickers",
                "description": "Die-cut vinyl",
                "price": "1",
                "inventory_quantity": 40,
                "minimum_order_quantity": 50,
                "category": "Labels",
                "image_urls": ["https://cdn.example.com/stickers.jpg"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = buyer.checkout(&[cards_line, stickers_line]).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["cart_item_id"].as_i64(), Some(stickers_line));
    assert_eq!(details[0]["product_name"], "Stickers");
    assert_eq!(details[0]["requested"], 250);
    assert_eq!(details[0]["available"], 40);
    assert_eq!(details[0]["reason"], "insufficient_stock");

    assert_eq!(press.stock_of(cards).await, 1000);
    assert_eq!(press.stock_of(stickers).await, 40);

    let (_, cart) = buyer.get("/cart").await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 2);
    let (_, orders) = buyer.get("/orders").await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn last_unit_goes_to_exactly_one_buyer() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let banner = press.create_product("Shop Sign", "Signage", "9000", 1, 1).await;

    let first = app.buyer("first@example.com").await;
    let second = app.buyer("second@example.com").await;
    let first_line = first.add_to_cart(banner, 1).await;
    let second_line = second.add_to_cart(banner, 1).await;

    let first_lines = [first_line];
    let second_lines = [second_line];
    let ((a, _), (b, _)) = tokio::join!(first.checkout(&first_lines), second.checkout(&second_lines));

    let mut outcomes = [a.as_u16(), b.as_u16()];
    outcomes.sort_unstable();
    assert_eq!(outcomes, [201, 409]);
    assert_eq!(press.stock_of(banner).await, 0);
}

#[tokio::test]
async fn lines_from_another_cart_are_unknown() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let cards = press.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;

    let owner = app.buyer("owner@example.com").await;
    let intruder = app.buyer("intruder@example.com").await;
    let line = owner.add_to_cart(cards, 100).await;

    let (status, body) = intruder.checkout(&[line]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"][0]["cart_item_id"].as_i64(), Some(line));
    assert_eq!(press.stock_of(cards).await, 1000);
}

#[tokio::test]
async fn blank_delivery_fields_are_listed() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let cards = press.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;
    let buyer = app.buyer("asha@example.com").await;
    let line = buyer.add_to_cart(cards, 100).await;

    let mut details = delivery();
    details["phone"] = json!("  ");
    details["postal_code"] = json!("");
    let (status, body) = buyer
        .post("/checkout", json!({ "cart_item_ids": [line], "delivery": details }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);

    let (status, _) = buyer
        .post("/checkout", json!({ "cart_item_ids": [], "delivery": delivery() }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cart_enforces_minimum_order_quantity() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let cards = press.create_product("Visiting Cards", "Cards", "5", 1000, 100).await;
    let buyer = app.buyer("asha@example.com").await;

    let (status, _) = buyer
        .post(
            "/cart/items",
            json!({
                "product_id": cards,
                "quantity": 10,
                "design_urls": ["https://designs.example.com/front.pdf"],
                "instructions": "Matte",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let line = buyer.add_to_cart(cards, 100).await;
    let (status, item) = buyer
        .patch(&format!("/cart/items/{line}"), json!({ "quantity": 300 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["quantity"], 300);

    let (status, _) = buyer.delete(&format!("/cart/items/{line}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, cart) = buyer.get("/cart").await;
    assert!(cart["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unstorable_totals_are_refused_without_side_effects() {
    let app = TestApp::new();
    let press = app.press("lahore@example.com", "Lahore Offset", "Lahore").await;
    let billboard = press
        .create_product("Billboard Wrap", "Banners", "6000000000", 10, 1)
        .await;

    let buyer = app.buyer("asha@example.com").await;
    let (status, body) = buyer
        .post(
            "/cart/items",
            json!({
                "product_id": billboard,
                "quantity": 2,
                "design_urls": ["https://designs.example.com/wrap.pdf"],
                "instructions": "Weatherproof vinyl",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let first = buyer.add_to_cart(billboard, 1).await;
    let second = buyer.add_to_cart(billboard, 1).await;

    let (status, cart) = buyer.get(&format!("/cart?selected={first}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&cart["subtotal"]), Decimal::from(6_000_000_000_i64));

    let (status, body) = buyer.get(&format!("/cart?selected={first},{second}")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, body) = buyer.checkout(&[first, second]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(press.stock_of(billboard).await, 10);

    let (status, placed) = buyer.checkout(&[first]).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");
    assert_eq!(money(&placed["order"]["total_price"]), Decimal::from(6_000_000_000_i64));
}
