//! HTTP-level tests against the in-memory store.

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

mod common;
use common::*;

fn shoe(title: &str, stock: i32) -> Value {
    json!({
        "title": title,
        "price": "100.00",
        "shipping_amount": "5.00",
        "stock_qty": stock,
        "sizes": [{"name": "XL", "price": "120.00"}, {"name": "S", "price": "0.00"}],
        "colors": [{"name": "Red", "color_code": "#ff0000"}],
        "specifications": [{"title": "Material", "content": "Leather"}],
        "gallery": ["shoe-1.jpg"],
    })
}

fn line(cart_id: &str, product: &Value, qty: u32) -> Value {
    json!({"cart_id": cart_id, "product_id": product["id"], "qty": qty, "country": "Nigeria"})
}

#[cfg(test)]
mod account_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_login() {
        let app = setup_test_app().await;
        let (status, user) = app.post("/register/", None, json!({
            "full_name": "Alice Doe",
            "email": "Alice@Example.com",
            "phone": "555-0100",
            "password": "password123",
            "password2": "password123",
        })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["email"], "alice@example.com");
        assert_eq!(user["username"], "alice");
        assert!(user.get("password_hash").is_none());

        let (status, tokens) = app.post("/token/", None, json!({"email": "alice@example.com", "password": "password123"})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(tokens["access"].is_string());
        assert!(tokens["refresh"].is_string());

        let (status, body) = app.post("/token/", None, json!({"email": "alice@example.com", "password": "nope-nope"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let app = setup_test_app().await;
        app.user("bob@example.com").await;

        let (status, _) = app.post("/register/", None, json!({
            "full_name": "Bob", "email": "bob@example.com", "password": "password123", "password2": "password123",
        })).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app.post("/register/", None, json!({
            "full_name": "Carol", "email": "carol@example.com", "password": "password123", "password2": "password124",
        })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.post("/register/", None, json!({
            "full_name": "Carol", "email": "carol@example.com", "password": "short", "password2": "short",
        })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_refresh_token() {
        let app = setup_test_app().await;
        let access = app.user("dave@example.com").await;
        let (_, tokens) = app.post("/token/", None, json!({"email": "dave@example.com", "password": "password123"})).await;

        let (status, body) = app.post("/token/refresh/", None, json!({"refresh": tokens["refresh"]})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access"].is_string());

        let (status, _) = app.post("/token/refresh/", None, json!({"refresh": access})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_profile() {
        let app = setup_test_app().await;
        let token = app.user("erin@example.com").await;

        let (status, profile) = app.get("/profile/", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["full_name"], "Test User");

        let (status, profile) = app.put("/profile/", Some(&token), json!({"city": "Lagos", "country": "Nigeria"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["city"], "Lagos");
        assert_eq!(profile["full_name"], "Test User");

        let (status, _) = app.get("/profile/", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.get("/profile/", Some("not-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[cfg(test)]
mod catalog_tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_categories() {
        let app = setup_test_app().await;
        let (status, categories) = app.get("/category/", None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = categories.as_array().unwrap().iter().map(|c| c["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["MEN", "TEEN", "UNISEX", "WOMEN"]);
        let men = categories.as_array().unwrap().iter().find(|c| c["title"] == "MEN").unwrap();
        assert_eq!(men["slug"], "men");
    }

    #[tokio::test]
    async fn test_product_slug_and_detail() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let product = app.product(&vendor, shoe("Red Shoe", 5)).await;
        assert_eq!(product["slug"], "red-shoe");
        assert_eq!(product["pid"].as_str().unwrap().len(), 10);
        assert_eq!(product["in_stock"], true);
        assert_eq!(product["status"], "Published");

        let (status, detail) = app.get("/products/red-shoe/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["id"], product["id"]);
        assert_eq!(detail["size"].as_array().unwrap().len(), 2);
        assert_eq!(detail["color"][0]["name"], "Red");
        assert_eq!(detail["specification"][0]["content"], "Leather");
        assert_eq!(detail["gallery"].as_array().unwrap().len(), 1);

        let (status, body) = app.get("/products/no-such-shoe/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Product not found");
    }

    #[tokio::test]
    async fn test_listing_returns_every_product() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        app.product(&vendor, shoe("Red Shoe", 5)).await;
        let mut draft = shoe("Blue Shoe", 0);
        draft["status"] = json!("Draft");
        app.product(&vendor, draft).await;

        let (status, products) = app.get("/products/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(products.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_product_creation_rules() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        app.product(&vendor, shoe("Red Shoe", 5)).await;

        let (status, _) = app.post("/vendor/products/", Some(&vendor), shoe("Red Shoe", 1)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let buyer = app.user("buyer@example.com").await;
        let (status, _) = app.post("/vendor/products/", Some(&buyer), shoe("Green Shoe", 1)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.post("/vendor/register/", Some(&vendor), json!({"name": "Second Shop"})).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_product_amounts_must_be_storable() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;

        let mut negative = shoe("Cheap Shoe", 5);
        negative["price"] = json!("-100.00");
        let mut free_shipping_refund = shoe("Refund Shoe", 5);
        free_shipping_refund["shipping_amount"] = json!("-5.00");
        let mut negative_size = shoe("Odd Shoe", 5);
        negative_size["sizes"] = json!([{"name": "XL", "price": "-1.00"}]);
        let mut huge = shoe("Gold Shoe", 5);
        huge["price"] = json!("79228162514264337593543950335");
        let mut old_too_big = shoe("Vintage Shoe", 5);
        old_too_big["old_price"] = json!("10000000000.00");

        for body in [negative, free_shipping_refund, negative_size, huge, old_too_big] {
            let (status, err) = app.post("/vendor/products/", Some(&vendor), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", err);
        }
        let (_, products) = app.get("/products/", None).await;
        assert!(products.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prices_are_rounded_to_cents() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let mut body = shoe("Red Shoe", 5);
        body["price"] = json!("10.005");
        body["shipping_amount"] = json!("1.5");
        let product = app.product(&vendor, body).await;
        assert_eq!(product["price"], "10.00");
        assert_eq!(product["shipping_amount"], "1.50");

        let (status, item) = app.add_to_cart(None, line("cart-1", &product, 3)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["price"], "10.00");
        assert_eq!(amount(&item["price"]) * dec!(3), amount(&item["sub_total"]));
    }
}

#[cfg(test)]
mod cart_tests {
    use super::*;

    #[tokio::test]
    async fn test_line_pricing() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let product = app.product(&vendor, shoe("Red Shoe", 5)).await;

        let (status, item) = app.add_to_cart(None, line("cart-1", &product, 2)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(amount(&item["price"]), dec!(100));
        assert_eq!(amount(&item["sub_total"]), dec!(200));
        assert_eq!(amount(&item["shipping_amount"]), dec!(10));
        assert_eq!(amount(&item["service_fee"]), dec!(20));
        assert_eq!(amount(&item["tax_fee"]), dec!(10));
        assert_eq!(amount(&item["total"]), dec!(240));
    }

    #[tokio::test]
    async fn test_size_price_override() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let product = app.product(&vendor, shoe("Red Shoe", 5)).await;

        let mut body = line("cart-1", &product, 1);
        body["size"] = json!("XL");
        body["country"] = json!("Ghana");
        let (_, item) = app.add_to_cart(None, body).await;
        assert_eq!(amount(&item["price"]), dec!(120));
        assert_eq!(amount(&item["tax_fee"]), dec!(0));
        assert_eq!(amount(&item["total"]), dec!(137));

        // a zero-priced size keeps the product price
        let mut body = line("cart-2", &product, 1);
        body["size"] = json!("S");
        let (_, item) = app.add_to_cart(None, body).await;
        assert_eq!(amount(&item["price"]), dec!(100));
    }

    #[tokio::test]
    async fn test_re_add_replaces_line() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let product = app.product(&vendor, shoe("Red Shoe", 5)).await;

        let (_, first) = app.add_to_cart(None, line("cart-1", &product, 2)).await;
        let (_, second) = app.add_to_cart(None, line("cart-1", &product, 1)).await;
        assert_eq!(first["id"], second["id"]);

        let (status, items) = app.get("/cart/cart-1/", None).await;
        assert_eq!(status, StatusCode::OK);
        let items = items.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["qty"], 1);
        assert_eq!(amount(&items[0]["total"]), dec!(120));
    }

    #[tokio::test]
    async fn test_summary_and_removal() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let red = app.product(&vendor, shoe("Red Shoe", 5)).await;
        let blue = app.product(&vendor, shoe("Blue Shoe", 5)).await;
        app.add_to_cart(None, line("cart-1", &red, 2)).await;
        let (_, blue_item) = app.add_to_cart(None, line("cart-1", &blue, 1)).await;

        let (status, summary) = app.get("/cart/cart-1/summary/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["items"], 2);
        assert_eq!(amount(&summary["sub_total"]), dec!(300));
        assert_eq!(amount(&summary["total"]), dec!(360));

        let uri = format!("/cart/cart-1/items/{}/", blue_item["id"].as_str().unwrap());
        let (status, _) = app.request("DELETE", &uri, None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.request("DELETE", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, summary) = app.get("/cart/cart-1/summary/", None).await;
        assert_eq!(summary["items"], 1);
    }

    #[tokio::test]
    async fn test_rejected_lines() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let product = app.product(&vendor, shoe("Red Shoe", 2)).await;
        let mut draft = shoe("Blue Shoe", 5);
        draft["status"] = json!("Draft");
        let draft = app.product(&vendor, draft).await;

        let (status, _) = app.add_to_cart(None, line("cart-1", &product, 0)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.add_to_cart(None, line("cart-1", &product, 3)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.add_to_cart(None, line("cart-1", &draft, 1)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.add_to_cart(None, json!({"cart_id": "cart-1", "product_id": uuid::Uuid::now_v7(), "qty": 1})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_line_beyond_storable_total_is_rejected() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let mut body = shoe("Gold Shoe", 5);
        body["price"] = json!("9999999999.99");
        let product = app.product(&vendor, body).await;

        let (status, err) = app.add_to_cart(None, line("cart-1", &product, 2)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["message"], "Line amount is out of range");
        let (_, items) = app.get("/cart/cart-1/", None).await;
        assert!(items.as_array().unwrap().is_empty());
    }
}

#[cfg(test)]
mod checkout_tests {
    use super::*;

    #[tokio::test]
    async fn test_checkout_splits_vendors() {
        let app = setup_test_app().await;
        let shoes = app.vendor("shoes@example.com", "Shoe Shop").await;
        let hats = app.vendor("hats@example.com", "Hat Shop").await;
        let shoe = app.product(&shoes, shoe("Red Shoe", 5)).await;
        let hat = app.product(&hats, json!({"title": "Sun Hat", "price": "20.00", "stock_qty": 3})).await;
        let buyer = app.user("buyer@example.com").await;

        app.add_to_cart(Some(&buyer), line("cart-1", &shoe, 2)).await;
        app.add_to_cart(Some(&buyer), json!({"cart_id": "cart-1", "product_id": hat["id"], "qty": 1})).await;

        let (status, order) = app.post("/checkout/", Some(&buyer), json!({
            "cart_id": "cart-1", "full_name": "Buyer", "email": "buyer@example.com", "country": "Nigeria",
        })).await;
        assert_eq!(status, StatusCode::CREATED, "{}", order);
        assert_eq!(order["vendors"].as_array().unwrap().len(), 2);
        assert_eq!(order["items"].as_array().unwrap().len(), 2);
        let item_total: rust_decimal::Decimal = order["items"].as_array().unwrap().iter().map(|i| amount(&i["total"])).sum();
        assert_eq!(amount(&order["total"]), item_total);
        assert_eq!(amount(&order["total"]), dec!(262));
        assert_eq!(amount(&order["initial_cost"]), dec!(262));
        assert_eq!(amount(&order["saved"]), dec!(0));
        assert_eq!(order["payment_status"], "Pending");
        assert_eq!(order["order_status"], "Pending");
        assert!(order["items"].as_array().unwrap().iter().any(|i| i["qty"] == "2"));

        let (_, items) = app.get("/cart/cart-1/", None).await;
        assert!(items.as_array().unwrap().is_empty());

        let (_, detail) = app.get("/products/red-shoe/", None).await;
        assert_eq!(detail["stock_qty"], 3);
        let (_, detail) = app.get("/products/sun-hat/", None).await;
        assert_eq!(detail["stock_qty"], 2);

        let (status, orders) = app.get("/orders/", Some(&buyer)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(orders.as_array().unwrap().len(), 1);

        let uri = format!("/orders/{}/", order["oid"].as_str().unwrap());
        let (status, _) = app.get(&uri, Some(&buyer)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.get(&uri, Some(&hats)).await;
        assert_eq!(status, StatusCode::OK);
        let stranger = app.user("stranger@example.com").await;
        let (status, _) = app.get(&uri, Some(&stranger)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let app = setup_test_app().await;
        let (status, _) = app.post("/checkout/", None, json!({"cart_id": "nothing-here"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_no_order() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let product = app.product(&vendor, shoe("Red Shoe", 3)).await;
        let first = app.user("first@example.com").await;
        let second = app.user("second@example.com").await;

        app.add_to_cart(Some(&first), line("cart-a", &product, 3)).await;
        app.add_to_cart(Some(&second), line("cart-b", &product, 3)).await;

        let (status, _) = app.post("/checkout/", Some(&first), json!({"cart_id": "cart-a"})).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, detail) = app.get("/products/red-shoe/", None).await;
        assert_eq!(detail["stock_qty"], 0);
        assert_eq!(detail["in_stock"], false);

        let (status, _) = app.post("/checkout/", Some(&second), json!({"cart_id": "cart-b"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (_, orders) = app.get("/orders/", Some(&second)).await;
        assert!(orders.as_array().unwrap().is_empty());
        let (_, items) = app.get("/cart/cart-b/", None).await;
        assert_eq!(items.as_array().unwrap().len(), 1);
    }
}

#[cfg(test)]
mod coupon_tests {
    use super::*;

    async fn placed_order(app: &TestApp, vendor: &str, buyer: &str) -> String {
        let product = app.product(vendor, shoe("Red Shoe", 5)).await;
        app.add_to_cart(Some(buyer), line("cart-1", &product, 2)).await;
        let (_, order) = app.post("/checkout/", Some(buyer), json!({"cart_id": "cart-1"})).await;
        order["oid"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_coupon_applies_once() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let (status, _) = app.post("/vendor/coupons/", Some(&vendor), json!({"code": "SAVE10", "discount": 10})).await;
        assert_eq!(status, StatusCode::CREATED);
        let buyer = app.user("buyer@example.com").await;
        let oid = placed_order(&app, &vendor, &buyer).await;

        let (_, eligible) = app.get(&format!("/orders/{}/coupons/", oid), Some(&buyer)).await;
        assert_eq!(eligible.as_array().unwrap().len(), 1);

        let (status, applied) = app.post(&format!("/orders/{}/coupon/", oid), Some(&buyer), json!({"code": "SAVE10"})).await;
        assert_eq!(status, StatusCode::OK, "{}", applied);
        assert_eq!(amount(&applied["saved"]), dec!(24));
        assert_eq!(amount(&applied["order"]["total"]), dec!(216));
        assert_eq!(amount(&applied["order"]["saved"]), dec!(24));
        assert_eq!(amount(&applied["order"]["initial_cost"]), dec!(240));
        assert_eq!(amount(&applied["order"]["items"][0]["total"]), dec!(216));

        let (status, _) = app.post(&format!("/orders/{}/coupon/", oid), Some(&buyer), json!({"code": "SAVE10"})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (_, order) = app.get(&format!("/orders/{}/", oid), Some(&buyer)).await;
        assert_eq!(amount(&order["total"]), dec!(216));

        let (_, eligible) = app.get(&format!("/orders/{}/coupons/", oid), Some(&buyer)).await;
        assert!(eligible.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_coupon_is_never_used() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        app.post("/vendor/coupons/", Some(&vendor), json!({"code": "OFF", "discount": 50, "active": false})).await;
        let buyer = app.user("buyer@example.com").await;
        let oid = placed_order(&app, &vendor, &buyer).await;

        let (_, eligible) = app.get(&format!("/orders/{}/coupons/", oid), Some(&buyer)).await;
        assert!(eligible.as_array().unwrap().is_empty());
        let (status, err) = app.post(&format!("/orders/{}/coupon/", oid), Some(&buyer), json!({"code": "OFF"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["message"], "Coupon is not active");
        let (status, err) = app.post(&format!("/orders/{}/coupon/", oid), Some(&buyer), json!({"code": "NOPE"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["message"], "Invalid coupon");
        let (_, order) = app.get(&format!("/orders/{}/", oid), Some(&buyer)).await;
        assert_eq!(amount(&order["total"]), dec!(240));

        let (_, coupons) = app.get("/vendor/coupons/", Some(&vendor)).await;
        assert_eq!(coupons.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_vendor_coupon_not_applicable() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let other = app.vendor("other@example.com", "Hat Shop").await;
        app.post("/vendor/coupons/", Some(&other), json!({"code": "HATS", "discount": 20})).await;
        let buyer = app.user("buyer@example.com").await;
        let oid = placed_order(&app, &vendor, &buyer).await;

        let (status, body) = app.post(&format!("/orders/{}/coupon/", oid), Some(&buyer), json!({"code": "HATS"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Coupon does not apply to any item in this order");

        let (_, eligible) = app.get(&format!("/orders/{}/coupons/", oid), Some(&buyer)).await;
        assert!(eligible.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_buyer_applies_coupon() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        app.post("/vendor/coupons/", Some(&vendor), json!({"code": "SAVE10", "discount": 10})).await;
        let buyer = app.user("buyer@example.com").await;
        let oid = placed_order(&app, &vendor, &buyer).await;
        let stranger = app.user("stranger@example.com").await;

        let (status, _) = app.post(&format!("/orders/{}/coupon/", oid), Some(&stranger), json!({"code": "SAVE10"})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.post(&format!("/orders/{}/coupon/", oid), None, json!({"code": "SAVE10"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.post("/orders/missing/coupon/", Some(&buyer), json!({"code": "SAVE10"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_coupon_rules_on_creation() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let (status, _) = app.post("/vendor/coupons/", Some(&vendor), json!({"code": "BIG", "discount": 101})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        app.post("/vendor/coupons/", Some(&vendor), json!({"code": "SAVE10", "discount": 10})).await;
        let (status, _) = app.post("/vendor/coupons/", Some(&vendor), json!({"code": "SAVE10", "discount": 15})).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}

#[cfg(test)]
mod status_tests {
    use super::*;

    async fn setup() -> (TestApp, String, String, String) {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let buyer = app.user("buyer@example.com").await;
        let product = app.product(&vendor, shoe("Red Shoe", 5)).await;
        app.add_to_cart(Some(&buyer), line("cart-1", &product, 2)).await;
        let (_, order) = app.post("/checkout/", Some(&buyer), json!({"cart_id": "cart-1"})).await;
        let oid = order["oid"].as_str().unwrap().to_string();
        (app, vendor, buyer, oid)
    }

    #[tokio::test]
    async fn test_order_status_transitions() {
        let (app, vendor, _, oid) = setup().await;
        let uri = format!("/vendor/orders/{}/status/", oid);

        let (status, order) = app.put(&uri, Some(&vendor), json!({"status": "Shipped"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["order_status"], "Shipped");

        let (status, body) = app.put(&uri, Some(&vendor), json!({"status": "Pending"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cannot move from Shipped to Pending");

        let (status, _) = app.put(&uri, Some(&vendor), json!({"status": "Delivered"})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.put(&uri, Some(&vendor), json!({"status": "Cancelled"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, orders) = app.get("/vendor/orders/", Some(&vendor)).await;
        assert_eq!(orders[0]["order_status"], "Delivered");
    }

    #[tokio::test]
    async fn test_cancel_restocks() {
        let (app, vendor, _, oid) = setup().await;
        let (_, detail) = app.get("/products/red-shoe/", None).await;
        assert_eq!(detail["stock_qty"], 3);

        let (status, _) = app.put(&format!("/vendor/orders/{}/status/", oid), Some(&vendor), json!({"status": "Cancelled"})).await;
        assert_eq!(status, StatusCode::OK);
        let (_, detail) = app.get("/products/red-shoe/", None).await;
        assert_eq!(detail["stock_qty"], 5);
    }

    #[tokio::test]
    async fn test_only_participating_vendor_changes_status() {
        let (app, _, buyer, oid) = setup().await;
        let other = app.vendor("other@example.com", "Hat Shop").await;
        let uri = format!("/vendor/orders/{}/status/", oid);
        let (status, _) = app.put(&uri, Some(&other), json!({"status": "Shipped"})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.put(&uri, Some(&buyer), json!({"status": "Shipped"})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_payment_completion_notifies() {
        let (app, vendor, buyer, oid) = setup().await;
        let uri = format!("/orders/{}/payment/", oid);

        let (status, _) = app.post(&uri, Some(&buyer), json!({"status": "Completed"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.post(&uri, Some(&buyer), json!({"status": "Processing"})).await;
        assert_eq!(status, StatusCode::OK);

        // coupons only apply while payment is pending
        app.post("/vendor/coupons/", Some(&vendor), json!({"code": "LATE", "discount": 10})).await;
        let (status, _) = app.post(&format!("/orders/{}/coupon/", oid), Some(&buyer), json!({"code": "LATE"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, order) = app.post(&uri, Some(&buyer), json!({"status": "Completed"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["payment_status"], "Completed");

        let (_, mine) = app.get("/notifications/", Some(&buyer)).await;
        let mine = mine.as_array().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["order_id"], order["id"]);

        let (_, vendor_notes) = app.get("/vendor/notifications/", Some(&vendor)).await;
        assert_eq!(vendor_notes.as_array().unwrap().len(), 1);
        assert_eq!(vendor_notes[0]["order_item_id"], order["items"][0]["id"]);

        let seen_uri = format!("/notifications/{}/seen/", mine[0]["id"].as_str().unwrap());
        let (status, note) = app.post(&seen_uri, Some(&buyer), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(note["seen"], true);
        let (_, mine) = app.get("/notifications/", Some(&buyer)).await;
        assert!(mine.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_secret_gates_callback() {
        let app = setup_test_app_with_payment_secret("gateway-secret").await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let buyer = app.user("buyer@example.com").await;
        let product = app.product(&vendor, shoe("Red Shoe", 5)).await;
        app.add_to_cart(Some(&buyer), line("cart-1", &product, 2)).await;
        let (_, order) = app.post("/checkout/", Some(&buyer), json!({"cart_id": "cart-1"})).await;
        let uri = format!("/orders/{}/payment/", order["oid"].as_str().unwrap());

        let (status, _) = app.post(&uri, Some(&buyer), json!({"status": "Processing"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let wrong = [("X-Payment-Secret", "guess")];
        let (status, _) = app.request_with_headers("POST", &uri, Some(&buyer), &wrong, Some(json!({"status": "Processing"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let gateway = [("X-Payment-Secret", "gateway-secret")];
        for next in ["Processing", "Completed"] {
            let (status, body) = app.request_with_headers("POST", &uri, None, &gateway, Some(json!({"status": next}))).await;
            assert_eq!(status, StatusCode::OK, "{}", body);
            assert_eq!(body["payment_status"], next);
        }
    }

    #[tokio::test]
    async fn test_failed_payment_retries() {
        let (app, _, buyer, oid) = setup().await;
        let uri = format!("/orders/{}/payment/", oid);
        for (next, expected) in [
            ("Processing", StatusCode::OK),
            ("Failed", StatusCode::OK),
            ("Completed", StatusCode::BAD_REQUEST),
            ("Processing", StatusCode::OK),
            ("Completed", StatusCode::OK),
        ] {
            let (status, _) = app.post(&uri, Some(&buyer), json!({"status": next})).await;
            assert_eq!(status, expected, "moving to {}", next);
        }
    }
}

#[cfg(test)]
mod engagement_tests {
    use super::*;

    #[tokio::test]
    async fn test_review_moderation_updates_rating() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        app.product(&vendor, shoe("Red Shoe", 5)).await;
        let alice = app.user("alice@example.com").await;
        let bob = app.user("bob@example.com").await;

        let (status, first) = app.post("/products/red-shoe/reviews/", Some(&alice), json!({"review": "Great", "rating": 4})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["active"], false);
        let (_, second) = app.post("/products/red-shoe/reviews/", Some(&bob), json!({"review": "Superb", "rating": 5})).await;

        let (status, _) = app.post("/products/red-shoe/reviews/", Some(&bob), json!({"review": "Too much", "rating": 6})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app.post("/products/red-shoe/reviews/", None, json!({"review": "Anon", "rating": 3})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, reviews) = app.get("/products/red-shoe/reviews/", None).await;
        assert!(reviews.as_array().unwrap().is_empty());

        for review in [&first, &second] {
            let uri = format!("/vendor/reviews/{}/", review["id"].as_str().unwrap());
            let (status, moderated) = app.put(&uri, Some(&vendor), json!({"reply": "Thanks!", "active": true})).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(moderated["reply"], "Thanks!");
        }

        let (_, reviews) = app.get("/products/red-shoe/reviews/", None).await;
        assert_eq!(reviews.as_array().unwrap().len(), 2);
        let (_, product) = app.get("/products/red-shoe/", None).await;
        assert_eq!(product["rating"], 5);

        let other = app.vendor("other@example.com", "Hat Shop").await;
        let uri = format!("/vendor/reviews/{}/", first["id"].as_str().unwrap());
        let (status, _) = app.put(&uri, Some(&other), json!({"active": false})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        app.put(&uri, Some(&vendor), json!({"active": false})).await;
        let (_, product) = app.get("/products/red-shoe/", None).await;
        assert_eq!(product["rating"], 5);
        let (_, reviews) = app.get("/products/red-shoe/reviews/", None).await;
        assert_eq!(reviews.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_faq_answering() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        app.product(&vendor, shoe("Red Shoe", 5)).await;

        let (status, faq) = app.post("/products/red-shoe/faqs/", None, json!({"question": "Is it waterproof?", "email": "guest@example.com"})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(faq["active"], false);
        let (_, faqs) = app.get("/products/red-shoe/faqs/", None).await;
        assert!(faqs.as_array().unwrap().is_empty());

        let uri = format!("/vendor/faqs/{}/", faq["id"].as_str().unwrap());
        let (status, answered) = app.put(&uri, Some(&vendor), json!({"answer": "Yes"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answered["answer"], "Yes");

        let (_, faqs) = app.get("/products/red-shoe/faqs/", None).await;
        assert_eq!(faqs.as_array().unwrap().len(), 1);

        let (status, _) = app.get("/products/unknown/faqs/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wishlist_toggle() {
        let app = setup_test_app().await;
        let vendor = app.vendor("shop@example.com", "Shoe Shop").await;
        let product = app.product(&vendor, shoe("Red Shoe", 5)).await;
        let buyer = app.user("buyer@example.com").await;

        let (status, body) = app.post("/wishlist/", Some(&buyer), json!({"product_id": product["id"]})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "added");
        let (_, list) = app.get("/wishlist/", Some(&buyer)).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (_, body) = app.post("/wishlist/", Some(&buyer), json!({"product_id": product["id"]})).await;
        assert_eq!(body["status"], "removed");
        let (_, list) = app.get("/wishlist/", Some(&buyer)).await;
        assert!(list.as_array().unwrap().is_empty());

        let (status, _) = app.get("/wishlist/", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
