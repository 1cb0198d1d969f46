#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt;

use storefront::{
    api::{router, AppState},
    auth::JwtKeys,
    domain::aggregates::PricingPolicy,
    publisher::EventPublisher,
    store::{seed_categories, MemoryStore, Store},
};

pub struct TestApp {
    pub router: Router,
}

/// Router over a fresh in-memory store: 10 % service fee, no default tax, 5 % tax for Nigeria.
pub async fn setup_test_app() -> TestApp {
    build_test_app(None).await
}

/// Same as [`setup_test_app`], with payment callbacks restricted to `secret` holders.
pub async fn setup_test_app_with_payment_secret(secret: &str) -> TestApp {
    build_test_app(Some(secret)).await
}

async fn build_test_app(payment_secret: Option<&str>) -> TestApp {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    seed_categories(store.as_ref()).await.unwrap();
    let pricing = PricingPolicy {
        service_fee_percent: dec!(10),
        default_tax_rate: Decimal::ZERO,
        tax_rates: HashMap::from([("nigeria".to_string(), dec!(5))]),
    };
    let state = AppState {
        store,
        jwt: Arc::new(JwtKeys::new("test-secret", chrono::Duration::minutes(5), chrono::Duration::days(1))),
        pricing: Arc::new(pricing),
        events: EventPublisher::default(),
        payment_secret: payment_secret.map(Arc::from),
    };
    TestApp { router: router(state) }
}

impl TestApp {
    pub async fn request(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.request_with_headers(method, uri, token, &[], body).await
    }

    pub async fn request_with_headers(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri).header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("PUT", uri, token, Some(body)).await
    }

    /// Registers a user and returns an access token.
    pub async fn user(&self, email: &str) -> String {
        let (status, _) = self.post("/register/", None, json!({
            "full_name": "Test User",
            "email": email,
            "password": "password123",
            "password2": "password123",
        })).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, tokens) = self.post("/token/", None, json!({"email": email, "password": "password123"})).await;
        assert_eq!(status, StatusCode::OK);
        tokens["access"].as_str().unwrap().to_string()
    }

    /// Registers a user with a vendor profile and returns its access token.
    pub async fn vendor(&self, email: &str, name: &str) -> String {
        let token = self.user(email).await;
        let (status, _) = self.post("/vendor/register/", Some(&token), json!({"name": name})).await;
        assert_eq!(status, StatusCode::CREATED);
        token
    }

    /// Creates a published product and returns its JSON.
    pub async fn product(&self, vendor_token: &str, body: Value) -> Value {
        let (status, product) = self.post("/vendor/products/", Some(vendor_token), body).await;
        assert_eq!(status, StatusCode::CREATED, "{}", product);
        product
    }

    pub async fn add_to_cart(&self, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.post("/cart/", token, body).await
    }
}

pub fn amount(v: &Value) -> Decimal {
    match v {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not an amount: {}", other),
    }
}
