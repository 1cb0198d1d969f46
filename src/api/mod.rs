//! HTTP surface.

pub mod accounts;
pub mod catalog;
pub mod checkout;
pub mod engagement;
pub mod vendor;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;
use uuid::Uuid;

use crate::auth::JwtKeys;
use crate::domain::aggregates::{CartError, CouponError, OrderError, PricingPolicy, Vendor};
use crate::publisher::EventPublisher;
use crate::store::Store;
use crate::EcommerceError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt: Arc<JwtKeys>,
    pub pricing: Arc<PricingPolicy>,
    pub events: EventPublisher,
    /// When set, only callers presenting it may change payment status.
    pub payment_secret: Option<Arc<str>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "storefront"})) }))
        // Accounts
        .route("/token/", post(accounts::token))
        .route("/token/refresh/", post(accounts::refresh))
        .route("/register/", post(accounts::register))
        .route("/profile/", get(accounts::profile).put(accounts::update_profile))
        // Catalog
        .route("/category/", get(catalog::list_categories))
        .route("/products/", get(catalog::list_products))
        .route("/products/:slug/", get(catalog::product_detail))
        .route("/products/:slug/reviews/", get(engagement::list_reviews).post(engagement::create_review))
        .route("/products/:slug/faqs/", get(engagement::list_faqs).post(engagement::create_faq))
        // Cart and orders
        .route("/cart/", post(checkout::add_to_cart))
        .route("/cart/:cart_id/", get(checkout::list_cart))
        .route("/cart/:cart_id/summary/", get(checkout::cart_summary))
        .route("/cart/:cart_id/items/:item_id/", delete(checkout::remove_cart_item))
        .route("/checkout/", post(checkout::checkout))
        .route("/orders/", get(checkout::list_orders))
        .route("/orders/:oid/", get(checkout::order_detail))
        .route("/orders/:oid/coupon/", post(checkout::apply_coupon))
        .route("/orders/:oid/coupons/", get(checkout::eligible_coupons))
        .route("/orders/:oid/payment/", post(checkout::update_payment))
        // Wishlist and notifications
        .route("/wishlist/", get(engagement::wishlist).post(engagement::toggle_wishlist))
        .route("/notifications/", get(engagement::notifications))
        .route("/notifications/:id/seen/", post(engagement::mark_seen))
        // Vendor dashboard
        .route("/vendor/register/", post(vendor::register))
        .route("/vendor/products/", post(vendor::create_product))
        .route("/vendor/coupons/", get(vendor::list_coupons).post(vendor::create_coupon))
        .route("/vendor/orders/", get(vendor::list_orders))
        .route("/vendor/orders/:oid/status/", put(vendor::update_order_status))
        .route("/vendor/reviews/:id/", put(vendor::moderate_review))
        .route("/vendor/faqs/:id/", put(vendor::answer_faq))
        .route("/vendor/notifications/", get(vendor::notifications))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The caller's vendor profile, or 403 when the caller does not sell.
pub(crate) async fn require_vendor(state: &AppState, user_id: Uuid) -> crate::Result<Vendor> {
    state.store.vendor_for_user(user_id).await?
        .ok_or_else(|| EcommerceError::Forbidden("Vendor profile required".into()))
}

impl EcommerceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ProductNotFound | Self::OrderNotFound | Self::NotFound(_) | Self::InvalidCoupon => StatusCode::NOT_FOUND,
            Self::Cart(CartError::ItemNotFound) => StatusCode::NOT_FOUND,
            Self::Cart(_) => StatusCode::BAD_REQUEST,
            Self::Order(OrderError::MalformedQuantity(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Order(_) => StatusCode::BAD_REQUEST,
            Self::Coupon(CouponError::AlreadyRedeemed) => StatusCode::CONFLICT,
            Self::Coupon(CouponError::Inactive) => StatusCode::NOT_FOUND,
            Self::Coupon(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let message = match &self {
            Self::StorageError(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        };
        let body = json!({ "error": status.canonical_reason().unwrap_or("Error"), "message": message });
        (status, Json(body)).into_response()
    }
}
