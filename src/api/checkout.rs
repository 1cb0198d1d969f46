//! Cart, checkout and buyer-side order endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::auth::AuthUser;
use crate::domain::aggregates::{
    BillingDetails, CartItem, CartLine, CartOrder, CartSummary, Coupon, OrderDetail, PaymentStatus,
};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Money;
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    #[validate(length(min = 1, max = 1000))]
    pub cart_id: String,
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub qty: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 1000))]
    pub cart_id: String,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequest {
    #[validate(length(min = 1, max = 1000))]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest { pub status: PaymentStatus }

#[derive(Debug, Serialize)]
pub struct CouponApplied {
    pub message: &'static str,
    pub saved: Money,
    pub order: OrderDetail,
}

/// Orders with a buyer are visible to that buyer only; guest orders to whoever holds the oid.
fn ensure_buyer(detail: &OrderDetail, caller: Option<AuthUser>) -> Result<()> {
    match (detail.order.buyer_id, caller) {
        (None, _) => Ok(()),
        (Some(buyer), Some(auth)) if buyer == auth.user_id => Ok(()),
        (Some(_), Some(_)) => Err(EcommerceError::Forbidden("Not the buyer of this order".into())),
        (Some(_), None) => Err(EcommerceError::Unauthorized("Authentication required".into())),
    }
}

async fn load_order(s: &AppState, oid: &str) -> Result<OrderDetail> {
    s.store.order(oid).await?.ok_or(EcommerceError::OrderNotFound)
}

#[instrument(skip_all, fields(cart_id = %req.cart_id))]
pub async fn add_to_cart(
    State(s): State<AppState>,
    caller: Option<AuthUser>,
    Json(req): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItem>)> {
    req.validate()?;
    let product = s.store.product(req.product_id).await?.ok_or(EcommerceError::ProductNotFound)?;
    let detail = s.store.product_by_slug(&product.slug).await?.ok_or(EcommerceError::ProductNotFound)?;
    let line = CartLine {
        cart_id: req.cart_id,
        user_id: caller.map(|a| a.user_id),
        qty: req.qty,
        size: req.size,
        color: req.color,
        country: req.country,
    };
    let item = CartItem::priced(&detail, line, &s.pricing)?;
    Ok((StatusCode::CREATED, Json(s.store.upsert_cart_item(item).await?)))
}

pub async fn list_cart(State(s): State<AppState>, Path(cart_id): Path<String>) -> Result<Json<Vec<CartItem>>> {
    Ok(Json(s.store.cart_items(&cart_id).await?))
}

pub async fn cart_summary(State(s): State<AppState>, Path(cart_id): Path<String>) -> Result<Json<CartSummary>> {
    let items = s.store.cart_items(&cart_id).await?;
    Ok(Json(CartSummary::of(&items)))
}

pub async fn remove_cart_item(State(s): State<AppState>, Path((cart_id, item_id)): Path<(String, Uuid)>) -> Result<StatusCode> {
    s.store.remove_cart_item(&cart_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(cart_id = %req.cart_id))]
pub async fn checkout(
    State(s): State<AppState>,
    caller: Option<AuthUser>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    req.validate()?;
    let billing = BillingDetails {
        full_name: req.full_name,
        email: req.email,
        mobile: req.mobile,
        address: req.address,
        city: req.city,
        state: req.state,
        country: req.country,
    };
    let detail = s.store.place_order(&req.cart_id, caller.map(|a| a.user_id), billing).await?;
    info!(oid = %detail.oid(), total = %detail.order.total, vendors = detail.vendors.len(), "order placed");
    s.events.publish(DomainEvent::Order(OrderEvent::Placed {
        oid: detail.order.oid.clone(),
        buyer_id: detail.order.buyer_id,
        vendors: detail.vendors.clone(),
        total: detail.order.total,
    })).await;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn list_orders(State(s): State<AppState>, auth: AuthUser) -> Result<Json<Vec<CartOrder>>> {
    Ok(Json(s.store.orders_for_buyer(auth.user_id).await?))
}

pub async fn order_detail(
    State(s): State<AppState>,
    caller: Option<AuthUser>,
    Path(oid): Path<String>,
) -> Result<Json<OrderDetail>> {
    let detail = load_order(&s, &oid).await?;
    if ensure_buyer(&detail, caller).is_err() {
        // Vendors taking part in the order may read it too.
        let vendor = match caller {
            Some(auth) => s.store.vendor_for_user(auth.user_id).await?,
            None => None,
        };
        if !vendor.is_some_and(|v| detail.involves_vendor(v.id)) {
            ensure_buyer(&detail, caller)?;
        }
    }
    Ok(Json(detail))
}

#[instrument(skip(s, auth, req))]
pub async fn apply_coupon(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(oid): Path<String>,
    Json(req): Json<CouponRequest>,
) -> Result<Json<CouponApplied>> {
    req.validate()?;
    let detail = load_order(&s, &oid).await?;
    if detail.order.buyer_id != Some(auth.user_id) {
        return Err(EcommerceError::Forbidden("Only the buyer may apply a coupon".into()));
    }
    let code = req.code.trim();
    let (order, saved) = s.store.redeem_coupon(&oid, code, auth.user_id).await?;
    info!(oid = %oid, code, saved = %saved, "coupon applied");
    s.events.publish(DomainEvent::Order(OrderEvent::CouponApplied { oid: oid.clone(), code: code.to_string(), saved })).await;
    Ok(Json(CouponApplied { message: "Coupon Activated", saved, order }))
}

pub async fn eligible_coupons(State(s): State<AppState>, auth: AuthUser, Path(oid): Path<String>) -> Result<Json<Vec<Coupon>>> {
    let detail = load_order(&s, &oid).await?;
    ensure_buyer(&detail, Some(auth))?;
    Ok(Json(s.store.eligible_coupons(auth.user_id, &detail.vendors).await?))
}

pub const PAYMENT_SECRET_HEADER: &str = "x-payment-secret";

/// With a configured secret only the gateway may report payments; without one the buyer rule applies.
fn ensure_payment_caller(secret: Option<&str>, headers: &HeaderMap, detail: &OrderDetail, caller: Option<AuthUser>) -> Result<()> {
    match secret {
        Some(secret) => {
            let presented = headers.get(PAYMENT_SECRET_HEADER).and_then(|v| v.to_str().ok());
            if presented == Some(secret) {
                Ok(())
            } else {
                Err(EcommerceError::Unauthorized("Payment gateway secret required".into()))
            }
        }
        None => ensure_buyer(detail, caller),
    }
}

/// Payment callback; the body carries the status reported by the gateway.
pub async fn update_payment(
    State(s): State<AppState>,
    caller: Option<AuthUser>,
    headers: HeaderMap,
    Path(oid): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<OrderDetail>> {
    let detail = load_order(&s, &oid).await?;
    ensure_payment_caller(s.payment_secret.as_deref(), &headers, &detail, caller)?;
    let detail = s.store.set_payment_status(&oid, req.status).await?;
    info!(oid = %oid, status = req.status.as_str(), "payment status changed");
    s.events.publish(DomainEvent::Order(OrderEvent::PaymentChanged { oid, status: req.status })).await;
    Ok(Json(detail))
}
