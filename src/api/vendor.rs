//! Vendor dashboard: products, coupons, order fulfilment and moderation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{require_vendor, AppState};
use crate::auth::AuthUser;
use crate::domain::aggregates::{
    Coupon, Notification, OrderDetail, OrderStatus, ProductDetail, ProductDraft, ProductFaq, ProductStatus, Review, Vendor,
};
use crate::domain::events::{DomainEvent, OrderEvent, ProductEvent};
use crate::domain::value_objects::Money;
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct VendorRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub mobile: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpecificationInput { pub title: String, pub content: String }

#[derive(Debug, Deserialize, serde::Serialize)]
pub struct SizeInput { pub name: String, #[serde(default)] pub price: Money }

/// Amounts must fit the `NUMERIC(12, 2)` columns and may not be negative.
fn storable_amount(amount: &Money) -> std::result::Result<(), ValidationError> {
    if amount.in_range() {
        return Ok(());
    }
    let mut err = ValidationError::new("amount_range");
    err.message = Some(format!("Amount must be between 0 and {}", Money::MAX).into());
    Err(err)
}

fn storable_size_prices(sizes: &[SizeInput]) -> std::result::Result<(), ValidationError> {
    sizes.iter().try_for_each(|s| storable_amount(&s.price))
}

#[derive(Debug, Deserialize)]
pub struct ColorInput { pub name: String, #[serde(default)] pub color_code: String }

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(custom = "storable_amount")]
    pub price: Money,
    #[validate(custom = "storable_amount")]
    #[serde(default)]
    pub old_price: Money,
    #[validate(custom = "storable_amount")]
    #[serde(default)]
    pub shipping_amount: Money,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock_qty: i32,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub featured: bool,
    pub slug: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub specifications: Vec<SpecificationInput>,
    #[validate(custom = "storable_size_prices")]
    #[serde(default)]
    pub sizes: Vec<SizeInput>,
    #[serde(default)]
    pub colors: Vec<ColorInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CouponCreateRequest {
    #[validate(length(min = 1, max = 1000))]
    pub code: String,
    #[validate(range(min = 1, max = 100))]
    pub discount: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest { pub status: OrderStatus }

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub reply: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(length(min = 1, max = 5000))]
    pub answer: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool { true }

/// 403 unless the product behind a review or FAQ is sold by `vendor`.
async fn ensure_sells(s: &AppState, vendor: &Vendor, product_id: Uuid) -> Result<()> {
    let product = s.store.product(product_id).await?.ok_or(EcommerceError::ProductNotFound)?;
    if product.vendor_id != vendor.id {
        return Err(EcommerceError::Forbidden("Product belongs to another vendor".into()));
    }
    Ok(())
}

pub async fn register(State(s): State<AppState>, auth: AuthUser, Json(req): Json<VendorRequest>) -> Result<(StatusCode, Json<Vendor>)> {
    req.validate()?;
    if s.store.vendor_for_user(auth.user_id).await?.is_some() {
        return Err(EcommerceError::Conflict("Vendor profile already exists".into()));
    }
    let vendor = s.store.create_vendor(Vendor::new(auth.user_id, &req.name, req.description, req.mobile)).await?;
    info!(vendor_id = %vendor.id, slug = %vendor.slug, "vendor registered");
    Ok((StatusCode::CREATED, Json(vendor)))
}

pub async fn create_product(State(s): State<AppState>, auth: AuthUser, Json(req): Json<ProductRequest>) -> Result<(StatusCode, Json<ProductDetail>)> {
    req.validate()?;
    let vendor = require_vendor(&s, auth.user_id).await?;
    let draft = ProductDraft {
        vendor_id: vendor.id,
        category_id: req.category_id,
        title: req.title,
        description: req.description,
        image: req.image,
        price: req.price,
        old_price: req.old_price,
        shipping_amount: req.shipping_amount,
        stock_qty: req.stock_qty,
        status: req.status,
        featured: req.featured,
        slug: req.slug,
        gallery: req.gallery,
        specifications: req.specifications.into_iter().map(|s| (s.title, s.content)).collect(),
        sizes: req.sizes.into_iter().map(|s| (s.name, s.price)).collect(),
        colors: req.colors.into_iter().map(|c| (c.name, c.color_code)).collect(),
    };
    let detail = s.store.create_product(draft).await?;
    let p = &detail.product;
    info!(pid = %p.pid, slug = %p.slug, vendor_id = %vendor.id, "product created");
    s.events.publish(DomainEvent::Product(ProductEvent::Created { pid: p.pid.clone(), slug: p.slug.clone(), vendor_id: vendor.id })).await;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn list_coupons(State(s): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Coupon>>> {
    let vendor = require_vendor(&s, auth.user_id).await?;
    Ok(Json(s.store.vendor_coupons(vendor.id).await?))
}

pub async fn create_coupon(State(s): State<AppState>, auth: AuthUser, Json(req): Json<CouponCreateRequest>) -> Result<(StatusCode, Json<Coupon>)> {
    req.validate()?;
    let vendor = require_vendor(&s, auth.user_id).await?;
    let coupon = Coupon::new(vendor.id, &req.code, req.discount, req.active)?;
    Ok((StatusCode::CREATED, Json(s.store.create_coupon(coupon).await?)))
}

pub async fn list_orders(State(s): State<AppState>, auth: AuthUser) -> Result<Json<Vec<OrderDetail>>> {
    let vendor = require_vendor(&s, auth.user_id).await?;
    Ok(Json(s.store.orders_for_vendor(vendor.id).await?))
}

pub async fn update_order_status(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(oid): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<OrderDetail>> {
    let vendor = require_vendor(&s, auth.user_id).await?;
    let detail = s.store.order(&oid).await?.ok_or(EcommerceError::OrderNotFound)?;
    if !detail.involves_vendor(vendor.id) {
        return Err(EcommerceError::Forbidden("Vendor is not part of this order".into()));
    }
    let detail = s.store.set_order_status(&oid, req.status).await?;
    info!(oid = %oid, status = req.status.as_str(), vendor_id = %vendor.id, "order status changed");
    s.events.publish(DomainEvent::Order(OrderEvent::StatusChanged { oid, status: req.status })).await;
    Ok(Json(detail))
}

pub async fn moderate_review(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ModerationRequest>,
) -> Result<Json<Review>> {
    let vendor = require_vendor(&s, auth.user_id).await?;
    let review = s.store.review(id).await?.ok_or(EcommerceError::NotFound("Review"))?;
    ensure_sells(&s, &vendor, review.product_id).await?;
    Ok(Json(s.store.moderate_review(id, req.reply, req.active).await?))
}

pub async fn answer_faq(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<ProductFaq>> {
    req.validate()?;
    let vendor = require_vendor(&s, auth.user_id).await?;
    let faq = s.store.faq(id).await?.ok_or(EcommerceError::NotFound("FAQ"))?;
    ensure_sells(&s, &vendor, faq.product_id).await?;
    Ok(Json(s.store.answer_faq(id, req.answer, req.active).await?))
}

pub async fn notifications(State(s): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Notification>>> {
    let vendor = require_vendor(&s, auth.user_id).await?;
    Ok(Json(s.store.vendor_notifications(vendor.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn request(body: serde_json::Value) -> ProductRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_product_amounts_validated() {
        assert!(request(json!({"title": "Shoe", "price": "9999999999.99"})).validate().is_ok());
        assert!(request(json!({"title": "Shoe", "price": "79228162514264337593543950335"})).validate().is_err());
        assert!(request(json!({"title": "Shoe", "price": "-1.00"})).validate().is_err());
        assert!(request(json!({"title": "Shoe", "price": "10", "shipping_amount": "-5"})).validate().is_err());
        assert!(request(json!({"title": "Shoe", "price": "10", "old_price": "10000000000"})).validate().is_err());
        let sized = request(json!({"title": "Shoe", "price": "10", "sizes": [{"name": "XL", "price": "-3"}]}));
        assert!(sized.validate().is_err());
    }

    #[test]
    fn test_storable_amount() {
        assert!(storable_amount(&Money::ZERO).is_ok());
        assert!(storable_amount(&Money::new(dec!(-0.01))).is_err());
        assert!(storable_amount(&Money::MAX).is_ok());
    }
}
