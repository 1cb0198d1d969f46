//! Reviews, FAQs, wishlists and notifications.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::catalog::product_id_for;
use super::AppState;
use crate::auth::AuthUser;
use crate::domain::aggregates::{Notification, ProductFaq, Review, Wishlist};
use crate::store::WishlistToggle;
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(length(min = 1, max = 5000))]
    pub review: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FaqRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WishlistRequest { pub product_id: Uuid }

#[derive(Debug, Serialize)]
pub struct WishlistChanged { pub status: WishlistToggle, pub product_id: Uuid }

pub async fn list_reviews(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<Vec<Review>>> {
    let product_id = product_id_for(&s, &slug).await?;
    Ok(Json(s.store.active_reviews(product_id).await?))
}

pub async fn create_review(
    State(s): State<AppState>,
    auth: AuthUser,
    Path(slug): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    req.validate()?;
    let product_id = product_id_for(&s, &slug).await?;
    let review = s.store.create_review(Review::new(product_id, auth.user_id, req.review, req.rating)).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_faqs(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<Vec<ProductFaq>>> {
    let product_id = product_id_for(&s, &slug).await?;
    Ok(Json(s.store.active_faqs(product_id).await?))
}

pub async fn create_faq(
    State(s): State<AppState>,
    caller: Option<AuthUser>,
    Path(slug): Path<String>,
    Json(req): Json<FaqRequest>,
) -> Result<(StatusCode, Json<ProductFaq>)> {
    req.validate()?;
    let product_id = product_id_for(&s, &slug).await?;
    let faq = ProductFaq::new(product_id, caller.map(|a| a.user_id), req.email, req.question);
    Ok((StatusCode::CREATED, Json(s.store.create_faq(faq).await?)))
}

pub async fn wishlist(State(s): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Wishlist>>> {
    Ok(Json(s.store.wishlist(auth.user_id).await?))
}

pub async fn toggle_wishlist(State(s): State<AppState>, auth: AuthUser, Json(req): Json<WishlistRequest>) -> Result<Json<WishlistChanged>> {
    if s.store.product(req.product_id).await?.is_none() {
        return Err(EcommerceError::ProductNotFound);
    }
    let status = s.store.toggle_wishlist(auth.user_id, req.product_id).await?;
    Ok(Json(WishlistChanged { status, product_id: req.product_id }))
}

pub async fn notifications(State(s): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Notification>>> {
    Ok(Json(s.store.unseen_notifications(auth.user_id).await?))
}

pub async fn mark_seen(State(s): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Notification>> {
    Ok(Json(s.store.mark_notification_seen(auth.user_id, id).await?))
}
