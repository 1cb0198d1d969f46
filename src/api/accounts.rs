use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use super::AppState;
use crate::auth::{hash_password, verify_password, AuthUser, TokenKind, TokenPair};
use crate::domain::aggregates::{Profile, ProfileUpdate, User};
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 100))]
    pub phone: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match = "password")]
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest { pub email: String, pub password: String }

#[derive(Debug, Deserialize)]
pub struct RefreshRequest { pub refresh: String }

pub async fn register(State(s): State<AppState>, Json(req): Json<RegisterRequest>) -> Result<(StatusCode, Json<User>)> {
    req.validate()?;
    if s.store.find_user_by_email(&req.email).await?.is_some() {
        return Err(EcommerceError::Conflict("A user with that email already exists".into()));
    }
    let user = User::new(&req.email, &req.full_name, req.phone, hash_password(&req.password)?);
    let user = s.store.create_user(user).await?;
    info!(user_id = %user.id, username = %user.username, "registered user");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn token(State(s): State<AppState>, Json(req): Json<TokenRequest>) -> Result<Json<TokenPair>> {
    let denied = || EcommerceError::Unauthorized("No active account found with the given credentials".into());
    let user = s.store.find_user_by_email(&req.email).await?.ok_or_else(denied)?;
    if !verify_password(&req.password, &user.password_hash) {
        return Err(denied());
    }
    Ok(Json(s.jwt.issue_pair(user.id)?))
}

pub async fn refresh(State(s): State<AppState>, Json(req): Json<RefreshRequest>) -> Result<Json<Value>> {
    let claims = s.jwt.verify(&req.refresh, TokenKind::Refresh)?;
    if s.store.find_user(claims.sub).await?.is_none() {
        return Err(EcommerceError::Unauthorized("User no longer exists".into()));
    }
    Ok(Json(json!({ "access": s.jwt.issue(claims.sub, TokenKind::Access)? })))
}

pub async fn profile(State(s): State<AppState>, auth: AuthUser) -> Result<Json<Profile>> {
    Ok(Json(s.store.profile(auth.user_id).await?))
}

pub async fn update_profile(State(s): State<AppState>, auth: AuthUser, Json(update): Json<ProfileUpdate>) -> Result<Json<Profile>> {
    Ok(Json(s.store.update_profile(auth.user_id, update).await?))
}
