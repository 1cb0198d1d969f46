use axum::{
    extract::{Path, State},
    Json,
};

use super::AppState;
use crate::domain::aggregates::{Category, ProductDetail};
use crate::{EcommerceError, Result};

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.store.list_categories().await?))
}

pub async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<ProductDetail>>> {
    Ok(Json(s.store.list_products().await?))
}

pub async fn product_detail(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<ProductDetail>> {
    s.store.product_by_slug(&slug).await?.map(Json).ok_or(EcommerceError::ProductNotFound)
}

/// Resolves a product slug from the path, 404 when unknown.
pub(crate) async fn product_id_for(s: &AppState, slug: &str) -> Result<uuid::Uuid> {
    s.store.product_by_slug(slug).await?.map(|d| d.product.id).ok_or(EcommerceError::ProductNotFound)
}
