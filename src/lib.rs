//! Storefront - multi-vendor e-commerce backend
//!
//! REST API over a relational store for a marketplace where several vendors
//! sell through one checkout.
//!
//! ## Features
//! - Product catalog (categories, products, gallery, specifications, sizes, colors)
//! - Session carts with per-line shipping, service fee and tax pricing
//! - Atomic checkout into multi-vendor orders
//! - Vendor coupons redeemable once per user
//! - Guarded order and payment status transitions
//! - Reviews, FAQs, wishlists and notifications

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod publisher;
pub mod store;

use thiserror::Error;

use crate::domain::aggregates::{CartError, CouponError, OrderError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid coupon")]
    InvalidCoupon,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<sqlx::Error> for EcommerceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                EcommerceError::Conflict(db.constraint().unwrap_or("unique constraint").to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                EcommerceError::Validation(format!("unknown reference ({})", db.constraint().unwrap_or("foreign key")))
            }
            sqlx::Error::Database(db) if db.is_check_violation() => {
                EcommerceError::Validation(format!("value out of range ({})", db.constraint().unwrap_or("check")))
            }
            sqlx::Error::RowNotFound => EcommerceError::NotFound("Row"),
            _ => EcommerceError::StorageError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(errs: validator::ValidationErrors) -> Self {
        EcommerceError::Validation(errs.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
