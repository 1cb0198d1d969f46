//! Vendor coupons

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub code: String,
    /// Whole percent taken off each matching order item.
    pub discount: i32,
    pub active: bool,
    pub date: DateTime<Utc>,
}

impl Coupon {
    pub fn new(vendor_id: Uuid, code: &str, discount: i32, active: bool) -> Result<Self, CouponError> {
        let code = code.trim().to_string();
        if code.is_empty() { return Err(CouponError::EmptyCode); }
        if !(1..=100).contains(&discount) { return Err(CouponError::InvalidDiscount(discount)); }
        Ok(Self { id: Uuid::now_v7(), vendor_id, code, discount, active, date: Utc::now() })
    }

    pub fn discount_on(&self, amount: Money) -> Option<Money> {
        amount.percent(Decimal::from(self.discount))
    }

    /// Redeemable when active and not yet used by this user.
    pub fn ensure_redeemable(&self, already_redeemed: bool) -> Result<(), CouponError> {
        if !self.active { return Err(CouponError::Inactive); }
        if already_redeemed { return Err(CouponError::AlreadyRedeemed); }
        Ok(())
    }
}

/// The coupon a redemption of `code` refers to: one of the order's vendors first, then active ones.
pub fn pick<'a>(coupons: impl IntoIterator<Item = &'a Coupon>, code: &str, involved: impl Fn(Uuid) -> bool) -> Option<&'a Coupon> {
    coupons.into_iter()
        .filter(|c| c.code == code)
        .min_by_key(|c| (!involved(c.vendor_id), !c.active))
}

/// Active coupons of `vendors` the user has not redeemed yet.
pub fn eligible<'a>(
    coupons: impl IntoIterator<Item = &'a Coupon>,
    vendors: &[Uuid],
    redeemed: &HashSet<Uuid>,
) -> Vec<Coupon> {
    coupons.into_iter()
        .filter(|c| c.active && vendors.contains(&c.vendor_id) && !redeemed.contains(&c.id))
        .cloned()
        .collect()
}

#[derive(Debug, Clone)]
pub enum CouponError { EmptyCode, InvalidDiscount(i32), Inactive, AlreadyRedeemed }
impl std::error::Error for CouponError {}
impl std::fmt::Display for CouponError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCode => write!(f, "Coupon code is required"),
            Self::InvalidDiscount(d) => write!(f, "Discount must be between 1 and 100, got {}", d),
            Self::Inactive => write!(f, "Coupon is not active"),
            Self::AlreadyRedeemed => write!(f, "Coupon already used"),
        }
    }
}
