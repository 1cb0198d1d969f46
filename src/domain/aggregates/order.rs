//! Order Aggregate
//!
//! A [`CartOrder`] is one checkout, possibly spanning several vendors, with one
//! [`CartOrderItem`] per cart line. Monetary columns on the order are rollups
//! of the item columns taken at checkout and adjusted only by coupons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::aggregates::cart::{CartError, CartItem};
use crate::domain::aggregates::coupon::Coupon;
use crate::domain::aggregates::engagement::Notification;
use crate::domain::value_objects::{Money, ShortId, UnknownVariant};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus { #[default] Pending, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "Pending", Self::Shipped => "Shipped", Self::Delivered => "Delivered", Self::Cancelled => "Cancelled" }
    }

    /// Pending -> Shipped -> Delivered, with Cancelled reachable from Pending and Shipped.
    pub fn can_become(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!((self, next), (Pending, Shipped) | (Shipped, Delivered) | (Pending, Cancelled) | (Shipped, Cancelled))
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            _ => Err(UnknownVariant { kind: "order status", value: s.to_string() }),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownVariant;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus { #[default] Pending, Processing, Completed, Failed }

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "Pending", Self::Processing => "Processing", Self::Completed => "Completed", Self::Failed => "Failed" }
    }

    /// Pending -> Processing -> Completed | Failed; a failed payment may be retried.
    pub fn can_become(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!((self, next), (Pending, Processing) | (Processing, Completed) | (Processing, Failed) | (Failed, Processing))
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            _ => Err(UnknownVariant { kind: "payment status", value: s.to_string() }),
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownVariant;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

/// Buyer contact and shipping address captured at checkout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BillingDetails {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartOrder {
    pub id: Uuid,
    pub oid: String,
    pub buyer_id: Option<Uuid>,
    pub sub_total: Money,
    pub shipping_amount: Money,
    pub tax_fee: Money,
    pub service_fee: Money,
    pub total: Money,
    #[sqlx(try_from = "String")]
    pub payment_status: PaymentStatus,
    #[sqlx(try_from = "String")]
    pub order_status: OrderStatus,
    pub initial_cost: Money,
    pub saved: Money,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartOrderItem {
    pub id: Uuid,
    pub oid: String,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    /// Kept as text to match the stored column; see [`CartOrderItem::quantity`].
    pub qty: String,
    pub price: Money,
    pub sub_total: Money,
    pub shipping_amount: Money,
    pub tax_fee: Money,
    pub service_fee: Money,
    pub total: Money,
    pub country: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub initial_cost: Money,
    pub saved: Money,
    pub date: DateTime<Utc>,
}

impl CartOrderItem {
    pub fn quantity(&self) -> Result<u32, OrderError> {
        self.qty.trim().parse().map_err(|_| OrderError::MalformedQuantity(self.qty.clone()))
    }
}

/// A cart row together with the vendor of its product.
#[derive(Clone, Debug)]
pub struct CheckoutLine {
    pub item: CartItem,
    pub vendor_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: CartOrder,
    pub vendors: Vec<Uuid>,
    pub items: Vec<CartOrderItem>,
}

impl OrderDetail {
    /// Snapshots cart lines into a pending order. Totals are the sums of the line totals.
    pub fn from_cart(lines: &[CheckoutLine], buyer_id: Option<Uuid>, billing: BillingDetails) -> Result<Self, CartError> {
        if lines.is_empty() { return Err(CartError::EmptyCart); }
        let now = Utc::now();
        let order_id = Uuid::now_v7();
        let items: Vec<CartOrderItem> = lines.iter().map(|CheckoutLine { item, vendor_id }| CartOrderItem {
            id: Uuid::now_v7(),
            oid: ShortId::generate().into_inner(),
            order_id,
            product_id: item.product_id,
            vendor_id: *vendor_id,
            qty: item.qty.to_string(),
            price: item.price,
            sub_total: item.sub_total,
            shipping_amount: item.shipping_amount,
            tax_fee: item.tax_fee,
            service_fee: item.service_fee,
            total: item.total,
            country: item.country.clone(),
            size: item.size.clone(),
            color: item.color.clone(),
            initial_cost: item.total,
            saved: Money::ZERO,
            date: now,
        }).collect();
        let vendors: BTreeSet<Uuid> = items.iter().map(|i| i.vendor_id).collect();
        let total: Money = items.iter().map(|i| i.total).sum();
        if !total.in_range() { return Err(CartError::OrderTotalOutOfRange); }
        let order = CartOrder {
            id: order_id,
            oid: ShortId::generate().into_inner(),
            buyer_id,
            sub_total: items.iter().map(|i| i.sub_total).sum(),
            shipping_amount: items.iter().map(|i| i.shipping_amount).sum(),
            tax_fee: items.iter().map(|i| i.tax_fee).sum(),
            service_fee: items.iter().map(|i| i.service_fee).sum(),
            total,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            initial_cost: total,
            saved: Money::ZERO,
            full_name: billing.full_name,
            email: billing.email,
            mobile: billing.mobile,
            address: billing.address,
            city: billing.city,
            state: billing.state,
            country: billing.country,
            date: now,
        };
        Ok(Self { order, vendors: vendors.into_iter().collect(), items })
    }

    pub fn oid(&self) -> &str { &self.order.oid }

    pub fn involves_vendor(&self, vendor_id: Uuid) -> bool { self.vendors.contains(&vendor_id) }

    /// Discounts every item sold by the coupon's vendor and rolls the savings into the order.
    pub fn apply_coupon(&mut self, coupon: &Coupon) -> Result<Money, OrderError> {
        if self.order.payment_status != PaymentStatus::Pending {
            return Err(OrderError::AlreadyPaid);
        }
        if !self.involves_vendor(coupon.vendor_id) {
            return Err(OrderError::CouponNotApplicable);
        }
        let mut saved = Money::ZERO;
        for item in self.items.iter_mut().filter(|i| i.vendor_id == coupon.vendor_id) {
            let discount = coupon.discount_on(item.total).ok_or(OrderError::AmountOutOfRange)?;
            item.total -= discount;
            item.sub_total -= discount;
            item.saved += discount;
            saved += discount;
        }
        self.order.total -= saved;
        self.order.sub_total -= saved;
        self.order.saved += saved;
        Ok(saved)
    }

    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        let current = self.order.order_status;
        if !current.can_become(next) {
            return Err(OrderError::InvalidTransition { from: current.as_str(), to: next.as_str() });
        }
        self.order.order_status = next;
        Ok(())
    }

    pub fn transition_payment(&mut self, next: PaymentStatus) -> Result<(), OrderError> {
        let current = self.order.payment_status;
        if !current.can_become(next) {
            return Err(OrderError::InvalidTransition { from: current.as_str(), to: next.as_str() });
        }
        self.order.payment_status = next;
        Ok(())
    }

    /// Product quantities to put back on the shelf when the order is cancelled.
    pub fn restock_lines(&self) -> Result<Vec<(Uuid, u32)>, OrderError> {
        self.items.iter().map(|i| Ok((i.product_id, i.quantity()?))).collect()
    }

    /// One notification for the buyer and one per item for the selling vendor.
    pub fn completion_notifications(&self) -> Vec<Notification> {
        let buyer = self.order.buyer_id
            .map(|user_id| Notification::new(Some(user_id), None, Some(self.order.id), None));
        buyer.into_iter()
            .chain(self.items.iter().map(|i| Notification::new(None, Some(i.vendor_id), Some(self.order.id), Some(i.id))))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum OrderError {
    InvalidTransition { from: &'static str, to: &'static str },
    CouponNotApplicable,
    AlreadyPaid,
    MalformedQuantity(String),
    AmountOutOfRange,
}
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTransition { from, to } => write!(f, "Cannot move from {} to {}", from, to),
            Self::CouponNotApplicable => write!(f, "Coupon does not apply to any item in this order"),
            Self::AlreadyPaid => write!(f, "Payment already started"),
            Self::MalformedQuantity(q) => write!(f, "Malformed item quantity '{}'", q),
            Self::AmountOutOfRange => write!(f, "Order amount is out of range"),
        }
    }
}
