//! Domain events
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{OrderStatus, PaymentStatus};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Product(ProductEvent::Created { .. }) => "ecommerce.product.created",
            DomainEvent::Order(OrderEvent::Placed { .. }) => "ecommerce.order.placed",
            DomainEvent::Order(OrderEvent::CouponApplied { .. }) => "ecommerce.order.coupon_applied",
            DomainEvent::Order(OrderEvent::StatusChanged { .. }) => "ecommerce.order.status_changed",
            DomainEvent::Order(OrderEvent::PaymentChanged { .. }) => "ecommerce.order.payment_changed",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { pid: String, slug: String, vendor_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { oid: String, buyer_id: Option<Uuid>, vendors: Vec<Uuid>, total: Money },
    CouponApplied { oid: String, code: String, saved: Money },
    StatusChanged { oid: String, status: OrderStatus },
    PaymentChanged { oid: String, status: PaymentStatus },
}
