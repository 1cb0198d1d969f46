//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::catalog::ProductDetail;
use crate::domain::value_objects::Money;

/// Fee and tax rates applied when a line is added to a cart.
#[derive(Clone, Debug)]
pub struct PricingPolicy {
    pub service_fee_percent: Decimal,
    pub default_tax_rate: Decimal,
    /// Percent tax keyed by lower-cased country name.
    pub tax_rates: HashMap<String, Decimal>,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self { service_fee_percent: Decimal::TEN, default_tax_rate: Decimal::ZERO, tax_rates: HashMap::new() }
    }
}

impl PricingPolicy {
    pub fn tax_rate(&self, country: Option<&str>) -> Decimal {
        country
            .and_then(|c| self.tax_rates.get(&c.trim().to_lowercase()))
            .copied()
            .unwrap_or(self.default_tax_rate)
    }

    /// `None` when any amount of the line would leave the storable range.
    pub fn price_line(&self, unit_price: Money, qty: u32, shipping_per_unit: Money, country: Option<&str>) -> Option<LineAmounts> {
        let sub_total = unit_price.times(qty)?;
        let shipping_amount = shipping_per_unit.times(qty)?;
        let service_fee = sub_total.percent(self.service_fee_percent)?;
        let tax_fee = sub_total.percent(self.tax_rate(country))?;
        let total = sub_total.checked_add(shipping_amount)?.checked_add(service_fee)?.checked_add(tax_fee)?;
        let amounts = LineAmounts { price: unit_price, sub_total, shipping_amount, service_fee, tax_fee, total };
        [unit_price, sub_total, shipping_amount, service_fee, tax_fee, total]
            .iter()
            .all(Money::in_range)
            .then_some(amounts)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineAmounts {
    pub price: Money,
    pub sub_total: Money,
    pub shipping_amount: Money,
    pub service_fee: Money,
    pub tax_fee: Money,
    pub total: Money,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: String,
    pub product_id: Uuid,
    pub user_id: Option<Uuid>,
    pub qty: i32,
    pub price: Money,
    pub sub_total: Money,
    pub shipping_amount: Money,
    pub service_fee: Money,
    pub tax_fee: Money,
    pub total: Money,
    pub country: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub date: DateTime<Utc>,
}

/// What the client asks to put in the cart.
#[derive(Clone, Debug)]
pub struct CartLine {
    pub cart_id: String,
    pub user_id: Option<Uuid>,
    pub qty: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub country: Option<String>,
}

impl CartItem {
    /// Prices `line` against the product; the chosen size overrides the list price when it carries one.
    pub fn priced(product: &ProductDetail, line: CartLine, policy: &PricingPolicy) -> Result<Self, CartError> {
        if line.qty == 0 { return Err(CartError::InvalidQuantity); }
        if line.cart_id.trim().is_empty() { return Err(CartError::MissingCartId); }
        let p = &product.product;
        if !p.is_purchasable() { return Err(CartError::ProductUnavailable(p.slug.clone())); }
        if i64::from(line.qty) > i64::from(p.stock_qty) {
            return Err(CartError::InsufficientStock { slug: p.slug.clone(), available: p.stock_qty });
        }
        let unit_price = line.size.as_deref()
            .and_then(|name| product.size_named(name))
            .map(|s| s.price)
            .filter(Money::is_positive)
            .unwrap_or(p.price);
        let amounts = policy.price_line(unit_price, line.qty, p.shipping_amount, line.country.as_deref())
            .ok_or(CartError::AmountOutOfRange)?;
        Ok(Self {
            id: Uuid::now_v7(),
            cart_id: line.cart_id,
            product_id: p.id,
            user_id: line.user_id,
            qty: line.qty as i32,
            price: amounts.price,
            sub_total: amounts.sub_total,
            shipping_amount: amounts.shipping_amount,
            service_fee: amounts.service_fee,
            tax_fee: amounts.tax_fee,
            total: amounts.total,
            country: line.country,
            size: line.size,
            color: line.color,
            date: Utc::now(),
        })
    }

    /// Replaces quantity, options and amounts of an existing line, keeping its id.
    pub fn replace_with(&mut self, other: CartItem) {
        let id = self.id;
        *self = other;
        self.id = id;
    }
}

/// Column sums over all rows of one cart.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub items: usize,
    pub sub_total: Money,
    pub shipping_amount: Money,
    pub service_fee: Money,
    pub tax_fee: Money,
    pub total: Money,
}

impl CartSummary {
    pub fn of(items: &[CartItem]) -> Self {
        Self {
            items: items.len(),
            sub_total: items.iter().map(|i| i.sub_total).sum(),
            shipping_amount: items.iter().map(|i| i.shipping_amount).sum(),
            service_fee: items.iter().map(|i| i.service_fee).sum(),
            tax_fee: items.iter().map(|i| i.tax_fee).sum(),
            total: items.iter().map(|i| i.total).sum(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CartError {
    InvalidQuantity,
    MissingCartId,
    EmptyCart,
    ItemNotFound,
    ProductUnavailable(String),
    InsufficientStock { slug: String, available: i32 },
    AmountOutOfRange,
    OrderTotalOutOfRange,
}
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity => write!(f, "Quantity must be at least 1"),
            Self::MissingCartId => write!(f, "Cart id is required"),
            Self::EmptyCart => write!(f, "Cart is empty"),
            Self::ItemNotFound => write!(f, "Item not found"),
            Self::ProductUnavailable(slug) => write!(f, "Product '{}' is not available", slug),
            Self::InsufficientStock { slug, available } => write!(f, "Only {} of '{}' left in stock", available, slug),
            Self::AmountOutOfRange => write!(f, "Line amount is out of range"),
            Self::OrderTotalOutOfRange => write!(f, "Order total is out of range"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::catalog::{ProductDraft, ProductStatus};
    use rust_decimal_macros::dec;

    fn shoe(stock: i32) -> ProductDetail {
        ProductDraft {
            title: "Red Shoe".into(),
            price: Money::new(dec!(50)),
            shipping_amount: Money::new(dec!(5)),
            stock_qty: stock,
            sizes: vec![("XL".into(), Money::new(dec!(60))), ("S".into(), Money::ZERO)],
            ..Default::default()
        }
        .into_detail()
    }

    fn line(qty: u32, size: Option<&str>, country: Option<&str>) -> CartLine {
        CartLine { cart_id: "cart-1".into(), user_id: None, qty, size: size.map(Into::into), color: None, country: country.map(Into::into) }
    }

    fn policy() -> PricingPolicy {
        PricingPolicy { tax_rates: HashMap::from([("nigeria".to_string(), dec!(7.5))]), ..Default::default() }
    }

    #[test]
    fn test_cart_line_pricing() {
        let item = CartItem::priced(&shoe(10), line(2, None, Some("Nigeria")), &policy()).unwrap();
        assert_eq!(item.sub_total.amount(), dec!(100.00));
        assert_eq!(item.shipping_amount.amount(), dec!(10.00));
        assert_eq!(item.service_fee.amount(), dec!(10.00));
        assert_eq!(item.tax_fee.amount(), dec!(7.50));
        assert_eq!(item.total.amount(), dec!(127.50));
        assert_eq!(item.total, item.sub_total + item.shipping_amount + item.service_fee + item.tax_fee);
    }

    #[test]
    fn test_size_price_overrides_list_price() {
        let xl = CartItem::priced(&shoe(10), line(1, Some("XL"), None), &policy()).unwrap();
        assert_eq!(xl.price.amount(), dec!(60.00));
        let small = CartItem::priced(&shoe(10), line(1, Some("S"), None), &policy()).unwrap();
        assert_eq!(small.price.amount(), dec!(50.00));
        assert_eq!(small.tax_fee, Money::ZERO);
    }

    #[test]
    fn test_cart_line_rejections() {
        assert!(matches!(CartItem::priced(&shoe(10), line(0, None, None), &policy()), Err(CartError::InvalidQuantity)));
        assert!(matches!(CartItem::priced(&shoe(1), line(2, None, None), &policy()), Err(CartError::InsufficientStock { available: 1, .. })));
        let mut draft = shoe(5);
        draft.product.status = ProductStatus::Draft;
        assert!(matches!(CartItem::priced(&draft, line(1, None, None), &policy()), Err(CartError::ProductUnavailable(_))));
    }

    #[test]
    fn test_line_amount_out_of_range() {
        let mut pricey = shoe(10);
        pricey.product.price = Money::MAX;
        assert!(CartItem::priced(&pricey, line(1, None, None), &policy()).is_err());
        pricey.product.price = Money::new(Decimal::MAX);
        assert!(matches!(CartItem::priced(&pricey, line(2, None, None), &policy()), Err(CartError::AmountOutOfRange)));
        let ok = policy().price_line(Money::new(dec!(1000)), 1000, Money::ZERO, None).unwrap();
        assert_eq!(ok.total.amount(), dec!(1100000.00));
    }

    #[test]
    fn test_cart_summary() {
        let a = CartItem::priced(&shoe(10), line(1, None, None), &policy()).unwrap();
        let b = CartItem::priced(&shoe(10), line(3, None, None), &policy()).unwrap();
        let summary = CartSummary::of(&[a.clone(), b.clone()]);
        assert_eq!(summary.items, 2);
        assert_eq!(summary.total, a.total + b.total);
        assert_eq!(summary.sub_total.amount(), dec!(200.00));
    }
}
