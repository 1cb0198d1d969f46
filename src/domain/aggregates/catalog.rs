//! Catalog: categories, products and their per-product children

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::value_objects::{slugify, Money, ShortId, UnknownVariant};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryTitle { #[default] Men, Women, Teen, Unisex }

impl CategoryTitle {
    pub const ALL: [CategoryTitle; 4] = [Self::Men, Self::Women, Self::Teen, Self::Unisex];

    pub fn as_str(&self) -> &'static str {
        match self { Self::Men => "MEN", Self::Women => "WOMEN", Self::Teen => "TEEN", Self::Unisex => "UNISEX" }
    }
}

impl FromStr for CategoryTitle {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant { kind: "category title", value: s.to_string() })
    }
}

impl TryFrom<String> for CategoryTitle {
    type Error = UnknownVariant;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub title: CategoryTitle,
    pub image: Option<String>,
    pub active: bool,
    pub slug: String,
}

impl Category {
    pub fn new(title: CategoryTitle) -> Self {
        Self { id: Uuid::now_v7(), title, image: Some("category.jpg".into()), active: true, slug: String::new() }
    }

    /// Fills a blank slug from the title; an existing slug is kept as is.
    pub fn prepare_for_save(&mut self) {
        if self.slug.trim().is_empty() {
            self.slug = slugify(self.title.as_str());
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    Draft,
    Disable,
    #[serde(rename = "In_Review")]
    InReview,
    #[default]
    Published,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Draft => "Draft", Self::Disable => "Disable", Self::InReview => "In_Review", Self::Published => "Published" }
    }
}

impl FromStr for ProductStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "Disable" => Ok(Self::Disable),
            "In_Review" => Ok(Self::InReview),
            "Published" => Ok(Self::Published),
            _ => Err(UnknownVariant { kind: "product status", value: s.to_string() }),
        }
    }
}

impl TryFrom<String> for ProductStatus {
    type Error = UnknownVariant;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: Money,
    pub old_price: Money,
    pub shipping_amount: Money,
    pub stock_qty: i32,
    pub in_stock: bool,
    #[sqlx(try_from = "String")]
    pub status: ProductStatus,
    pub featured: bool,
    pub views: i32,
    pub rating: i32,
    pub vendor_id: Uuid,
    pub pid: String,
    pub slug: String,
    pub date: DateTime<Utc>,
}

impl Product {
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Published && self.in_stock && self.stock_qty > 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Gallery { pub id: Uuid, pub product_id: Uuid, pub image: String, pub active: bool, pub gid: String }

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Specification { pub id: Uuid, pub product_id: Uuid, pub title: String, pub content: String }

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Size { pub id: Uuid, pub product_id: Uuid, pub name: String, pub price: Money }

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Color { pub id: Uuid, pub product_id: Uuid, pub name: String, pub color_code: String }

/// Product with its gallery, specifications, sizes and colors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub gallery: Vec<Gallery>,
    pub specification: Vec<Specification>,
    pub size: Vec<Size>,
    pub color: Vec<Color>,
}

impl ProductDetail {
    pub fn size_named(&self, name: &str) -> Option<&Size> {
        self.size.iter().find(|s| s.name == name)
    }
}

/// Vendor-supplied product definition before ids and slugs are assigned.
#[derive(Clone, Debug, Default)]
pub struct ProductDraft {
    pub vendor_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Money,
    pub old_price: Money,
    pub shipping_amount: Money,
    pub stock_qty: i32,
    pub status: ProductStatus,
    pub featured: bool,
    pub slug: Option<String>,
    pub gallery: Vec<String>,
    pub specifications: Vec<(String, String)>,
    pub sizes: Vec<(String, Money)>,
    pub colors: Vec<(String, String)>,
}

impl ProductDraft {
    /// Assigns ids, the `pid` token and the slug (derived from the title when blank).
    pub fn into_detail(self) -> ProductDetail {
        let id = Uuid::now_v7();
        let slug = match self.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => slugify(&self.title),
        };
        let product = Product {
            id,
            title: self.title,
            image: self.image.or_else(|| Some("product.jpg".into())),
            description: self.description,
            category_id: self.category_id,
            price: self.price,
            old_price: self.old_price,
            shipping_amount: self.shipping_amount,
            stock_qty: self.stock_qty,
            in_stock: self.stock_qty > 0,
            status: self.status,
            featured: self.featured,
            views: 0,
            rating: 0,
            vendor_id: self.vendor_id,
            pid: ShortId::generate().into_inner(),
            slug,
            date: Utc::now(),
        };
        ProductDetail {
            gallery: self.gallery.into_iter()
                .map(|image| Gallery { id: Uuid::now_v7(), product_id: id, image, active: true, gid: ShortId::generate().into_inner() })
                .collect(),
            specification: self.specifications.into_iter()
                .map(|(title, content)| Specification { id: Uuid::now_v7(), product_id: id, title, content })
                .collect(),
            size: self.sizes.into_iter()
                .map(|(name, price)| Size { id: Uuid::now_v7(), product_id: id, name, price })
                .collect(),
            color: self.colors.into_iter()
                .map(|(name, color_code)| Color { id: Uuid::now_v7(), product_id: id, name, color_code })
                .collect(),
            product,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_category_slug_from_title() {
        let mut c = Category::new(CategoryTitle::Men);
        c.prepare_for_save();
        assert_eq!(c.slug, "men");
    }

    #[test]
    fn test_category_existing_slug_kept() {
        let mut c = Category::new(CategoryTitle::Women);
        c.slug = "ladies".into();
        c.prepare_for_save();
        assert_eq!(c.slug, "ladies");
        c.prepare_for_save();
        assert_eq!(c.slug, "ladies");
    }

    #[test]
    fn test_product_draft_slug() {
        let draft = ProductDraft { title: "Red Shoe".into(), price: Money::new(dec!(25)), stock_qty: 3, ..Default::default() };
        let detail = draft.into_detail();
        assert_eq!(detail.product.slug, "red-shoe");
        assert_eq!(detail.product.pid.len(), 10);
        assert!(detail.product.in_stock);
        assert!(detail.product.is_purchasable());
    }

    #[test]
    fn test_product_status_labels() {
        assert_eq!("In_Review".parse::<ProductStatus>().unwrap(), ProductStatus::InReview);
        assert_eq!(serde_json::to_value(ProductStatus::InReview).unwrap(), "In_Review");
        assert!("Hidden".parse::<ProductStatus>().is_err());
        assert_eq!(serde_json::to_value(CategoryTitle::Unisex).unwrap(), "UNISEX");
    }
}
