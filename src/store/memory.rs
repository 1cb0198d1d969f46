//! In-process store. A single lock guards every table, so multi-row
//! operations are atomic with respect to each other.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, WishlistToggle};
use crate::domain::aggregates::coupon;
use crate::domain::aggregates::engagement::product_rating;
use crate::domain::aggregates::{
    BillingDetails, CartError, CartItem, CartOrder, Category, CheckoutLine, Coupon, Notification, OrderDetail,
    OrderStatus, PaymentStatus, Product, ProductDetail, ProductDraft, ProductFaq, Profile, ProfileUpdate, Review,
    User, Vendor, Wishlist,
};
use crate::domain::value_objects::Money;
use crate::{EcommerceError, Result};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    profiles: Vec<Profile>,
    vendors: Vec<Vendor>,
    categories: Vec<Category>,
    products: Vec<ProductDetail>,
    cart: Vec<CartItem>,
    orders: Vec<OrderDetail>,
    coupons: Vec<Coupon>,
    /// (coupon id, user id)
    redemptions: HashSet<(Uuid, Uuid)>,
    reviews: Vec<Review>,
    faqs: Vec<ProductFaq>,
    wishlist: Vec<Wishlist>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn product_mut(&mut self, id: Uuid) -> Option<&mut Product> {
        self.products.iter_mut().map(|d| &mut d.product).find(|p| p.id == id)
    }

    fn order_index(&self, oid: &str) -> Result<usize> {
        self.orders.iter().position(|o| o.order.oid == oid).ok_or(EcommerceError::OrderNotFound)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn conflict(constraint: &str) -> EcommerceError {
    EcommerceError::Conflict(constraint.to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(conflict("users_email_key"));
        }
        t.profiles.push(Profile::for_user(&user));
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.tables.read().await.users.iter().find(|u| u.email == email).cloned())
    }

    async fn profile(&self, user_id: Uuid) -> Result<Profile> {
        self.tables.read().await.profiles.iter().find(|p| p.user_id == user_id).cloned()
            .ok_or(EcommerceError::NotFound("Profile"))
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile> {
        let mut t = self.tables.write().await;
        let profile = t.profiles.iter_mut().find(|p| p.user_id == user_id).ok_or(EcommerceError::NotFound("Profile"))?;
        profile.apply(update);
        Ok(profile.clone())
    }

    async fn create_vendor(&self, vendor: Vendor) -> Result<Vendor> {
        let mut t = self.tables.write().await;
        if t.vendors.iter().any(|v| v.user_id == vendor.user_id) {
            return Err(conflict("vendors_user_id_key"));
        }
        if t.vendors.iter().any(|v| v.slug == vendor.slug) {
            return Err(conflict("vendors_slug_key"));
        }
        t.vendors.push(vendor.clone());
        Ok(vendor)
    }

    async fn vendor_for_user(&self, user_id: Uuid) -> Result<Option<Vendor>> {
        Ok(self.tables.read().await.vendors.iter().find(|v| v.user_id == user_id).cloned())
    }

    async fn save_category(&self, mut category: Category) -> Result<Category> {
        category.prepare_for_save();
        let mut t = self.tables.write().await;
        match t.categories.iter_mut().find(|c| c.slug == category.slug) {
            Some(existing) => {
                category.id = existing.id;
                *existing = category.clone();
            }
            None => t.categories.push(category.clone()),
        }
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.tables.read().await.categories.clone();
        categories.sort_by(|a, b| a.title.as_str().cmp(b.title.as_str()));
        Ok(categories)
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<ProductDetail> {
        let detail = draft.into_detail();
        let mut t = self.tables.write().await;
        let p = &detail.product;
        if t.products.iter().any(|d| d.product.slug == p.slug) {
            return Err(conflict("products_slug_key"));
        }
        if t.products.iter().any(|d| d.product.pid == p.pid) {
            return Err(conflict("products_pid_key"));
        }
        if !t.vendors.iter().any(|v| v.id == p.vendor_id) {
            return Err(EcommerceError::Validation("unknown vendor".into()));
        }
        if let Some(category_id) = p.category_id {
            if !t.categories.iter().any(|c| c.id == category_id) {
                return Err(EcommerceError::Validation("unknown category".into()));
            }
        }
        t.products.push(detail.clone());
        Ok(detail)
    }

    async fn list_products(&self) -> Result<Vec<ProductDetail>> {
        Ok(self.tables.read().await.products.clone())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductDetail>> {
        Ok(self.tables.read().await.products.iter().find(|d| d.product.slug == slug).cloned())
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.iter().map(|d| &d.product).find(|p| p.id == id).cloned())
    }

    async fn upsert_cart_item(&self, item: CartItem) -> Result<CartItem> {
        let mut t = self.tables.write().await;
        match t.cart.iter_mut().find(|c| c.cart_id == item.cart_id && c.product_id == item.product_id) {
            Some(existing) => {
                existing.replace_with(item);
                Ok(existing.clone())
            }
            None => {
                t.cart.push(item.clone());
                Ok(item)
            }
        }
    }

    async fn cart_items(&self, cart_id: &str) -> Result<Vec<CartItem>> {
        Ok(self.tables.read().await.cart.iter().filter(|c| c.cart_id == cart_id).cloned().collect())
    }

    async fn remove_cart_item(&self, cart_id: &str, item_id: Uuid) -> Result<()> {
        let mut t = self.tables.write().await;
        let before = t.cart.len();
        t.cart.retain(|c| !(c.cart_id == cart_id && c.id == item_id));
        if t.cart.len() == before {
            return Err(CartError::ItemNotFound.into());
        }
        Ok(())
    }

    async fn place_order(&self, cart_id: &str, buyer_id: Option<Uuid>, billing: BillingDetails) -> Result<OrderDetail> {
        let mut t = self.tables.write().await;
        let mut lines = Vec::new();
        let mut wanted: HashMap<Uuid, i64> = HashMap::new();
        for item in t.cart.iter().filter(|c| c.cart_id == cart_id) {
            let product = t.products.iter().map(|d| &d.product).find(|p| p.id == item.product_id)
                .ok_or(EcommerceError::ProductNotFound)?;
            let qty = wanted.entry(product.id).or_default();
            *qty += i64::from(item.qty);
            if *qty > i64::from(product.stock_qty) {
                return Err(CartError::InsufficientStock { slug: product.slug.clone(), available: product.stock_qty }.into());
            }
            lines.push(CheckoutLine { item: item.clone(), vendor_id: product.vendor_id });
        }
        let order = OrderDetail::from_cart(&lines, buyer_id, billing)?;
        for (product_id, qty) in wanted {
            if let Some(p) = t.product_mut(product_id) {
                p.stock_qty -= qty as i32;
                p.in_stock = p.stock_qty > 0;
            }
        }
        t.cart.retain(|c| c.cart_id != cart_id);
        t.orders.push(order.clone());
        Ok(order)
    }

    async fn order(&self, oid: &str) -> Result<Option<OrderDetail>> {
        Ok(self.tables.read().await.orders.iter().find(|o| o.order.oid == oid).cloned())
    }

    async fn orders_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<CartOrder>> {
        let t = self.tables.read().await;
        Ok(t.orders.iter().filter(|o| o.order.buyer_id == Some(buyer_id)).map(|o| o.order.clone()).rev().collect())
    }

    async fn orders_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<OrderDetail>> {
        let t = self.tables.read().await;
        Ok(t.orders.iter().filter(|o| o.involves_vendor(vendor_id)).cloned().rev().collect())
    }

    async fn set_order_status(&self, oid: &str, status: OrderStatus) -> Result<OrderDetail> {
        let mut t = self.tables.write().await;
        let idx = t.order_index(oid)?;
        let mut order = t.orders[idx].clone();
        order.transition(status)?;
        if status == OrderStatus::Cancelled {
            for (product_id, qty) in order.restock_lines()? {
                if let Some(p) = t.product_mut(product_id) {
                    p.stock_qty += qty as i32;
                    p.in_stock = p.stock_qty > 0;
                }
            }
        }
        t.orders[idx] = order.clone();
        Ok(order)
    }

    async fn set_payment_status(&self, oid: &str, status: PaymentStatus) -> Result<OrderDetail> {
        let mut t = self.tables.write().await;
        let idx = t.order_index(oid)?;
        let mut order = t.orders[idx].clone();
        order.transition_payment(status)?;
        if status == PaymentStatus::Completed {
            let notes = order.completion_notifications();
            t.notifications.extend(notes);
        }
        t.orders[idx] = order.clone();
        Ok(order)
    }

    async fn create_coupon(&self, coupon: Coupon) -> Result<Coupon> {
        let mut t = self.tables.write().await;
        if t.coupons.iter().any(|c| c.vendor_id == coupon.vendor_id && c.code == coupon.code) {
            return Err(conflict("coupons_vendor_id_code_key"));
        }
        t.coupons.push(coupon.clone());
        Ok(coupon)
    }

    async fn vendor_coupons(&self, vendor_id: Uuid) -> Result<Vec<Coupon>> {
        Ok(self.tables.read().await.coupons.iter().filter(|c| c.vendor_id == vendor_id).cloned().collect())
    }

    async fn eligible_coupons(&self, user_id: Uuid, vendors: &[Uuid]) -> Result<Vec<Coupon>> {
        let t = self.tables.read().await;
        let redeemed: HashSet<Uuid> = t.redemptions.iter().filter(|(_, u)| *u == user_id).map(|(c, _)| *c).collect();
        Ok(coupon::eligible(&t.coupons, vendors, &redeemed))
    }

    async fn redeem_coupon(&self, oid: &str, code: &str, user_id: Uuid) -> Result<(OrderDetail, Money)> {
        let mut t = self.tables.write().await;
        let idx = t.order_index(oid)?;
        let mut order = t.orders[idx].clone();
        let coupon = coupon::pick(&t.coupons, code, |v| order.involves_vendor(v))
            .cloned()
            .ok_or(EcommerceError::InvalidCoupon)?;
        coupon.ensure_redeemable(t.redemptions.contains(&(coupon.id, user_id)))?;
        let saved = order.apply_coupon(&coupon)?;
        t.redemptions.insert((coupon.id, user_id));
        t.orders[idx] = order.clone();
        Ok((order, saved))
    }

    async fn create_review(&self, review: Review) -> Result<Review> {
        self.tables.write().await.reviews.push(review.clone());
        Ok(review)
    }

    async fn active_reviews(&self, product_id: Uuid) -> Result<Vec<Review>> {
        let t = self.tables.read().await;
        Ok(t.reviews.iter().filter(|r| r.product_id == product_id && r.active).cloned().collect())
    }

    async fn review(&self, id: Uuid) -> Result<Option<Review>> {
        Ok(self.tables.read().await.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn moderate_review(&self, id: Uuid, reply: Option<String>, active: bool) -> Result<Review> {
        let mut t = self.tables.write().await;
        let review = t.reviews.iter_mut().find(|r| r.id == id).ok_or(EcommerceError::NotFound("Review"))?;
        if reply.is_some() {
            review.reply = reply;
        }
        review.active = active;
        let review = review.clone();
        let of_product: Vec<Review> = t.reviews.iter().filter(|r| r.product_id == review.product_id).cloned().collect();
        if let Some(p) = t.product_mut(review.product_id) {
            p.rating = product_rating(&of_product);
        }
        Ok(review)
    }

    async fn create_faq(&self, faq: ProductFaq) -> Result<ProductFaq> {
        self.tables.write().await.faqs.push(faq.clone());
        Ok(faq)
    }

    async fn active_faqs(&self, product_id: Uuid) -> Result<Vec<ProductFaq>> {
        let t = self.tables.read().await;
        Ok(t.faqs.iter().filter(|f| f.product_id == product_id && f.active).cloned().collect())
    }

    async fn faq(&self, id: Uuid) -> Result<Option<ProductFaq>> {
        Ok(self.tables.read().await.faqs.iter().find(|f| f.id == id).cloned())
    }

    async fn answer_faq(&self, id: Uuid, answer: String, active: bool) -> Result<ProductFaq> {
        let mut t = self.tables.write().await;
        let faq = t.faqs.iter_mut().find(|f| f.id == id).ok_or(EcommerceError::NotFound("FAQ"))?;
        faq.answer = Some(answer);
        faq.active = active;
        Ok(faq.clone())
    }

    async fn toggle_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<WishlistToggle> {
        let mut t = self.tables.write().await;
        let before = t.wishlist.len();
        t.wishlist.retain(|w| !(w.user_id == user_id && w.product_id == product_id));
        if t.wishlist.len() < before {
            return Ok(WishlistToggle::Removed);
        }
        t.wishlist.push(Wishlist::new(user_id, product_id));
        Ok(WishlistToggle::Added)
    }

    async fn wishlist(&self, user_id: Uuid) -> Result<Vec<Wishlist>> {
        Ok(self.tables.read().await.wishlist.iter().filter(|w| w.user_id == user_id).cloned().collect())
    }

    async fn unseen_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let t = self.tables.read().await;
        Ok(t.notifications.iter().filter(|n| n.user_id == Some(user_id) && !n.seen).cloned().collect())
    }

    async fn vendor_notifications(&self, vendor_id: Uuid) -> Result<Vec<Notification>> {
        let t = self.tables.read().await;
        Ok(t.notifications.iter().filter(|n| n.vendor_id == Some(vendor_id)).cloned().collect())
    }

    async fn mark_notification_seen(&self, user_id: Uuid, id: Uuid) -> Result<Notification> {
        let mut t = self.tables.write().await;
        let vendor_id = t.vendors.iter().find(|v| v.user_id == user_id).map(|v| v.id);
        let note = t.notifications.iter_mut()
            .find(|n| n.id == id && (n.user_id == Some(user_id) || (vendor_id.is_some() && n.vendor_id == vendor_id)))
            .ok_or(EcommerceError::NotFound("Notification"))?;
        note.seen = true;
        Ok(note.clone())
    }
}
