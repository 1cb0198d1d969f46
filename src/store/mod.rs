//! Storage contract for the storefront.
//!
//! [`PgStore`] is the production implementation; [`MemoryStore`] keeps every
//! table in process and backs local runs without a database and the test-suite.
//! Operations that touch several rows (checkout, coupon redemption, status
//! changes) are atomic in both.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{
    BillingDetails, CartItem, CartOrder, Category, CategoryTitle, Coupon, Notification, OrderDetail, OrderStatus,
    PaymentStatus, Product, ProductDetail, ProductDraft, ProductFaq, Profile, ProfileUpdate, Review, User, Vendor,
    Wishlist,
};
use crate::domain::value_objects::Money;
use crate::Result;

/// Outcome of a wishlist toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WishlistToggle { Added, Removed }

#[async_trait]
pub trait Store: Send + Sync {
    // Accounts

    /// Inserts the user together with an empty customer profile.
    async fn create_user(&self, user: User) -> Result<User>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn profile(&self, user_id: Uuid) -> Result<Profile>;
    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile>;
    async fn create_vendor(&self, vendor: Vendor) -> Result<Vendor>;
    async fn vendor_for_user(&self, user_id: Uuid) -> Result<Option<Vendor>>;

    // Catalog

    /// Inserts or updates by slug, deriving a blank slug from the title first.
    async fn save_category(&self, category: Category) -> Result<Category>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn create_product(&self, draft: ProductDraft) -> Result<ProductDetail>;
    async fn list_products(&self) -> Result<Vec<ProductDetail>>;
    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductDetail>>;
    async fn product(&self, id: Uuid) -> Result<Option<Product>>;

    // Cart

    /// Inserts the line, or replaces the existing line for the same cart and product.
    async fn upsert_cart_item(&self, item: CartItem) -> Result<CartItem>;
    async fn cart_items(&self, cart_id: &str) -> Result<Vec<CartItem>>;
    async fn remove_cart_item(&self, cart_id: &str, item_id: Uuid) -> Result<()>;

    // Orders

    /// Converts every row of `cart_id` into one order, decrementing stock and
    /// emptying the cart in a single transaction.
    async fn place_order(&self, cart_id: &str, buyer_id: Option<Uuid>, billing: BillingDetails) -> Result<OrderDetail>;
    async fn order(&self, oid: &str) -> Result<Option<OrderDetail>>;
    async fn orders_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<CartOrder>>;
    async fn orders_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<OrderDetail>>;
    /// Applies a guarded order-status transition; cancelling restocks the items.
    async fn set_order_status(&self, oid: &str, status: OrderStatus) -> Result<OrderDetail>;
    /// Applies a guarded payment transition; completion records notifications.
    async fn set_payment_status(&self, oid: &str, status: PaymentStatus) -> Result<OrderDetail>;

    // Coupons

    async fn create_coupon(&self, coupon: Coupon) -> Result<Coupon>;
    async fn vendor_coupons(&self, vendor_id: Uuid) -> Result<Vec<Coupon>>;
    /// Active coupons of `vendors` not yet redeemed by `user_id`.
    async fn eligible_coupons(&self, user_id: Uuid, vendors: &[Uuid]) -> Result<Vec<Coupon>>;
    /// Discounts the order with `code` and records the redemption, all or nothing.
    async fn redeem_coupon(&self, oid: &str, code: &str, user_id: Uuid) -> Result<(OrderDetail, Money)>;

    // Reviews, FAQs, wishlists, notifications

    async fn create_review(&self, review: Review) -> Result<Review>;
    async fn active_reviews(&self, product_id: Uuid) -> Result<Vec<Review>>;
    async fn review(&self, id: Uuid) -> Result<Option<Review>>;
    /// Stores the vendor reply/visibility and refreshes the product rating.
    async fn moderate_review(&self, id: Uuid, reply: Option<String>, active: bool) -> Result<Review>;
    async fn create_faq(&self, faq: ProductFaq) -> Result<ProductFaq>;
    async fn active_faqs(&self, product_id: Uuid) -> Result<Vec<ProductFaq>>;
    async fn faq(&self, id: Uuid) -> Result<Option<ProductFaq>>;
    async fn answer_faq(&self, id: Uuid, answer: String, active: bool) -> Result<ProductFaq>;
    async fn toggle_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<WishlistToggle>;
    async fn wishlist(&self, user_id: Uuid) -> Result<Vec<Wishlist>>;
    async fn unseen_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>>;
    async fn vendor_notifications(&self, vendor_id: Uuid) -> Result<Vec<Notification>>;
    async fn mark_notification_seen(&self, user_id: Uuid, id: Uuid) -> Result<Notification>;
}

/// Ensures the fixed set of categories exists.
pub async fn seed_categories(store: &dyn Store) -> Result<()> {
    let existing = store.list_categories().await?;
    for title in CategoryTitle::ALL {
        if existing.iter().all(|c| c.title != title) {
            let saved = store.save_category(Category::new(title)).await?;
            info!(slug = %saved.slug, "seeded category");
        }
    }
    Ok(())
}
