//! Aggregates module
pub mod account;
pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod engagement;
pub mod order;

pub use account::{Profile, ProfileUpdate, User, Vendor};
pub use cart::{CartError, CartItem, CartLine, CartSummary, PricingPolicy};
pub use catalog::{Category, CategoryTitle, Color, Gallery, Product, ProductDetail, ProductDraft, ProductStatus, Size, Specification};
pub use coupon::{Coupon, CouponError};
pub use engagement::{Notification, ProductFaq, Review, Wishlist};
pub use order::{BillingDetails, CartOrder, CartOrderItem, CheckoutLine, OrderDetail, OrderError, OrderStatus, PaymentStatus};
