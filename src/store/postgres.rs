//! PostgreSQL store on sqlx.

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{Store, WishlistToggle};
use crate::domain::aggregates::{
    BillingDetails, CartError, CartItem, CartOrder, CartOrderItem, Category, CheckoutLine, Color, Coupon, Gallery,
    Notification, OrderDetail, OrderStatus, PaymentStatus, Product, ProductDetail, ProductDraft, ProductFaq, Profile,
    ProfileUpdate, Review, Size, Specification, User, Vendor, Wishlist,
};
use crate::domain::aggregates::coupon;
use crate::domain::value_objects::Money;
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| EcommerceError::StorageError(e.to_string()))
    }
}

async fn with_children(conn: &mut PgConnection, products: Vec<Product>) -> Result<Vec<ProductDetail>> {
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let gallery = sqlx::query_as::<_, Gallery>("SELECT * FROM galleries WHERE product_id = ANY($1)")
        .bind(&ids).fetch_all(&mut *conn).await?;
    let specification = sqlx::query_as::<_, Specification>("SELECT * FROM specifications WHERE product_id = ANY($1)")
        .bind(&ids).fetch_all(&mut *conn).await?;
    let size = sqlx::query_as::<_, Size>("SELECT * FROM sizes WHERE product_id = ANY($1)")
        .bind(&ids).fetch_all(&mut *conn).await?;
    let color = sqlx::query_as::<_, Color>("SELECT * FROM colors WHERE product_id = ANY($1)")
        .bind(&ids).fetch_all(&mut *conn).await?;
    Ok(products.into_iter().map(|product| {
        let id = product.id;
        ProductDetail {
            gallery: gallery.iter().filter(|g| g.product_id == id).cloned().collect(),
            specification: specification.iter().filter(|s| s.product_id == id).cloned().collect(),
            size: size.iter().filter(|s| s.product_id == id).cloned().collect(),
            color: color.iter().filter(|c| c.product_id == id).cloned().collect(),
            product,
        }
    }).collect())
}

async fn with_lines(conn: &mut PgConnection, orders: Vec<CartOrder>) -> Result<Vec<OrderDetail>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = sqlx::query_as::<_, CartOrderItem>("SELECT * FROM cart_order_items WHERE order_id = ANY($1) ORDER BY date, id")
        .bind(&ids).fetch_all(&mut *conn).await?;
    let vendors: Vec<(Uuid, Uuid)> = sqlx::query_as("SELECT order_id, vendor_id FROM cart_order_vendors WHERE order_id = ANY($1)")
        .bind(&ids).fetch_all(&mut *conn).await?;
    Ok(orders.into_iter().map(|order| {
        let id = order.id;
        OrderDetail {
            vendors: vendors.iter().filter(|(o, _)| *o == id).map(|(_, v)| *v).collect(),
            items: items.iter().filter(|i| i.order_id == id).cloned().collect(),
            order,
        }
    }).collect())
}

/// Loads and row-locks an order for the rest of the transaction.
async fn lock_order(conn: &mut PgConnection, oid: &str) -> Result<OrderDetail> {
    let order = sqlx::query_as::<_, CartOrder>("SELECT * FROM cart_orders WHERE oid = $1 FOR UPDATE")
        .bind(oid).fetch_optional(&mut *conn).await?
        .ok_or(EcommerceError::OrderNotFound)?;
    with_lines(conn, vec![order]).await?.pop().ok_or(EcommerceError::OrderNotFound)
}

async fn insert_notification(conn: &mut PgConnection, n: &Notification) -> Result<()> {
    sqlx::query("INSERT INTO notifications (id, user_id, vendor_id, order_id, order_item_id, seen, date) VALUES ($1, $2, $3, $4, $5, $6, $7)")
        .bind(n.id).bind(n.user_id).bind(n.vendor_id).bind(n.order_id).bind(n.order_item_id).bind(n.seen).bind(n.date)
        .execute(conn).await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>("INSERT INTO users (id, email, username, full_name, phone, password_hash, date_joined) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *")
            .bind(user.id).bind(&user.email).bind(&user.username).bind(&user.full_name).bind(&user.phone).bind(&user.password_hash).bind(user.date_joined)
            .fetch_one(&mut *tx).await?;
        let p = Profile::for_user(&user);
        sqlx::query("INSERT INTO profiles (id, user_id, full_name, mobile, date) VALUES ($1, $2, $3, $4, $5)")
            .bind(p.id).bind(p.user_id).bind(&p.full_name).bind(&p.mobile).bind(p.date)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.trim().to_lowercase()).fetch_optional(&self.pool).await?)
    }

    async fn profile(&self, user_id: Uuid) -> Result<Profile> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id).fetch_optional(&self.pool).await?
            .ok_or(EcommerceError::NotFound("Profile"))
    }

    async fn update_profile(&self, user_id: Uuid, u: ProfileUpdate) -> Result<Profile> {
        sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET full_name = COALESCE($2, full_name), about = COALESCE($3, about), gender = COALESCE($4, gender), \
             mobile = COALESCE($5, mobile), country = COALESCE($6, country), state = COALESCE($7, state), \
             city = COALESCE($8, city), address = COALESCE($9, address) WHERE user_id = $1 RETURNING *")
            .bind(user_id).bind(u.full_name).bind(u.about).bind(u.gender).bind(u.mobile)
            .bind(u.country).bind(u.state).bind(u.city).bind(u.address)
            .fetch_optional(&self.pool).await?
            .ok_or(EcommerceError::NotFound("Profile"))
    }

    async fn create_vendor(&self, v: Vendor) -> Result<Vendor> {
        Ok(sqlx::query_as::<_, Vendor>("INSERT INTO vendors (id, user_id, name, description, mobile, active, slug, date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *")
            .bind(v.id).bind(v.user_id).bind(&v.name).bind(&v.description).bind(&v.mobile).bind(v.active).bind(&v.slug).bind(v.date)
            .fetch_one(&self.pool).await?)
    }

    async fn vendor_for_user(&self, user_id: Uuid) -> Result<Option<Vendor>> {
        Ok(sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE user_id = $1").bind(user_id).fetch_optional(&self.pool).await?)
    }

    async fn save_category(&self, mut c: Category) -> Result<Category> {
        c.prepare_for_save();
        Ok(sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, title, image, active, slug) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (slug) DO UPDATE SET title = EXCLUDED.title, image = EXCLUDED.image, active = EXCLUDED.active RETURNING *")
            .bind(c.id).bind(c.title.as_str()).bind(&c.image).bind(c.active).bind(&c.slug)
            .fetch_one(&self.pool).await?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY title").fetch_all(&self.pool).await?)
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    async fn create_product(&self, draft: ProductDraft) -> Result<ProductDetail> {
        let detail = draft.into_detail();
        let p = &detail.product;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO products (id, title, image, description, category_id, price, old_price, shipping_amount, stock_qty, in_stock, \
             status, featured, views, rating, vendor_id, pid, slug, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)")
            .bind(p.id).bind(&p.title).bind(&p.image).bind(&p.description).bind(p.category_id)
            .bind(p.price).bind(p.old_price).bind(p.shipping_amount).bind(p.stock_qty).bind(p.in_stock)
            .bind(p.status.as_str()).bind(p.featured).bind(p.views).bind(p.rating).bind(p.vendor_id)
            .bind(&p.pid).bind(&p.slug).bind(p.date)
            .execute(&mut *tx).await?;
        for g in &detail.gallery {
            sqlx::query("INSERT INTO galleries (id, product_id, image, active, gid) VALUES ($1, $2, $3, $4, $5)")
                .bind(g.id).bind(g.product_id).bind(&g.image).bind(g.active).bind(&g.gid)
                .execute(&mut *tx).await?;
        }
        for s in &detail.specification {
            sqlx::query("INSERT INTO specifications (id, product_id, title, content) VALUES ($1, $2, $3, $4)")
                .bind(s.id).bind(s.product_id).bind(&s.title).bind(&s.content)
                .execute(&mut *tx).await?;
        }
        for s in &detail.size {
            sqlx::query("INSERT INTO sizes (id, product_id, name, price) VALUES ($1, $2, $3, $4)")
                .bind(s.id).bind(s.product_id).bind(&s.name).bind(s.price)
                .execute(&mut *tx).await?;
        }
        for c in &detail.color {
            sqlx::query("INSERT INTO colors (id, product_id, name, color_code) VALUES ($1, $2, $3, $4)")
                .bind(c.id).bind(c.product_id).bind(&c.name).bind(&c.color_code)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(detail)
    }

    async fn list_products(&self) -> Result<Vec<ProductDetail>> {
        let mut conn = self.pool.acquire().await?;
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY date, id").fetch_all(&mut *conn).await?;
        with_children(&mut conn, products).await
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(product) = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1")
            .bind(slug).fetch_optional(&mut *conn).await?
        else {
            return Ok(None);
        };
        Ok(with_children(&mut conn, vec![product]).await?.pop())
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn upsert_cart_item(&self, c: CartItem) -> Result<CartItem> {
        Ok(sqlx::query_as::<_, CartItem>(
            "INSERT INTO cart_items (id, cart_id, product_id, user_id, qty, price, sub_total, shipping_amount, service_fee, tax_fee, total, country, size, color, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (cart_id, product_id) DO UPDATE SET user_id = EXCLUDED.user_id, qty = EXCLUDED.qty, price = EXCLUDED.price, \
             sub_total = EXCLUDED.sub_total, shipping_amount = EXCLUDED.shipping_amount, service_fee = EXCLUDED.service_fee, \
             tax_fee = EXCLUDED.tax_fee, total = EXCLUDED.total, country = EXCLUDED.country, size = EXCLUDED.size, \
             color = EXCLUDED.color, date = EXCLUDED.date RETURNING *")
            .bind(c.id).bind(&c.cart_id).bind(c.product_id).bind(c.user_id).bind(c.qty)
            .bind(c.price).bind(c.sub_total).bind(c.shipping_amount).bind(c.service_fee).bind(c.tax_fee).bind(c.total)
            .bind(&c.country).bind(&c.size).bind(&c.color).bind(c.date)
            .fetch_one(&self.pool).await?)
    }

    async fn cart_items(&self, cart_id: &str) -> Result<Vec<CartItem>> {
        Ok(sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY date, id")
            .bind(cart_id).fetch_all(&self.pool).await?)
    }

    async fn remove_cart_item(&self, cart_id: &str, item_id: Uuid) -> Result<()> {
        let done = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND id = $2")
            .bind(cart_id).bind(item_id).execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(CartError::ItemNotFound.into());
        }
        Ok(())
    }

    #[instrument(skip(self, billing))]
    async fn place_order(&self, cart_id: &str, buyer_id: Option<Uuid>, billing: BillingDetails) -> Result<OrderDetail> {
        let mut tx = self.pool.begin().await?;
        let items = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY date, id FOR UPDATE")
            .bind(cart_id).fetch_all(&mut *tx).await?;
        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let vendor_of: HashMap<Uuid, Uuid> = sqlx::query_as::<_, (Uuid, Uuid)>("SELECT id, vendor_id FROM products WHERE id = ANY($1)")
            .bind(&product_ids).fetch_all(&mut *tx).await?
            .into_iter().collect();
        let lines = items.into_iter()
            .map(|item| {
                let vendor_id = *vendor_of.get(&item.product_id).ok_or(EcommerceError::ProductNotFound)?;
                Ok(CheckoutLine { item, vendor_id })
            })
            .collect::<Result<Vec<_>>>()?;
        let detail = OrderDetail::from_cart(&lines, buyer_id, billing)?;

        let mut wanted: HashMap<Uuid, i32> = HashMap::new();
        for line in &lines {
            *wanted.entry(line.item.product_id).or_default() += line.item.qty;
        }
        for (product_id, qty) in wanted {
            let done = sqlx::query("UPDATE products SET stock_qty = stock_qty - $2, in_stock = stock_qty - $2 > 0 WHERE id = $1 AND stock_qty >= $2")
                .bind(product_id).bind(qty).execute(&mut *tx).await?;
            if done.rows_affected() == 0 {
                let (slug, available): (String, i32) = sqlx::query_as("SELECT slug, stock_qty FROM products WHERE id = $1")
                    .bind(product_id).fetch_one(&mut *tx).await?;
                return Err(CartError::InsufficientStock { slug, available }.into());
            }
        }

        let o = &detail.order;
        sqlx::query(
            "INSERT INTO cart_orders (id, oid, buyer_id, sub_total, shipping_amount, tax_fee, service_fee, total, payment_status, order_status, \
             initial_cost, saved, full_name, email, mobile, address, city, state, country, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)")
            .bind(o.id).bind(&o.oid).bind(o.buyer_id).bind(o.sub_total).bind(o.shipping_amount).bind(o.tax_fee)
            .bind(o.service_fee).bind(o.total).bind(o.payment_status.as_str()).bind(o.order_status.as_str())
            .bind(o.initial_cost).bind(o.saved).bind(&o.full_name).bind(&o.email).bind(&o.mobile)
            .bind(&o.address).bind(&o.city).bind(&o.state).bind(&o.country).bind(o.date)
            .execute(&mut *tx).await?;
        for vendor_id in &detail.vendors {
            sqlx::query("INSERT INTO cart_order_vendors (order_id, vendor_id) VALUES ($1, $2)")
                .bind(o.id).bind(vendor_id).execute(&mut *tx).await?;
        }
        for i in &detail.items {
            sqlx::query(
                "INSERT INTO cart_order_items (id, oid, order_id, product_id, vendor_id, qty, price, sub_total, shipping_amount, tax_fee, \
                 service_fee, total, country, size, color, initial_cost, saved, date) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)")
                .bind(i.id).bind(&i.oid).bind(i.order_id).bind(i.product_id).bind(i.vendor_id).bind(&i.qty)
                .bind(i.price).bind(i.sub_total).bind(i.shipping_amount).bind(i.tax_fee).bind(i.service_fee).bind(i.total)
                .bind(&i.country).bind(&i.size).bind(&i.color).bind(i.initial_cost).bind(i.saved).bind(i.date)
                .execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(&mut *tx).await?;
        tx.commit().await?;
        debug!(oid = %o.oid, items = detail.items.len(), "order placed");
        Ok(detail)
    }

    async fn order(&self, oid: &str) -> Result<Option<OrderDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = sqlx::query_as::<_, CartOrder>("SELECT * FROM cart_orders WHERE oid = $1")
            .bind(oid).fetch_optional(&mut *conn).await?
        else {
            return Ok(None);
        };
        Ok(with_lines(&mut conn, vec![order]).await?.pop())
    }

    async fn orders_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<CartOrder>> {
        Ok(sqlx::query_as::<_, CartOrder>("SELECT * FROM cart_orders WHERE buyer_id = $1 ORDER BY date DESC")
            .bind(buyer_id).fetch_all(&self.pool).await?)
    }

    async fn orders_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<OrderDetail>> {
        let mut conn = self.pool.acquire().await?;
        let orders = sqlx::query_as::<_, CartOrder>(
            "SELECT o.* FROM cart_orders o JOIN cart_order_vendors ov ON ov.order_id = o.id WHERE ov.vendor_id = $1 ORDER BY o.date DESC")
            .bind(vendor_id).fetch_all(&mut *conn).await?;
        with_lines(&mut conn, orders).await
    }

    async fn set_order_status(&self, oid: &str, status: OrderStatus) -> Result<OrderDetail> {
        let mut tx = self.pool.begin().await?;
        let mut detail = lock_order(&mut *tx, oid).await?;
        detail.transition(status)?;
        sqlx::query("UPDATE cart_orders SET order_status = $2 WHERE id = $1")
            .bind(detail.order.id).bind(status.as_str()).execute(&mut *tx).await?;
        if status == OrderStatus::Cancelled {
            for (product_id, qty) in detail.restock_lines()? {
                sqlx::query("UPDATE products SET stock_qty = stock_qty + $2, in_stock = stock_qty + $2 > 0 WHERE id = $1")
                    .bind(product_id).bind(qty as i32).execute(&mut *tx).await?;
            }
        }
        tx.commit().await?;
        Ok(detail)
    }

    async fn set_payment_status(&self, oid: &str, status: PaymentStatus) -> Result<OrderDetail> {
        let mut tx = self.pool.begin().await?;
        let mut detail = lock_order(&mut *tx, oid).await?;
        detail.transition_payment(status)?;
        sqlx::query("UPDATE cart_orders SET payment_status = $2 WHERE id = $1")
            .bind(detail.order.id).bind(status.as_str()).execute(&mut *tx).await?;
        if status == PaymentStatus::Completed {
            for note in detail.completion_notifications() {
                insert_notification(&mut *tx, &note).await?;
            }
        }
        tx.commit().await?;
        Ok(detail)
    }

    async fn create_coupon(&self, c: Coupon) -> Result<Coupon> {
        Ok(sqlx::query_as::<_, Coupon>("INSERT INTO coupons (id, vendor_id, code, discount, active, date) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *")
            .bind(c.id).bind(c.vendor_id).bind(&c.code).bind(c.discount).bind(c.active).bind(c.date)
            .fetch_one(&self.pool).await?)
    }

    async fn vendor_coupons(&self, vendor_id: Uuid) -> Result<Vec<Coupon>> {
        Ok(sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE vendor_id = $1 ORDER BY date DESC")
            .bind(vendor_id).fetch_all(&self.pool).await?)
    }

    async fn eligible_coupons(&self, user_id: Uuid, vendors: &[Uuid]) -> Result<Vec<Coupon>> {
        Ok(sqlx::query_as::<_, Coupon>(
            "SELECT c.* FROM coupons c WHERE c.active AND c.vendor_id = ANY($2) \
             AND NOT EXISTS (SELECT 1 FROM coupon_users cu WHERE cu.coupon_id = c.id AND cu.user_id = $1) ORDER BY c.date")
            .bind(user_id).bind(vendors).fetch_all(&self.pool).await?)
    }

    #[instrument(skip(self))]
    async fn redeem_coupon(&self, oid: &str, code: &str, user_id: Uuid) -> Result<(OrderDetail, Money)> {
        let mut tx = self.pool.begin().await?;
        let mut detail = lock_order(&mut *tx, oid).await?;
        let candidates = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1 ORDER BY date")
            .bind(code).fetch_all(&mut *tx).await?;
        let coupon = coupon::pick(&candidates, code, |v| detail.involves_vendor(v))
            .cloned()
            .ok_or(EcommerceError::InvalidCoupon)?;
        let redeemed: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM coupon_users WHERE coupon_id = $1 AND user_id = $2)")
            .bind(coupon.id).bind(user_id).fetch_one(&mut *tx).await?;
        coupon.ensure_redeemable(redeemed)?;
        let saved = detail.apply_coupon(&coupon)?;

        let recorded = sqlx::query("INSERT INTO coupon_users (coupon_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(coupon.id).bind(user_id).execute(&mut *tx).await?;
        if recorded.rows_affected() == 0 {
            return Err(crate::domain::aggregates::CouponError::AlreadyRedeemed.into());
        }
        for i in detail.items.iter().filter(|i| i.vendor_id == coupon.vendor_id) {
            sqlx::query("UPDATE cart_order_items SET total = $2, sub_total = $3, saved = $4 WHERE id = $1")
                .bind(i.id).bind(i.total).bind(i.sub_total).bind(i.saved).execute(&mut *tx).await?;
        }
        let o = &detail.order;
        sqlx::query("UPDATE cart_orders SET total = $2, sub_total = $3, saved = $4 WHERE id = $1")
            .bind(o.id).bind(o.total).bind(o.sub_total).bind(o.saved).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok((detail, saved))
    }

    async fn create_review(&self, r: Review) -> Result<Review> {
        Ok(sqlx::query_as::<_, Review>("INSERT INTO reviews (id, product_id, user_id, review, reply, rating, active, date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *")
            .bind(r.id).bind(r.product_id).bind(r.user_id).bind(&r.review).bind(&r.reply).bind(r.rating).bind(r.active).bind(r.date)
            .fetch_one(&self.pool).await?)
    }

    async fn active_reviews(&self, product_id: Uuid) -> Result<Vec<Review>> {
        Ok(sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE product_id = $1 AND active ORDER BY date DESC")
            .bind(product_id).fetch_all(&self.pool).await?)
    }

    async fn review(&self, id: Uuid) -> Result<Option<Review>> {
        Ok(sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn moderate_review(&self, id: Uuid, reply: Option<String>, active: bool) -> Result<Review> {
        let mut tx = self.pool.begin().await?;
        let review = sqlx::query_as::<_, Review>("UPDATE reviews SET reply = COALESCE($2, reply), active = $3 WHERE id = $1 RETURNING *")
            .bind(id).bind(reply).bind(active).fetch_optional(&mut *tx).await?
            .ok_or(EcommerceError::NotFound("Review"))?;
        sqlx::query(
            "UPDATE products SET rating = (SELECT COALESCE(ROUND(AVG(rating)), 0)::INTEGER FROM reviews \
             WHERE product_id = $1 AND active AND rating IS NOT NULL) WHERE id = $1")
            .bind(review.product_id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(review)
    }

    async fn create_faq(&self, f: ProductFaq) -> Result<ProductFaq> {
        Ok(sqlx::query_as::<_, ProductFaq>("INSERT INTO product_faqs (id, product_id, user_id, email, question, answer, active, date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *")
            .bind(f.id).bind(f.product_id).bind(f.user_id).bind(&f.email).bind(&f.question).bind(&f.answer).bind(f.active).bind(f.date)
            .fetch_one(&self.pool).await?)
    }

    async fn active_faqs(&self, product_id: Uuid) -> Result<Vec<ProductFaq>> {
        Ok(sqlx::query_as::<_, ProductFaq>("SELECT * FROM product_faqs WHERE product_id = $1 AND active ORDER BY date")
            .bind(product_id).fetch_all(&self.pool).await?)
    }

    async fn faq(&self, id: Uuid) -> Result<Option<ProductFaq>> {
        Ok(sqlx::query_as::<_, ProductFaq>("SELECT * FROM product_faqs WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn answer_faq(&self, id: Uuid, answer: String, active: bool) -> Result<ProductFaq> {
        sqlx::query_as::<_, ProductFaq>("UPDATE product_faqs SET answer = $2, active = $3 WHERE id = $1 RETURNING *")
            .bind(id).bind(answer).bind(active).fetch_optional(&self.pool).await?
            .ok_or(EcommerceError::NotFound("FAQ"))
    }

    async fn toggle_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<WishlistToggle> {
        let removed = sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND product_id = $2")
            .bind(user_id).bind(product_id).execute(&self.pool).await?;
        if removed.rows_affected() > 0 {
            return Ok(WishlistToggle::Removed);
        }
        let w = Wishlist::new(user_id, product_id);
        sqlx::query("INSERT INTO wishlists (id, product_id, user_id, date) VALUES ($1, $2, $3, $4) ON CONFLICT (user_id, product_id) DO NOTHING")
            .bind(w.id).bind(w.product_id).bind(w.user_id).bind(w.date).execute(&self.pool).await?;
        Ok(WishlistToggle::Added)
    }

    async fn wishlist(&self, user_id: Uuid) -> Result<Vec<Wishlist>> {
        Ok(sqlx::query_as::<_, Wishlist>("SELECT * FROM wishlists WHERE user_id = $1 ORDER BY date DESC")
            .bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn unseen_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        Ok(sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE user_id = $1 AND NOT seen ORDER BY date DESC")
            .bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn vendor_notifications(&self, vendor_id: Uuid) -> Result<Vec<Notification>> {
        Ok(sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE vendor_id = $1 ORDER BY date DESC")
            .bind(vendor_id).fetch_all(&self.pool).await?)
    }

    async fn mark_notification_seen(&self, user_id: Uuid, id: Uuid) -> Result<Notification> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET seen = TRUE WHERE id = $1 \
             AND (user_id = $2 OR vendor_id IN (SELECT id FROM vendors WHERE user_id = $2)) RETURNING *")
            .bind(id).bind(user_id).fetch_optional(&self.pool).await?
            .ok_or(EcommerceError::NotFound("Notification"))
    }
}
