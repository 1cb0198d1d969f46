//! Post-purchase records: reviews, product FAQs, wishlists and notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Option<Uuid>,
    pub review: String,
    pub reply: Option<String>,
    /// 1 to 5 stars.
    pub rating: Option<i32>,
    pub active: bool,
    pub date: DateTime<Utc>,
}

impl Review {
    /// New reviews wait for the vendor before they are shown.
    pub fn new(product_id: Uuid, user_id: Uuid, review: String, rating: Option<i32>) -> Self {
        Self { id: Uuid::now_v7(), product_id, user_id: Some(user_id), review, reply: None, rating, active: false, date: Utc::now() }
    }
}

/// Rounded mean of the ratings of active reviews, 0 when there are none.
pub fn product_rating(reviews: &[Review]) -> i32 {
    let ratings: Vec<i32> = reviews.iter().filter(|r| r.active).filter_map(|r| r.rating).collect();
    if ratings.is_empty() {
        return 0;
    }
    let sum: i32 = ratings.iter().sum();
    let n = ratings.len() as i32;
    (2 * sum + n) / (2 * n)
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductFaq {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub question: String,
    pub answer: Option<String>,
    pub active: bool,
    pub date: DateTime<Utc>,
}

impl ProductFaq {
    pub fn new(product_id: Uuid, user_id: Option<Uuid>, email: Option<String>, question: String) -> Self {
        Self { id: Uuid::now_v7(), product_id, user_id, email, question, answer: None, active: false, date: Utc::now() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wishlist {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
}

impl Wishlist {
    pub fn new(user_id: Uuid, product_id: Uuid) -> Self {
        Self { id: Uuid::now_v7(), product_id, user_id, date: Utc::now() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub order_item_id: Option<Uuid>,
    pub seen: bool,
    pub date: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Option<Uuid>, vendor_id: Option<Uuid>, order_id: Option<Uuid>, order_item_id: Option<Uuid>) -> Self {
        Self { id: Uuid::now_v7(), user_id, vendor_id, order_id, order_item_id, seen: false, date: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: Option<i32>, active: bool) -> Review {
        let mut r = Review::new(Uuid::now_v7(), Uuid::now_v7(), "ok".into(), rating);
        r.active = active;
        r
    }

    #[test]
    fn test_product_rating() {
        assert_eq!(product_rating(&[]), 0);
        assert_eq!(product_rating(&[review(Some(4), true), review(Some(5), true)]), 5);
        assert_eq!(product_rating(&[review(Some(4), true), review(Some(4), true), review(Some(5), true)]), 4);
        assert_eq!(product_rating(&[review(Some(1), false), review(Some(3), true), review(None, true)]), 3);
    }
}
