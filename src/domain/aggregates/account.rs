//! Users, customer profiles and vendor profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::slugify;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, full_name: &str, phone: Option<String>, password_hash: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.trim().to_lowercase(),
            username: username_from_email(email),
            full_name: full_name.trim().to_string(),
            phone,
            password_hash,
            date_joined: Utc::now(),
        }
    }
}

/// `jane.doe@example.com` -> `jane.doe`
pub fn username_from_email(email: &str) -> String {
    email.trim().split('@').next().unwrap_or_default().to_lowercase()
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub about: Option<String>,
    pub gender: Option<String>,
    pub mobile: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub date: DateTime<Utc>,
}

impl Profile {
    pub fn for_user(user: &User) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user.id,
            full_name: Some(user.full_name.clone()),
            about: None,
            gender: None,
            mobile: user.phone.clone(),
            country: None,
            state: None,
            city: None,
            address: None,
            date: Utc::now(),
        }
    }

    /// Overwrites every field that is present in `update`.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if update.full_name.is_some() { self.full_name = update.full_name; }
        if update.about.is_some() { self.about = update.about; }
        if update.gender.is_some() { self.gender = update.gender; }
        if update.mobile.is_some() { self.mobile = update.mobile; }
        if update.country.is_some() { self.country = update.country; }
        if update.state.is_some() { self.state = update.state; }
        if update.city.is_some() { self.city = update.city; }
        if update.address.is_some() { self.address = update.address; }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub about: Option<String>,
    pub gender: Option<String>,
    pub mobile: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vendor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub mobile: Option<String>,
    pub active: bool,
    pub slug: String,
    pub date: DateTime<Utc>,
}

impl Vendor {
    pub fn new(user_id: Uuid, name: &str, description: Option<String>, mobile: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            name: name.trim().to_string(),
            description,
            mobile,
            active: true,
            slug: slugify(name),
            date: Utc::now(),
        }
    }
}
