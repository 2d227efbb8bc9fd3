use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Local mirror of an identity-provider account.
///
/// `id` is the provider's subject claim; the application never mints its own
/// user identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub last_signed_in: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to the provisioning upsert.
///
/// Optional fields that are `None` leave the stored value untouched when the
/// user already exists. On insert a missing email becomes `placeholder_email`
/// and a missing `provider_id` becomes the user id.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertUser {
    pub id: String,
    pub email: Option<String>,
    pub placeholder_email: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub signed_in_at: DateTime<Utc>,
}

/// Body of `GET /api/user/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub provider: Option<String>,
    pub last_signed_in: DateTime<Utc>,
    pub notes_count: i64,
}

impl UserProfile {
    pub fn from_user(user: User, notes_count: i64) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            first_name: user.first_name,
            last_name: user.last_name,
            image_url: user.image_url,
            provider: user.provider,
            last_signed_in: user.last_signed_in,
            notes_count,
        }
    }
}
