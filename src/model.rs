//! Persisted records.
//!
//! Field names serialize in camelCase so stored documents read
//! `displayName`, `passwordHash`, `createdAt` and so on.

use crate::security::hashing::HashScheme;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    /// Lower-cased; unique across users.
    pub email: String,
    pub role: Role,
    pub salt: String,
    pub password_hash: String,
    /// Scheme `password_hash` was produced with.
    #[serde(default)]
    pub scheme: HashScheme,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// The signed-in identity: a read-only projection of one [`User`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Failed-login bookkeeping for the whole install.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LockState {
    /// Consecutive failed attempts since the last successful login.
    pub fails: u32,
    /// Epoch milliseconds until which logins are rejected; 0 when unset.
    pub until: i64,
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// A rating plus comment left on an [`Item`]. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub item_id: String,
    pub rating: u8,
    pub comment: String,
    pub by_id: String,
    pub by_name: String,
    pub created_at: DateTime<Utc>,
}

/// Fresh random identifier.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
