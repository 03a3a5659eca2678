//! Data models shared across GameHub domains

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::FindOptions;

pub mod auth;
pub use auth::*;

/// User model as stored
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
    pub full_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub telegram_id: Option<i64>,
    #[serde(default)]
    pub telegram_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// User roles
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Buyer,
    Seller,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Buyer => "buyer",
            UserRole::Seller => "seller",
            UserRole::Admin => "admin",
        }
    }
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: String,
    pub role: UserRole,
    pub avatar: Option<String>,
    pub balance: f64,
    pub telegram_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            has_password: user.has_password(),
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            avatar: user.avatar,
            balance: user.balance,
            telegram_id: user.telegram_id,
            telegram_username: user.telegram_username,
            created_at: user.created_at,
        }
    }
}

/// Public seller profile
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SellerProfile {
    pub id: Uuid,
    pub full_name: String,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for SellerProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            avatar: user.avatar,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// `?skip=&limit=` query parameters
#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct Pagination {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 100;

    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip: Some(skip),
            limit: Some(limit),
        }
    }

    /// Newest-first find options with the limit clamped
    pub fn newest_first(&self, sort_field: &str) -> FindOptions {
        FindOptions::new()
            .sort_desc(sort_field)
            .skip(self.skip.unwrap_or(0))
            .limit(
                self.limit
                    .unwrap_or(Self::DEFAULT_LIMIT)
                    .clamp(1, Self::MAX_LIMIT),
            )
    }
}

/// Round a money amount to cents
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_response_hides_password() {
        let user = User {
            id: Uuid::new_v4(),
            email: Some("buyer@example.com".to_string()),
            password_hash: Some("$2b$12$hash".to_string()),
            full_name: "Buyer".to_string(),
            role: UserRole::Buyer,
            avatar: None,
            balance: 0.0,
            telegram_id: None,
            telegram_username: None,
            created_at: Utc::now(),
        };

        let response = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(response.get("password_hash").is_none());
        assert_eq!(response["has_password"], true);
        assert_eq!(response["role"], "buyer");
    }

    #[test]
    fn test_pagination_clamps_limit() {
        let options = Pagination::new(5, 10_000).newest_first("created_at");
        assert_eq!(options.skip, 5);
        assert_eq!(options.limit, Some(Pagination::MAX_LIMIT));
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(19.999), 20.0);
        assert_eq!(round_money(0.1 + 0.2), 0.3);
    }
}
