//! Authentication models for GameHub

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use super::{UserResponse, UserRole};

/// What a one-time token may be exchanged for
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Issued by the bot, exchanged by the web client for a session
    BotLogin,
    /// Issued to a logged-in user, redeemed by the bot to bind a Telegram account
    TelegramLink,
}

/// Single-use token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OneTimeToken {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub purpose: TokenPurpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Password registration
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Password login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Set or change the account password
#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    pub new_password: String,
}

/// Session token response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

impl AuthResponse {
    pub fn bearer(access_token: String, user: UserResponse) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            user,
        }
    }
}

/// Payload produced by the Telegram login widget
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WidgetAuthData {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

impl WidgetAuthData {
    /// Signed fields: every present field except `hash`, keyed by name
    pub fn signed_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), self.id.to_string());
        fields.insert("first_name".to_string(), self.first_name.clone());
        fields.insert("auth_date".to_string(), self.auth_date.to_string());
        if let Some(last_name) = &self.last_name {
            fields.insert("last_name".to_string(), last_name.clone());
        }
        if let Some(username) = &self.username {
            fields.insert("username".to_string(), username.clone());
        }
        if let Some(photo_url) = &self.photo_url {
            fields.insert("photo_url".to_string(), photo_url.clone());
        }
        fields
    }

    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// `?token=` for bot-token login
#[derive(Debug, Deserialize)]
pub struct BotTokenQuery {
    pub token: String,
}

/// Link code issued to a logged-in user
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkCodeResponse {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Bot request for a one-time login token
#[derive(Debug, Serialize, Deserialize)]
pub struct BotLoginTokenRequest {
    pub telegram_id: i64,
}

/// One-time login token handed to the bot
#[derive(Debug, Serialize, Deserialize)]
pub struct BotLoginTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Bot request redeeming a link code
#[derive(Debug, Serialize, Deserialize)]
pub struct BotLinkRequest {
    pub code: String,
    pub telegram_id: i64,
    #[serde(default)]
    pub username: Option<String>,
}
