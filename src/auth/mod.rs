//! Authentication module for GameHub
//!
//! - Password accounts hashed with bcrypt
//! - JWT session tokens
//! - Telegram login widget verification, linking and unlinking
//! - Single-use tokens exchanged with the Telegram bot

pub mod crypto;
mod jwt;
mod password;
mod service;

pub use crypto::{sign_payload, sign_widget_fields, verify_widget_signature};
pub use jwt::{generate_token, generate_token_at, verify_token, Claims, JwtError, SESSION_TTL_DAYS};
pub use password::{hash_password, verify_password};
pub use service::{AuthError, AuthService, AuthSettings};

use crate::error::ApiError;

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => e.into(),
            AuthError::Hashing(_) | AuthError::Token(_) => ApiError::InternalError(err.to_string()),
            AuthError::SessionExpired
            | AuthError::InvalidSession
            | AuthError::InvalidCredentials
            | AuthError::InvalidSignature
            | AuthError::WidgetAuthExpired
            | AuthError::OneTimeTokenNotFound
            | AuthError::OneTimeTokenExpired => ApiError::Unauthorized(err.to_string()),
            AuthError::WrongPassword | AuthError::RoleNotAllowed => {
                ApiError::BadRequest(err.to_string())
            }
            AuthError::EmailTaken | AuthError::TelegramAlreadyLinked => {
                ApiError::Conflict(err.to_string())
            }
            AuthError::TelegramNotLinked | AuthError::PasswordRequired => {
                ApiError::InvalidState(err.to_string())
            }
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::TelegramNotConfigured => ApiError::Misconfigured(err.to_string()),
        }
    }
}
