//! JWT session token generation and validation

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Sessions last a fixed seven days
pub const SESSION_TTL_DAYS: i64 = 7;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims for session tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// JWT ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Generate a session token issued now
pub fn generate_token(user_id: Uuid, secret: &str, algorithm: Algorithm) -> Result<String, JwtError> {
    generate_token_at(user_id, secret, algorithm, Utc::now())
}

/// Generate a session token as if issued at `issued_at`
pub fn generate_token_at(
    user_id: Uuid,
    secret: &str,
    algorithm: Algorithm,
    issued_at: DateTime<Utc>,
) -> Result<String, JwtError> {
    let exp = issued_at + Duration::days(SESSION_TTL_DAYS);

    let claims = Claims {
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: issued_at.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify a session token and return the user it was issued to
pub fn verify_token(token: &str, secret: &str, algorithm: Algorithm) -> Result<Uuid, JwtError> {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::InvalidToken(e.to_string()),
    })?;

    Uuid::parse_str(&token_data.claims.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))
}
