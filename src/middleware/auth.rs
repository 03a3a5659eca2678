//! Authentication middleware
//!
//! Extractors that resolve the bearer token to the current user record.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::{AuthError, AuthService};
use crate::error::ApiError;
use crate::models::User;

/// Authenticated user extracted from the session token
///
/// The user record is loaded on every request, so role changes and
/// deletions take effect before the token expires.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, {}", user.full_name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let user = auth_service
            .authenticate(bearer.token())
            .await
            .map_err(|e| match e {
                AuthError::SessionExpired => ApiError::Unauthorized("Token has expired".to_string()),
                AuthError::InvalidSession => ApiError::Unauthorized("Invalid token".to_string()),
                other => other.into(),
            })?;

        Ok(AuthenticatedUser(user))
    }
}

/// Extractor requiring the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser(user))
    }
}
