//! Authentication HTTP handlers
//!
//! Password accounts, Telegram widget login and linking, and the
//! bot-facing token endpoints.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{
    AuthResponse, BotLinkRequest, BotLoginTokenRequest, BotLoginTokenResponse, BotTokenQuery,
    LinkCodeResponse, LoginRequest, RegisterRequest, SetPasswordRequest, UserResponse,
    WidgetAuthData,
};
use crate::state::AppState;

/// Header carrying the bot's HMAC over the raw request body
pub const BOT_SIGNATURE_HEADER: &str = "x-bot-signature";

/// POST /auth/register - Create a password account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    req.validate()?;
    Ok(Json(state.auth_service.register(req).await?))
}

/// POST /auth/login - Email and password login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(state.auth_service.login(req).await?))
}

/// GET /auth/me - Get current authenticated user
pub async fn get_current_user(
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// POST /auth/password - Set or change the password
pub async fn set_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<SetPasswordRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    req.validate()?;
    let user = state.auth_service.set_password(&user, req).await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /auth/widget/login - Log in with the Telegram widget payload
pub async fn widget_login(
    State(state): State<AppState>,
    Json(data): Json<WidgetAuthData>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(state.auth_service.telegram_login(data).await?))
}

/// POST /auth/widget/link - Bind a Telegram identity to the current account
pub async fn widget_link(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(data): Json<WidgetAuthData>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.link_telegram(&user, data).await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /auth/widget/unlink - Remove the Telegram identity
pub async fn widget_unlink(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.unlink_telegram(&user).await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /auth/bot-token?token= - Exchange a bot-issued one-time token for a session
pub async fn bot_token_login(
    State(state): State<AppState>,
    Query(query): Query<BotTokenQuery>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(
        state.auth_service.login_with_bot_token(&query.token).await?,
    ))
}

/// POST /auth/telegram/link-code - Issue a code to send to the bot
pub async fn create_link_code(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<LinkCodeResponse>, ApiError> {
    Ok(Json(state.auth_service.create_link_code(&user).await?))
}

/// Verify the bot signature over the raw body, then decode it
fn signed_bot_body<T: DeserializeOwned>(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<T, ApiError> {
    let signature = headers
        .get(BOT_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    state.auth_service.verify_bot_request(body, signature)?;
    Ok(serde_json::from_slice(body)?)
}

/// POST /bot/link - Bot redeems a link code for a Telegram user
pub async fn bot_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UserResponse>, ApiError> {
    let req: BotLinkRequest = signed_bot_body(&state, &headers, &body)?;
    let user = state.auth_service.redeem_link_code(req).await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /bot/login-token - Bot requests a one-time web login token
pub async fn bot_login_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BotLoginTokenResponse>, ApiError> {
    let req: BotLoginTokenRequest = signed_bot_body(&state, &headers, &body)?;
    Ok(Json(
        state
            .auth_service
            .issue_bot_login_token(req.telegram_id)
            .await?,
    ))
}
