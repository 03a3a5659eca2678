//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/password", post(auth::set_password))
        .route("/auth/widget/login", post(auth::widget_login))
        .route("/auth/telegram/widget", post(auth::widget_login))
        .route("/auth/widget/link", post(auth::widget_link))
        .route("/auth/telegram/link", post(auth::widget_link))
        .route("/auth/widget/unlink", post(auth::widget_unlink))
        .route("/auth/telegram/unlink", post(auth::widget_unlink))
        .route("/auth/bot-token", post(auth::bot_token_login))
        .route("/auth/telegram/bot-token", post(auth::bot_token_login))
        .route("/auth/telegram/link-code", post(auth::create_link_code))
        .route("/bot/link", post(auth::bot_link))
        .route("/bot/login-token", post(auth::bot_login_token))
}
