//! Route definitions for the GameHub API
//!
//! Every group is mounted under `/api` by [`api_routes`].

mod admin;
mod auth;
mod catalog;
mod chat;
mod content;
mod orders;
mod wallet;

use axum::Router;

use crate::state::AppState;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use catalog::catalog_routes;
pub use chat::chat_routes;
pub use content::content_routes;
pub use orders::order_routes;
pub use wallet::wallet_routes;

/// All API routes, to be nested under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(catalog_routes())
        .merge(order_routes())
        .merge(chat_routes())
        .merge(content_routes())
        .merge(wallet_routes())
        .merge(admin_routes())
}
