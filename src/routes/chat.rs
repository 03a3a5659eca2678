//! Chat routes

use axum::{routing::get, Router};

use crate::handlers::chat;
use crate::state::AppState;

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chats", get(chat::list_chats).post(chat::create_chat))
        .route("/chats/:id", get(chat::get_chat))
        .route(
            "/chats/:id/messages",
            get(chat::list_messages).post(chat::send_message),
        )
}
