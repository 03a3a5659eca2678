//! Chat HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::AuthenticatedUser;
use crate::chat::{Chat, ChatMessage, ChatSummary, CreateChatRequest, SendMessageRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /chats - Chats of the caller with unread counts
pub async fn list_chats(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
    Ok(Json(state.chat_service.list_chats(&user).await?))
}

/// POST /chats?seller_id=&product_id= - Open or reuse a chat with a seller
pub async fn create_chat(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(req): Query<CreateChatRequest>,
) -> Result<Json<Chat>, ApiError> {
    Ok(Json(state.chat_service.create_or_get(&user, req).await?))
}

/// GET /chats/:id
pub async fn get_chat(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSummary>, ApiError> {
    Ok(Json(state.chat_service.get_chat(id, &user).await?))
}

/// GET /chats/:id/messages
pub async fn list_messages(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.chat_service.messages(id, &user).await?))
}

/// POST /chats/:id/messages
pub async fn send_message(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    req.validate()?;
    Ok(Json(
        state
            .chat_service
            .send_message(id, &user, req.content)
            .await?,
    ))
}
