//! Buyer/seller chat

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::Product;
use crate::chat::{Chat, ChatMessage, ChatParticipant, ChatSummary, CreateChatRequest};
use crate::error::{ApiError, ApiResult};
use crate::models::User;
use crate::notify::{chat_message_received, Notifier};
use crate::store::{collections, DocumentStore, Filter, FindOptions, Update};

const CHAT_LIST_LIMIT: u64 = 100;
const MESSAGE_HISTORY_LIMIT: u64 = 500;

pub struct ChatService {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
}

impl ChatService {
    pub fn new(store: Arc<dyn DocumentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Load a chat the user takes part in
    async fn participant_chat(&self, chat_id: Uuid, user: &User) -> ApiResult<Chat> {
        let chat: Chat = self
            .store
            .find_record(collections::CHATS, &Filter::by_id(chat_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Chat not found".to_string()))?;
        if !chat.has_participant(user.id) {
            return Err(ApiError::Forbidden("Access denied".to_string()));
        }
        Ok(chat)
    }

    async fn participant(&self, user_id: Uuid) -> ApiResult<Option<ChatParticipant>> {
        let user: Option<User> = self
            .store
            .find_record(collections::USERS, &Filter::by_id(user_id))
            .await?;
        Ok(user.map(|u| ChatParticipant {
            id: u.id,
            full_name: u.full_name,
            avatar: u.avatar,
        }))
    }

    async fn product(&self, product_id: Option<Uuid>) -> ApiResult<Option<Product>> {
        match product_id {
            Some(id) => Ok(self
                .store
                .find_record(collections::PRODUCTS, &Filter::by_id(id))
                .await?),
            None => Ok(None),
        }
    }

    fn unread_filter(chat_id: Uuid, reader: Uuid) -> Filter {
        Filter::new()
            .eq("chat_id", chat_id)
            .ne("sender_id", reader)
            .eq("read", false)
    }

    async fn summarize(&self, chat: Chat, user: &User) -> ApiResult<ChatSummary> {
        let other_user = self.participant(chat.other_participant(user.id)).await?;
        let product = self.product(chat.product_id).await?;
        let unread_count = self
            .store
            .count(
                collections::CHAT_MESSAGES,
                &Self::unread_filter(chat.id, user.id),
            )
            .await?;

        Ok(ChatSummary {
            chat,
            other_user,
            product,
            unread_count,
        })
    }

    /// Chats the user takes part in, most recently active first
    pub async fn list_chats(&self, user: &User) -> ApiResult<Vec<ChatSummary>> {
        let chats: Vec<Chat> = self
            .store
            .find_records(
                collections::CHATS,
                &Filter::new().any_of(vec![
                    Filter::new().eq("buyer_id", user.id),
                    Filter::new().eq("seller_id", user.id),
                ]),
                &FindOptions::new()
                    .sort_desc("last_message_at")
                    .limit(CHAT_LIST_LIMIT),
            )
            .await?;

        let mut summaries = Vec::with_capacity(chats.len());
        for chat in chats {
            summaries.push(self.summarize(chat, user).await?);
        }
        Ok(summaries)
    }

    /// Return the existing chat for (buyer, seller, product) or open a new one
    pub async fn create_or_get(&self, buyer: &User, request: CreateChatRequest) -> ApiResult<Chat> {
        if buyer.id == request.seller_id {
            return Err(ApiError::BadRequest("Cannot chat with yourself".to_string()));
        }

        let filter = Filter::new()
            .eq("buyer_id", buyer.id)
            .eq("seller_id", request.seller_id)
            .eq("product_id", request.product_id);
        if let Some(existing) = self.store.find_record(collections::CHATS, &filter).await? {
            return Ok(existing);
        }

        if self.participant(request.seller_id).await?.is_none() {
            return Err(ApiError::NotFound("Seller not found".to_string()));
        }

        let chat = Chat {
            id: Uuid::new_v4(),
            buyer_id: buyer.id,
            seller_id: request.seller_id,
            product_id: request.product_id,
            created_at: Utc::now(),
            last_message: None,
            last_message_at: None,
        };
        self.store.insert_record(collections::CHATS, &chat).await?;

        tracing::debug!(chat_id = %chat.id, buyer_id = %buyer.id, seller_id = %chat.seller_id, "Chat opened");
        Ok(chat)
    }

    pub async fn get_chat(&self, chat_id: Uuid, user: &User) -> ApiResult<ChatSummary> {
        let chat = self.participant_chat(chat_id, user).await?;
        self.summarize(chat, user).await
    }

    /// Message history, oldest first. Marks the other side's messages read.
    pub async fn messages(&self, chat_id: Uuid, user: &User) -> ApiResult<Vec<ChatMessage>> {
        self.participant_chat(chat_id, user).await?;

        let messages = self
            .store
            .find_records(
                collections::CHAT_MESSAGES,
                &Filter::new().eq("chat_id", chat_id),
                &FindOptions::new()
                    .sort_asc("created_at")
                    .limit(MESSAGE_HISTORY_LIMIT),
            )
            .await?;

        self.store
            .update_many(
                collections::CHAT_MESSAGES,
                &Self::unread_filter(chat_id, user.id),
                &Update::new().set("read", true),
            )
            .await?;

        Ok(messages)
    }

    pub async fn send_message(
        &self,
        chat_id: Uuid,
        sender: &User,
        content: String,
    ) -> ApiResult<ChatMessage> {
        let chat = self.participant_chat(chat_id, sender).await?;

        let message = ChatMessage {
            id: Uuid::new_v4(),
            chat_id,
            sender_id: sender.id,
            content,
            created_at: Utc::now(),
            read: false,
        };
        self.store
            .insert_record(collections::CHAT_MESSAGES, &message)
            .await?;

        self.store
            .update_one(
                collections::CHATS,
                &Filter::by_id(chat_id),
                &Update::new()
                    .set("last_message", &message.content)
                    .set("last_message_at", message.created_at),
            )
            .await?;

        self.notify_recipient(&chat, sender, &message.content).await;
        Ok(message)
    }

    async fn notify_recipient(&self, chat: &Chat, sender: &User, content: &str) {
        let recipient_id = chat.other_participant(sender.id);
        let recipient: Option<User> = match self
            .store
            .find_record(collections::USERS, &Filter::by_id(recipient_id))
            .await
        {
            Ok(recipient) => recipient,
            Err(e) => {
                tracing::warn!(chat_id = %chat.id, error = %e, "Could not load chat recipient");
                return;
            }
        };
        let Some(telegram_id) = recipient.and_then(|r| r.telegram_id) else {
            return;
        };

        let product_title = match self.product(chat.product_id).await {
            Ok(product) => product.map(|p| p.title),
            Err(_) => None,
        };
        let message = chat_message_received(&sender.full_name, product_title.as_deref(), content);
        self.notifier.notify(telegram_id, &message).await;
    }
}
