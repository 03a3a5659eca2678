//! Chat models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::Product;

/// Conversation between a buyer and a seller, optionally about a product
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Chat {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Chat {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.buyer_id == user_id {
            self.seller_id
        } else {
            self.buyer_id
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Minimal view of the other side of a chat
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatParticipant {
    pub id: Uuid,
    pub full_name: String,
    pub avatar: Option<String>,
}

/// Chat as listed for one participant
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatSummary {
    #[serde(flatten)]
    pub chat: Chat,
    pub other_user: Option<ChatParticipant>,
    pub product: Option<Product>,
    pub unread_count: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatRequest {
    pub seller_id: Uuid,
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub content: String,
}
