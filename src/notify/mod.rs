//! Best-effort user notifications
//!
//! Delivery is a side effect only: a failed or timed-out send is logged and
//! reported as `false`, never surfaced to the caller's request.

mod messages;
mod telegram;

use axum::async_trait;

pub use messages::{buyer_order_paid, chat_message_received, escape_html, seller_new_sale, SaleLine};
pub use telegram::TelegramNotifier;

/// Sends a message to a user's Telegram chat
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns whether the message was accepted for delivery
    async fn notify(&self, chat_id: i64, message: &str) -> bool;
}

/// Used when no bot token is configured
#[derive(Debug, Default, Clone)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, chat_id: i64, _message: &str) -> bool {
        tracing::debug!(chat_id, "Notifications disabled, message dropped");
        false
    }
}
