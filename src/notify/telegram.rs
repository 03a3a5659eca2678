use axum::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

/// Telegram Bot API `sendMessage` client
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, bot_token: String, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token,
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, chat_id: i64, message: &str) -> bool {
        let body = SendMessage {
            chat_id,
            text: message,
            parse_mode: "HTML",
        };

        match self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(chat_id, status = response.status().as_u16(), "Telegram rejected notification");
                false
            }
            Err(e) => {
                // reqwest errors embed the URL, which carries the bot token
                let reason = if e.is_timeout() { "timeout" } else { "transport error" };
                tracing::warn!(chat_id, reason, "Failed to send Telegram notification");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_url() {
        let notifier = TelegramNotifier::new(
            "https://api.telegram.org/",
            "123:abc".to_string(),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(
            notifier.send_message_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[tokio::test]
    async fn test_unreachable_api_reports_failure() {
        let notifier = TelegramNotifier::new(
            "http://127.0.0.1:9",
            "123:abc".to_string(),
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(!notifier.notify(1, "hello").await);
    }
}
