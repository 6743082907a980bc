pub mod error;

pub use error::{Result, TelegramError};

use std::time::Duration;

use tracing::warn;

/// HTTP client for the Telegram Bot `sendMessage` endpoint.
pub struct TelegramClient {
    client: reqwest::Client,
    token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(token: &str, chat_id: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    /// Send a plain-text message to the configured chat.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let endpoint = format!("https://api.telegram.org/bot{}/sendMessage", self.token);

        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": false,
        });

        let resp = self.client.post(&endpoint).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %message, "Telegram API returned non-success");
            return Err(TelegramError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
