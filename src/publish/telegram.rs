//! Telegram bot notifications

use super::Notifier;
use crate::{CharityError, Result};
use serde::Serialize;

const API_BASE: &str = "https://api.telegram.org";

/// Sends a copy of each post to a Telegram chat
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("charity/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(TelegramNotifier {
            client,
            api_base: API_BASE.to_string(),
            bot_token,
            chat_id,
        })
    }

    /// Notifier from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`, or `None`
    /// when either is unset
    pub fn from_env() -> Result<Option<Self>> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.is_empty());
        let chat = std::env::var("TELEGRAM_CHAT_ID").ok().filter(|v| !v.is_empty());

        match (token, chat) {
            (Some(token), Some(chat)) => {
                log::info!("Telegram notifications enabled");
                Ok(Some(Self::new(token, chat)?))
            }
            _ => {
                log::debug!("Telegram notifications disabled");
                Ok(None)
            }
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.send_message_url())
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CharityError::Publish {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("Telegram notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_url() {
        let notifier = TelegramNotifier::new("123:abc".to_string(), "42".to_string()).unwrap();
        assert_eq!(
            notifier.send_message_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );

        let notifier = notifier.with_api_base("http://localhost:8081/");
        assert_eq!(
            notifier.send_message_url(),
            "http://localhost:8081/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_payload_shape() {
        let body = serde_json::to_value(SendMessage {
            chat_id: "42",
            text: "UC shot 12/20",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"chat_id": "42", "text": "UC shot 12/20"}));
    }
}
