//! Outbound notification sink

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::NotificationConfig;
use crate::data::{DataError, DataResult};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a rendered (HTML) message
    async fn dispatch(&self, message: &str) -> DataResult<()>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Telegram Bot API `sendMessage` client
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &NotificationConfig) -> DataResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("brondby-tracker/0.1.0")
            .build()?;

        Ok(Self {
            client,
            bot_token: config.telegram_bot_token.clone(),
            chat_id: config.telegram_chat_id.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn dispatch(&self, message: &str) -> DataResult<()> {
        let (token, chat_id) = match (&self.bot_token, &self.chat_id) {
            (Some(token), Some(chat_id)) => (token, chat_id),
            _ => {
                warn!("Telegram credentials not configured");
                return Err(DataError::Config(
                    "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set".to_string(),
                ));
            }
        };

        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API, token);
        debug!(chars = message.chars().count(), "Sending Telegram message");

        let response = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id,
                text: message,
                parse_mode: "HTML",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            error!(status_code, "Failed to send Telegram message: {}", error_text);
            return Err(DataError::notification_error(status_code, error_text));
        }

        info!("Telegram message sent");
        Ok(())
    }
}

/// Keeps every dispatched message in memory; optionally refuses delivery.
/// Used by the demo run and by tests.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every dispatch fails with a 503
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn dispatch(&self, message: &str) -> DataResult<()> {
        if self.fail {
            return Err(DataError::notification_error(503, "delivery refused"));
        }
        self.messages
            .lock()
            .map_err(|_| DataError::Internal("notifier lock poisoned".to_string()))?
            .push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_telegram_fails_without_network() {
        let notifier = TelegramNotifier::new(&NotificationConfig {
            telegram_bot_token: None,
            telegram_chat_id: Some("42".to_string()),
            timeout_seconds: 1,
        })
        .unwrap();

        assert!(!notifier.is_configured());
        let err = notifier.dispatch("hello").await.unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.dispatch("one").await.unwrap();
        notifier.dispatch("two").await.unwrap();
        assert_eq!(notifier.messages(), vec!["one", "two"]);

        let failing = RecordingNotifier::failing();
        let err = failing.dispatch("three").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(failing.messages().is_empty());
    }
}
