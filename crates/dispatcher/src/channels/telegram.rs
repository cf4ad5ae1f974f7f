//! TelegramChannel - Bot API `sendMessage` with HTML formatting

use std::time::Duration;

use contracts::{ChatId, ContractError, Notification, NotifyChannel, TelegramConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::DispatcherError;

const CHANNEL_NAME: &str = "telegram";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a ChatId,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Channel posting to a Telegram chat through a bot
pub struct TelegramChannel {
    client: reqwest::Client,
    /// Contains the bot token; never log it
    endpoint: String,
    chat_id: ChatId,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramChannel {
    /// Create the channel
    ///
    /// # Errors
    /// `ChannelCreation` when the chat id is neither numeric nor `@channel`,
    /// or the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Result<Self, DispatcherError> {
        let chat_id = config.parsed_chat_id().ok_or_else(|| {
            DispatcherError::channel_creation(
                CHANNEL_NAME,
                format!("invalid chat id '{}'", config.chat_id),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatcherError::channel_creation(CHANNEL_NAME, e.to_string()))?;

        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );

        info!(chat_id = %chat_id, "Telegram channel initialized");
        Ok(Self {
            client,
            endpoint,
            chat_id,
        })
    }
}

impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    #[instrument(
        name = "telegram_send",
        skip(self, notification),
        fields(row = notification.lead.row_index)
    )]
    async fn send(&mut self, notification: &Notification) -> Result<(), ContractError> {
        let text = format_message(notification);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ContractError::channel_send(CHANNEL_NAME, e.without_url().to_string()))?;

        let status = response.status();
        let reply: BotResponse = response.json().await.map_err(|e| {
            ContractError::channel_send(
                CHANNEL_NAME,
                format!("unreadable response (status {status}): {}", e.without_url()),
            )
        })?;

        if !reply.ok {
            return Err(ContractError::channel_send(
                CHANNEL_NAME,
                reply
                    .description
                    .unwrap_or_else(|| format!("rejected with status {status}")),
            ));
        }

        debug!("Notification sent to Telegram");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Message body in Telegram's HTML subset
pub(crate) fn format_message(notification: &Notification) -> String {
    format!(
        "<b>🎯 Новая заявка с формы регистрации</b>\n\n\
         <b>📅 Время:</b> {}\n\
         <b>👤 ФИО:</b> {}\n\
         <b>📧 Email:</b> {}\n\
         <b>🕐 Обработано:</b> {}\n",
        escape_html(notification.captured_at_or_default()),
        escape_html(notification.full_name_or_default()),
        escape_html(notification.email_or_default()),
        notification.processed_at_display(),
    )
}

/// Escape the characters Telegram's HTML parser treats specially
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::notification;

    #[test]
    fn test_chat_id_serialised_by_form() {
        let numeric = serde_json::to_value(SendMessage {
            chat_id: &ChatId::Id(-100200),
            text: "hi",
            parse_mode: "HTML",
        })
        .unwrap();
        assert_eq!(numeric["chat_id"], serde_json::json!(-100200));

        let channel = serde_json::to_value(SendMessage {
            chat_id: &ChatId::Channel("@leads".into()),
            text: "hi",
            parse_mode: "HTML",
        })
        .unwrap();
        assert_eq!(channel["chat_id"], "@leads");
    }

    #[test]
    fn test_message_escapes_cells() {
        let text = format_message(&notification(1));
        assert!(text.contains("<b>👤 ФИО:</b> Alice &lt;Admin&gt;"), "got: {text}");
        assert!(text.contains("<b>📧 Email:</b> a@x.com"));
        assert!(text.contains("<b>🕐 Обработано:</b> 01.02.2024 10:00:30"));
    }

    #[test]
    fn test_invalid_chat_id_rejected() {
        let config = TelegramConfig {
            bot_token: "1:a".into(),
            chat_id: "leads".into(),
            ..Default::default()
        };
        assert!(matches!(
            TelegramChannel::new(&config, Duration::from_secs(1)),
            Err(DispatcherError::ChannelCreation { .. })
        ));
    }

    #[test]
    fn test_endpoint_layout() {
        let config = TelegramConfig {
            bot_token: "1:a".into(),
            chat_id: "42".into(),
            api_base: "http://localhost:8081/".into(),
        };
        let channel = TelegramChannel::new(&config, Duration::from_secs(1)).unwrap();
        assert_eq!(channel.endpoint, "http://localhost:8081/bot1:a/sendMessage");
        assert!(!format!("{channel:?}").contains("1:a"));
    }
}
