//! EmailChannel - plain text mail through an SMTP relay

use std::time::Duration;

use contracts::{ContractError, EmailConfig, Notification, NotifyChannel};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, instrument};

use crate::error::DispatcherError;

const CHANNEL_NAME: &str = "email";

pub const SUBJECT: &str = "Новая заявка с формы регистрации";

/// Channel mailing each lead to one recipient
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    /// Create the channel
    ///
    /// STARTTLS and login are used only when both user and password are set.
    ///
    /// # Errors
    /// `ChannelCreation` when an address does not parse or the relay is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, DispatcherError> {
        let from: Mailbox = config.sender().parse().map_err(|e| {
            DispatcherError::channel_creation(CHANNEL_NAME, format!("invalid sender: {e}"))
        })?;
        let to: Mailbox = config.to.parse().map_err(|e| {
            DispatcherError::channel_creation(CHANNEL_NAME, format!("invalid recipient: {e}"))
        })?;

        let timeout = Some(Duration::from_secs(config.timeout_secs));
        let transport = if config.uses_auth() {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
                .map_err(|e| DispatcherError::channel_creation(CHANNEL_NAME, e.to_string()))?
                .port(config.port)
                .credentials(Credentials::new(
                    config.user.clone(),
                    config.password.clone(),
                ))
                .timeout(timeout)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
                .port(config.port)
                .timeout(timeout)
                .build()
        };

        info!(
            server = %config.server,
            port = config.port,
            to = %to,
            auth = config.uses_auth(),
            "Email channel initialized"
        );

        Ok(Self { transport, from, to })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, ContractError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(format_body(notification))
            .map_err(|e| ContractError::channel_send(CHANNEL_NAME, e.to_string()))
    }
}

impl NotifyChannel for EmailChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    #[instrument(
        name = "email_send",
        skip(self, notification),
        fields(row = notification.lead.row_index, to = %self.to)
    )]
    async fn send(&mut self, notification: &Notification) -> Result<(), ContractError> {
        let message = self.build_message(notification)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ContractError::channel_send(CHANNEL_NAME, e.to_string()))?;

        debug!("Email sent");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Plain text body: the named fields, then the whole submission as JSON
pub(crate) fn format_body(notification: &Notification) -> String {
    let raw = serde_json::to_string_pretty(&notification.lead.submission)
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "{SUBJECT}\n\n\
         Время отправки: {}\n\
         ФИО: {}\n\
         Email: {}\n\
         Время обработки: {}\n\n\
         Полные данные:\n{raw}\n",
        notification.captured_at_or_default(),
        notification.full_name_or_default(),
        notification.email_or_default(),
        notification.processed_at_display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::notification;

    fn config() -> EmailConfig {
        EmailConfig {
            to: "sales@example.org".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_body_contains_fields_and_json() {
        let body = format_body(&notification(1));
        assert!(body.starts_with(SUBJECT));
        assert!(body.contains("ФИО: Alice <Admin>"));
        assert!(body.contains("Время обработки: 01.02.2024 10:00:30"));
        assert!(body.contains("\"Email\": \"a@x.com\""), "got: {body}");
    }

    #[tokio::test]
    async fn test_message_headers() {
        let channel = EmailChannel::new(&config()).unwrap();
        let message = channel.build_message(&notification(1)).unwrap();
        let headers = message.headers().to_string();

        assert!(headers.contains("From: noreply@example.com"), "got: {headers}");
        assert!(headers.contains("To: sales@example.org"), "got: {headers}");
    }

    #[tokio::test]
    async fn test_plain_login_sends_from_default_sender() {
        let config = EmailConfig {
            to: "sales@example.org".into(),
            user: "postfix".into(),
            ..Default::default()
        };
        let channel = EmailChannel::new(&config).unwrap();
        let message = channel.build_message(&notification(1)).unwrap();
        let headers = message.headers().to_string();

        assert!(headers.contains("From: noreply@example.com"), "got: {headers}");
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let config = EmailConfig {
            to: "not an address".into(),
            ..Default::default()
        };
        assert!(matches!(
            EmailChannel::new(&config),
            Err(DispatcherError::ChannelCreation { .. })
        ));
    }
}
