//! LeadsConfig - Config Loader output
//!
//! Every option of the poller in one explicit value, built once at startup and
//! handed to each component's constructor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::WatermarkKey;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete poller configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LeadsConfig {
    /// Config version
    pub version: ConfigVersion,

    /// Spreadsheet to poll
    #[validate(nested)]
    pub source: SourceConfig,

    /// Which columns carry the named lead fields
    pub columns: ColumnMapping,

    /// Lead storage
    #[validate(nested)]
    pub storage: StorageConfig,

    /// Notification channels
    #[validate(nested)]
    pub notify: NotifyConfig,

    /// Poll timer
    #[validate(nested)]
    pub schedule: ScheduleConfig,

    /// Log output
    pub logging: LoggingConfig,

    /// Watermark persistence
    pub state: StateConfig,

    /// Prometheus exporter
    pub metrics: MetricsConfig,
}

impl LeadsConfig {
    /// Watermark key of the configured sheet view
    pub fn watermark_key(&self) -> WatermarkKey {
        WatermarkKey::new(&self.source.sheet_id, &self.source.view_name)
    }
}

/// Google Sheets source
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourceConfig {
    /// Spreadsheet identifier (required)
    #[validate(length(min = 1, message = "sheet id is required"))]
    pub sheet_id: String,

    /// View (tab) name
    #[validate(length(min = 1, message = "view name cannot be empty"))]
    pub view_name: String,

    /// Service account key file (required)
    pub credentials_path: PathBuf,

    /// Column span fetched from the view, e.g. `A:Z`
    #[validate(length(min = 1))]
    pub range_columns: String,

    /// HTTP request timeout
    #[validate(range(min = 1, message = "request timeout must be > 0"))]
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sheet_id: String::new(),
            view_name: "Form Responses 1".to_string(),
            credentials_path: PathBuf::new(),
            range_columns: "A:Z".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Column names of the named lead fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Capture timestamp column
    pub timestamp: String,
    /// Display name column
    pub full_name: String,
    /// Email column
    pub email: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            timestamp: "Отметка времени".to_string(),
            full_name: "ФИО (обязательное поле)".to_string(),
            email: "Электронная почта (обязательное поле)".to_string(),
        }
    }
}

/// Lead storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// PostgreSQL `leads` table
    #[default]
    Postgres,
    /// Append-only JSON lines file
    Jsonl,
    /// Do not persist leads
    Disabled,
}

/// Lead storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageConfig {
    /// Selected backend
    pub backend: StorageBackend,

    /// PostgreSQL connection (backend = postgres)
    #[validate(nested)]
    pub postgres: PostgresConfig,

    /// Output file (backend = jsonl)
    pub jsonl_path: Option<PathBuf>,
}

/// PostgreSQL connection parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PostgresConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[validate(length(min = 1))]
    pub database: String,
    #[validate(length(min = 1))]
    pub user: String,
    pub password: String,
    /// Connect timeout
    pub connect_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "leads_db".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            connect_timeout_secs: 10,
        }
    }
}

/// Notification channels
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NotifyConfig {
    /// Telegram bot (enabled when token and chat id are both set)
    pub telegram: Option<TelegramConfig>,

    /// Email via SMTP relay (enabled when a recipient is set)
    pub email: Option<EmailConfig>,

    /// Also log every notification
    pub log: bool,

    /// Per-channel send timeout
    #[validate(range(min = 1, message = "send timeout must be > 0"))]
    pub send_timeout_secs: u64,

    /// Per-channel queue capacity
    #[validate(range(min = 1, message = "queue capacity must be > 0"))]
    pub queue_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            telegram: None,
            email: None,
            log: false,
            send_timeout_secs: 15,
            queue_capacity: 16,
        }
    }
}

impl NotifyConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Telegram config, if fully specified
    pub fn telegram_enabled(&self) -> Option<&TelegramConfig> {
        self.telegram.as_ref().filter(|t| t.is_enabled())
    }

    /// Email config, if a recipient is set
    pub fn email_enabled(&self) -> Option<&EmailConfig> {
        self.email.as_ref().filter(|e| e.is_enabled())
    }
}

/// Telegram bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Numeric chat id or `@channel`
    pub chat_id: String,
    /// Bot API base url
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl TelegramConfig {
    pub fn is_enabled(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    /// Parsed chat id, `None` when it has neither accepted form
    pub fn parsed_chat_id(&self) -> Option<ChatId> {
        ChatId::parse(&self.chat_id)
    }
}

/// Telegram chat target
///
/// Serialises as a number for numeric ids and as a string for `@channel`
/// names, the two forms the Bot API accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatId {
    /// Numeric id, negative for groups
    Id(i64),
    /// Public `@channel` name
    Channel(String),
}

impl ChatId {
    /// Parse a configured chat id, ignoring surrounding whitespace
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            return Some(Self::Id(id));
        }
        match raw.strip_prefix('@') {
            Some(name) if !name.is_empty() => Some(Self::Channel(raw.to_string())),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Channel(name) => f.write_str(name),
        }
    }
}

/// SMTP relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Recipient; the channel is disabled while empty
    pub to: String,
    /// Sender override, defaults to `user`
    pub from: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 25,
            user: String::new(),
            password: String::new(),
            to: String::new(),
            from: None,
            timeout_secs: 10,
        }
    }
}

impl EmailConfig {
    pub fn is_enabled(&self) -> bool {
        !self.to.is_empty()
    }

    /// Whether to STARTTLS and log in
    pub fn uses_auth(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }

    /// Envelope sender
    ///
    /// An explicit `from` wins. The SMTP login is used only when it is an
    /// address itself; plain logins such as `postfix` fall back to
    /// [`DEFAULT_SENDER`].
    pub fn sender(&self) -> &str {
        match (&self.from, self.user.as_str()) {
            (Some(from), _) if !from.is_empty() => from,
            (_, user) if looks_like_address(user) => user,
            _ => DEFAULT_SENDER,
        }
    }
}

/// Sender used when neither `from` nor the SMTP login is an address
pub const DEFAULT_SENDER: &str = "noreply@example.com";

/// `local@domain` with both parts non-empty and no whitespace
pub fn looks_like_address(text: &str) -> bool {
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !text.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Poll timer
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between poll cycles
    #[validate(range(min = 1, message = "interval must be > 0"))]
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file appended to in addition to stdout
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("leads.log")),
        }
    }
}

/// Watermark persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// JSON state file
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("state.json"),
        }
    }
}

/// Prometheus exporter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Listen port (None = disabled)
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = LeadsConfig::default();
        assert_eq!(config.source.view_name, "Form Responses 1");
        assert_eq!(config.source.range_columns, "A:Z");
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.storage.postgres.port, 5432);
        assert_eq!(config.schedule.interval_secs, 30);
        assert_eq!(config.state.path, PathBuf::from("state.json"));
        assert!(config.notify.telegram_enabled().is_none());
        assert!(config.notify.email_enabled().is_none());
    }

    #[test]
    fn test_chat_id_forms() {
        assert_eq!(ChatId::parse("123456"), Some(ChatId::Id(123456)));
        assert_eq!(ChatId::parse("-100200"), Some(ChatId::Id(-100200)));
        assert_eq!(ChatId::parse(" 42 "), Some(ChatId::Id(42)));
        assert_eq!(
            ChatId::parse("@leads"),
            Some(ChatId::Channel("@leads".into()))
        );
        assert_eq!(ChatId::parse("@"), None);
        assert_eq!(ChatId::parse("leads"), None);
        assert_eq!(ChatId::Id(-100200).to_string(), "-100200");
    }

    #[test]
    fn test_email_sender_fallback() {
        let mut email = EmailConfig::default();
        assert_eq!(email.sender(), "noreply@example.com");

        email.user = "postfix".into();
        assert_eq!(email.sender(), DEFAULT_SENDER);

        email.user = "bot@example.org".into();
        assert_eq!(email.sender(), "bot@example.org");
        assert!(!email.uses_auth());

        email.password = "secret".into();
        assert!(email.uses_auth());

        email.from = Some("leads@example.org".into());
        assert_eq!(email.sender(), "leads@example.org");
    }

    #[test]
    fn test_telegram_requires_token_and_chat() {
        let mut notify = NotifyConfig {
            telegram: Some(TelegramConfig {
                bot_token: "123:abc".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(notify.telegram_enabled().is_none());

        if let Some(t) = notify.telegram.as_mut() {
            t.chat_id = "42".into();
        }
        assert!(notify.telegram_enabled().is_some());
    }

    #[test]
    fn test_watermark_key() {
        let mut config = LeadsConfig::default();
        config.source.sheet_id = "sheet1".into();
        assert_eq!(config.watermark_key().to_string(), "sheet1:Form Responses 1");
    }
}
