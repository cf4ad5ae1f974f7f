//! Layered error definitions
//!
//! Categorized by source: config / source / sink / channel / state

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Row Source Errors =====
    /// The credentials were accepted but may not read the sheet
    #[error("access denied to sheet '{sheet_id}'")]
    AccessDenied { sheet_id: String },

    /// Sheet or view does not exist
    #[error("sheet not found: '{sheet_id}'")]
    SourceNotFound { sheet_id: String },

    /// Credential exchange failed
    #[error("source authentication error: {message}")]
    SourceAuth { message: String },

    /// Network-level failure talking to the source
    #[error("source transport error: {message}")]
    SourceTransport { message: String },

    /// Any other non-success answer from the source API
    #[error("source api error (status {status}): {message}")]
    SourceApi { status: u16, message: String },

    // ===== Lead Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== Notification Errors =====
    /// Channel rejected or failed to deliver a message
    #[error("channel '{channel}' send error: {message}")]
    ChannelSend { channel: String, message: String },

    /// Channel did not answer within its send timeout
    #[error("channel '{channel}' timed out after {waited_ms}ms")]
    ChannelTimeout { channel: String, waited_ms: u64 },

    // ===== State Errors =====
    /// Watermark state could not be persisted
    #[error("failed to persist state to '{path}': {message}")]
    StatePersist { path: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create channel send error
    pub fn channel_send(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChannelSend {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create source transport error
    pub fn source_transport(message: impl Into<String>) -> Self {
        Self::SourceTransport {
            message: message.into(),
        }
    }

    /// Whether this error came from fetching rows
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied { .. }
                | Self::SourceNotFound { .. }
                | Self::SourceAuth { .. }
                | Self::SourceTransport { .. }
                | Self::SourceApi { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_classification() {
        let denied = ContractError::AccessDenied {
            sheet_id: "sheet1".into(),
        };
        assert!(denied.is_fetch_error());
        assert_eq!(denied.to_string(), "access denied to sheet 'sheet1'");

        let sink = ContractError::sink_write("postgres", "duplicate key");
        assert!(!sink.is_fetch_error());
        assert!(sink.to_string().contains("postgres"));
    }
}
