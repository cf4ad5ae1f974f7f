//! Configuration validation module
//!
//! Rules:
//! - Field-level bounds declared on the config structs (`validator` derive)
//! - credentials file path present and the file exists
//! - jsonl backend has an output path
//! - telegram chat id is numeric or `@channel`
//! - email recipient and relay are usable

use std::borrow::Cow;

use contracts::{looks_like_address, ContractError, LeadsConfig, StorageBackend};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a LeadsConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &LeadsConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_credentials(config)?;
    validate_storage(config)?;
    validate_telegram(config)?;
    validate_email(config)?;
    Ok(())
}

/// Non-fatal issues worth reporting
pub fn collect_warnings(config: &LeadsConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let notify = &config.notify;

    if config.storage.backend == StorageBackend::Disabled {
        warnings.push("Lead storage is disabled - leads will only be notified".to_string());
    }

    if notify.telegram_enabled().is_none()
        && notify.email_enabled().is_none()
        && !notify.log
    {
        warnings.push("No notification channels configured".to_string());
    }

    if let Some(telegram) = &notify.telegram {
        if !telegram.is_enabled() && (!telegram.bot_token.is_empty() || !telegram.chat_id.is_empty())
        {
            warnings.push(
                "Telegram is partially configured (needs both bot token and chat id) - disabled"
                    .to_string(),
            );
        }
    }

    if let Some(email) = notify.email_enabled() {
        if email.user.is_empty() != email.password.is_empty() {
            warnings.push(
                "SMTP user and password must both be set to authenticate - sending without login"
                    .to_string(),
            );
        }
    }

    if config.storage.backend == StorageBackend::Postgres
        && config.storage.postgres.password.is_empty()
    {
        warnings.push("PostgreSQL password is empty".to_string());
    }

    warnings
}

/// Bounds declared with `#[validate(..)]`
fn validate_fields(config: &LeadsConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// Walk nested validation errors depth-first, in field-name order
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(violations) => {
                if let Some(violation) = violations.first() {
                    let message = violation
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(format!("failed '{}' check", violation.code)));
                    return Some((path, message.into_owned()));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// Credentials path is required and must point at an existing file
fn validate_credentials(config: &LeadsConfig) -> Result<(), ContractError> {
    let path = &config.source.credentials_path;

    if path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "source.credentials_path",
            "credentials file path is required",
        ));
    }

    if !path.is_file() {
        return Err(ContractError::config_validation(
            "source.credentials_path",
            format!("credentials file not found: {}", path.display()),
        ));
    }

    Ok(())
}

fn validate_storage(config: &LeadsConfig) -> Result<(), ContractError> {
    let storage = &config.storage;
    if storage.backend == StorageBackend::Jsonl
        && storage
            .jsonl_path
            .as_ref()
            .is_none_or(|p| p.as_os_str().is_empty())
    {
        return Err(ContractError::config_validation(
            "storage.jsonl_path",
            "jsonl backend requires an output path",
        ));
    }
    Ok(())
}

fn validate_telegram(config: &LeadsConfig) -> Result<(), ContractError> {
    let Some(telegram) = config.notify.telegram_enabled() else {
        return Ok(());
    };

    if telegram.parsed_chat_id().is_none() {
        return Err(ContractError::config_validation(
            "notify.telegram.chat_id",
            format!(
                "chat id must be numeric or '@channel', got '{}'",
                telegram.chat_id
            ),
        ));
    }
    Ok(())
}

fn validate_email(config: &LeadsConfig) -> Result<(), ContractError> {
    let Some(email) = config.notify.email_enabled() else {
        return Ok(());
    };

    if !looks_like_address(&email.to) {
        return Err(ContractError::config_validation(
            "notify.email.to",
            format!("'{}' is not an email address", email.to),
        ));
    }
    if let Some(from) = email.from.as_deref().filter(|f| !f.is_empty()) {
        if !looks_like_address(from) {
            return Err(ContractError::config_validation(
                "notify.email.from",
                format!("'{from}' is not an email address"),
            ));
        }
    }
    if email.server.is_empty() {
        return Err(ContractError::config_validation(
            "notify.email.server",
            "SMTP server cannot be empty",
        ));
    }
    if email.port == 0 {
        return Err(ContractError::config_validation(
            "notify.email.port",
            "SMTP port must be > 0",
        ));
    }
    Ok(())
}
