//! Environment layer
//!
//! Maps the flat variables of a `.env` deployment onto the configuration tree.
//! Applied after the optional file, so the environment always wins.

use std::collections::HashMap;

use contracts::ContractError;
use serde_json::{Map, Value};

/// How a variable's text is converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    /// Empty text clears the option
    OptionalText,
    /// `true` (any case) is true, anything else false
    Flag,
    Port,
    Seconds,
}

/// Variable -> config path binding
struct Binding {
    var: &'static str,
    path: &'static [&'static str],
    kind: Kind,
}

const BINDINGS: &[Binding] = &[
    Binding { var: "GOOGLE_SHEET_ID", path: &["source", "sheet_id"], kind: Kind::Text },
    Binding { var: "GOOGLE_SHEET_NAME", path: &["source", "view_name"], kind: Kind::Text },
    Binding { var: "GOOGLE_APPLICATION_CREDENTIALS", path: &["source", "credentials_path"], kind: Kind::Text },
    Binding { var: "SHEET_RANGE_COLUMNS", path: &["source", "range_columns"], kind: Kind::Text },
    Binding { var: "COLUMN_TIMESTAMP", path: &["columns", "timestamp"], kind: Kind::Text },
    Binding { var: "COLUMN_NAME", path: &["columns", "full_name"], kind: Kind::Text },
    Binding { var: "COLUMN_EMAIL", path: &["columns", "email"], kind: Kind::Text },
    Binding { var: "LEADS_FILE", path: &["storage", "jsonl_path"], kind: Kind::OptionalText },
    Binding { var: "POSTGRESQL_HOST", path: &["storage", "postgres", "host"], kind: Kind::Text },
    Binding { var: "POSTGRESQL_PORT", path: &["storage", "postgres", "port"], kind: Kind::Port },
    Binding { var: "POSTGRESQL_DB", path: &["storage", "postgres", "database"], kind: Kind::Text },
    Binding { var: "POSTGRESQL_USER", path: &["storage", "postgres", "user"], kind: Kind::Text },
    Binding { var: "POSTGRESQL_PASSWORD", path: &["storage", "postgres", "password"], kind: Kind::Text },
    Binding { var: "TELEGRAM_BOT_TOKEN", path: &["notify", "telegram", "bot_token"], kind: Kind::Text },
    Binding { var: "TELEGRAM_CHAT_ID", path: &["notify", "telegram", "chat_id"], kind: Kind::Text },
    Binding { var: "SMTP_SERVER", path: &["notify", "email", "server"], kind: Kind::Text },
    Binding { var: "SMTP_PORT", path: &["notify", "email", "port"], kind: Kind::Port },
    Binding { var: "SMTP_USER", path: &["notify", "email", "user"], kind: Kind::Text },
    Binding { var: "SMTP_PASSWORD", path: &["notify", "email", "password"], kind: Kind::Text },
    Binding { var: "EMAIL_TO", path: &["notify", "email", "to"], kind: Kind::Text },
    Binding { var: "NOTIFY_LOG", path: &["notify", "log"], kind: Kind::Flag },
    Binding { var: "NOTIFY_TIMEOUT", path: &["notify", "send_timeout_secs"], kind: Kind::Seconds },
    Binding { var: "CHECK_INTERVAL", path: &["schedule", "interval_secs"], kind: Kind::Seconds },
    Binding { var: "LOG_FILE", path: &["logging", "file"], kind: Kind::OptionalText },
    Binding { var: "STATE_FILE", path: &["state", "path"], kind: Kind::Text },
    Binding { var: "METRICS_PORT", path: &["metrics", "port"], kind: Kind::Port },
];

/// Names of every variable the loader reads
pub fn known_variables() -> impl Iterator<Item = &'static str> {
    BINDINGS
        .iter()
        .map(|b| b.var)
        .chain(["USE_POSTGRESQL", "STORAGE_BACKEND"])
}

/// Overlay environment variables onto a config tree
///
/// # Errors
/// `ConfigParse` naming the variable when a numeric value does not parse.
pub fn apply(tree: &mut Value, vars: &HashMap<String, String>) -> Result<(), ContractError> {
    for binding in BINDINGS {
        let Some(raw) = vars.get(binding.var) else {
            continue;
        };
        if let Some(value) = convert(binding, raw)? {
            set_path(tree, binding.path, value);
        }
    }

    apply_storage_toggle(tree, vars);
    Ok(())
}

fn convert(binding: &Binding, raw: &str) -> Result<Option<Value>, ContractError> {
    let raw_trimmed = raw.trim();
    let value = match binding.kind {
        Kind::Text => Value::String(raw.to_string()),
        Kind::OptionalText if raw_trimmed.is_empty() => Value::Null,
        Kind::OptionalText => Value::String(raw.to_string()),
        Kind::Flag => Value::Bool(raw_trimmed.eq_ignore_ascii_case("true")),
        Kind::Port | Kind::Seconds if raw_trimmed.is_empty() => return Ok(None),
        Kind::Port => {
            let port: u16 = raw_trimmed.parse().map_err(|e| {
                ContractError::config_parse(format!("invalid value for {}: '{raw}' ({e})", binding.var))
            })?;
            Value::from(port)
        }
        Kind::Seconds => {
            let secs: u64 = raw_trimmed.parse().map_err(|e| {
                ContractError::config_parse(format!("invalid value for {}: '{raw}' ({e})", binding.var))
            })?;
            Value::from(secs)
        }
    };
    Ok(Some(value))
}

/// `STORAGE_BACKEND` wins; otherwise `USE_POSTGRESQL=false` falls back to the
/// JSON lines file when one is configured, or disables storage.
fn apply_storage_toggle(tree: &mut Value, vars: &HashMap<String, String>) {
    if let Some(backend) = vars.get("STORAGE_BACKEND").map(|s| s.trim().to_lowercase()) {
        if !backend.is_empty() {
            set_path(tree, &["storage", "backend"], Value::String(backend));
            return;
        }
    }

    let Some(use_postgres) = vars.get("USE_POSTGRESQL") else {
        return;
    };

    let backend = if use_postgres.trim().eq_ignore_ascii_case("true") {
        "postgres"
    } else if has_jsonl_path(tree) {
        "jsonl"
    } else {
        "disabled"
    };
    set_path(tree, &["storage", "backend"], Value::String(backend.to_string()));
}

fn has_jsonl_path(tree: &Value) -> bool {
    tree.pointer("/storage/jsonl_path")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

/// Set a nested value, creating (or replacing non-object) parents
fn set_path(tree: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut node = tree;
    for segment in parents {
        node = object_mut(node)
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    object_mut(node).insert(last.to_string(), value);
}

fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}
