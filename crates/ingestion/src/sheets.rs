//! Google Sheets row source
//!
//! Reads one view through the Sheets API v4 `values.get` endpoint,
//! authenticated with a service account key file.

use std::sync::Arc;

use contracts::{ContractError, RowSet, RowSource, SourceConfig, WatermarkKey};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Read-only access is all the poller needs
const SHEETS_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets.readonly"];

/// Sheets API v4 spreadsheets collection
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// `values.get` response body
#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the range holds no data at all
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Row source backed by the Google Sheets API
pub struct SheetsRowSource {
    client: reqwest::Client,
    token_provider: Arc<dyn TokenProvider>,
    api_base: String,
    range_columns: String,
}

impl std::fmt::Debug for SheetsRowSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsRowSource")
            .field("api_base", &self.api_base)
            .field("range_columns", &self.range_columns)
            .finish_non_exhaustive()
    }
}

impl SheetsRowSource {
    /// Build from the source configuration
    ///
    /// # Errors
    /// `SourceAuth` when the key file cannot be read or parsed,
    /// `SourceTransport` when the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self, ContractError> {
        let account = CustomServiceAccount::from_file(&config.credentials_path).map_err(|e| {
            ContractError::SourceAuth {
                message: format!(
                    "cannot load service account from {}: {e}",
                    config.credentials_path.display()
                ),
            }
        })?;

        Self::with_token_provider(config, Arc::new(account))
    }

    /// Build with an explicit token provider
    pub fn with_token_provider(
        config: &SourceConfig,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ContractError::source_transport(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            token_provider,
            api_base: DEFAULT_API_BASE.to_string(),
            range_columns: config.range_columns.clone(),
        })
    }

    /// Point requests at another API root
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn access_token(&self) -> Result<String, ContractError> {
        let token = self
            .token_provider
            .token(SHEETS_SCOPES)
            .await
            .map_err(|e| ContractError::SourceAuth {
                message: format!("failed to get access token: {e}"),
            })?;
        Ok(token.as_str().to_string())
    }
}

impl RowSource for SheetsRowSource {
    fn name(&self) -> &str {
        "google_sheets"
    }

    #[instrument(name = "sheets_fetch", skip(self, key), fields(key = %key))]
    async fn fetch(&mut self, key: &WatermarkKey) -> Result<RowSet, ContractError> {
        let url = values_url(&self.api_base, key, &self.range_columns)?;
        let token = self.access_token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ContractError::source_transport("request timed out")
                } else {
                    ContractError::source_transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = status_error(status, key, &body);
            warn!(status = status.as_u16(), error = %err, "Sheets API request failed");
            return Err(err);
        }

        let body: ValueRange = response.json().await.map_err(|e| {
            ContractError::source_transport(format!("invalid values response: {e}"))
        })?;

        let rows: RowSet = body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect::<Vec<String>>())
            .collect();

        debug!(rows = rows.len(), "Fetched sheet values");
        Ok(rows)
    }
}

/// `<base>/<sheet_id>/values/'<view>'!<columns>`, each segment percent-encoded
fn values_url(api_base: &str, key: &WatermarkKey, columns: &str) -> Result<Url, ContractError> {
    let mut url = Url::parse(api_base)
        .map_err(|e| ContractError::source_transport(format!("invalid api base '{api_base}': {e}")))?;

    let range = a1_range(&key.view_name, columns);
    url.path_segments_mut()
        .map_err(|_| ContractError::source_transport(format!("api base '{api_base}' cannot be a base")))?
        .pop_if_empty()
        .extend([key.sheet_id.as_str(), "values", range.as_str()]);

    Ok(url)
}

/// A1 notation with the view name quoted, embedded quotes doubled
fn a1_range(view_name: &str, columns: &str) -> String {
    format!("'{}'!{}", view_name.replace('\'', "''"), columns)
}

fn status_error(status: StatusCode, key: &WatermarkKey, body: &str) -> ContractError {
    match status {
        StatusCode::FORBIDDEN => ContractError::AccessDenied {
            sheet_id: key.sheet_id.clone(),
        },
        StatusCode::NOT_FOUND => ContractError::SourceNotFound {
            sheet_id: key.sheet_id.clone(),
        },
        StatusCode::UNAUTHORIZED => ContractError::SourceAuth {
            message: api_message(body),
        },
        other => ContractError::SourceApi {
            status: other.as_u16(),
            message: api_message(body),
        },
    }
}

/// Google error envelope message, or the raw body
fn api_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

/// Formatted values are strings; anything else is rendered as JSON text
fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
