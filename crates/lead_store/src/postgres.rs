//! PostgresLeadSink - one row per lead in the `leads` table

use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{ContractError, LeadDraft, LeadReceipt, LeadSink, PostgresConfig};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info, instrument, warn};

const SINK_NAME: &str = "postgres";

const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS leads (
    id SERIAL PRIMARY KEY,
    timestamp VARCHAR(100),
    full_name VARCHAR(255),
    email VARCHAR(255),
    raw_data JSONB,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

const INSERT_LEAD: &str = "\
INSERT INTO leads (timestamp, full_name, email, raw_data)
VALUES ($1, $2, $3, $4)
RETURNING id, created_at::timestamptz";

/// Lead sink backed by PostgreSQL
///
/// Connects lazily on the first append and again whenever the previous
/// connection was closed, so a database outage only costs the rows written
/// while it lasts.
pub struct PostgresLeadSink {
    config: PostgresConfig,
    client: Option<Client>,
    connection_task: Option<JoinHandle<()>>,
}

impl PostgresLeadSink {
    pub fn new(config: PostgresConfig) -> Self {
        Self {
            config,
            client: None,
            connection_task: None,
        }
    }

    fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.config.host)
            .port(self.config.port)
            .dbname(&self.config.database)
            .user(&self.config.user)
            .application_name("lead-poller")
            // `created_at` has no zone; keep it in UTC
            .options("-c TimeZone=UTC")
            .connect_timeout(Duration::from_secs(self.config.connect_timeout_secs));
        if !self.config.password.is_empty() {
            pg.password(&self.config.password);
        }
        pg
    }

    /// Live client, connecting and ensuring the schema if needed
    async fn client(&mut self) -> Result<&Client, ContractError> {
        if self.client.as_ref().is_some_and(Client::is_closed) {
            warn!(sink = SINK_NAME, "Connection closed, reconnecting");
            self.disconnect();
        }

        if self.client.is_none() {
            self.connect().await?;
        }

        self.client
            .as_ref()
            .ok_or_else(|| ContractError::sink_connection(SINK_NAME, "not connected"))
    }

    #[instrument(
        name = "postgres_connect",
        skip(self),
        fields(host = %self.config.host, port = self.config.port, db = %self.config.database)
    )]
    async fn connect(&mut self) -> Result<(), ContractError> {
        let (client, connection) = self
            .pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| ContractError::sink_connection(SINK_NAME, e.to_string()))?;

        let task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(sink = SINK_NAME, error = %e, "PostgreSQL connection error");
            }
        });

        client
            .batch_execute(CREATE_TABLE)
            .await
            .map_err(|e| ContractError::sink_connection(SINK_NAME, format!("ensure table: {e}")))?;

        info!(sink = SINK_NAME, "Connected to PostgreSQL");
        self.client = Some(client);
        self.connection_task = Some(task);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.client = None;
        if let Some(task) = self.connection_task.take() {
            task.abort();
        }
    }
}

impl Drop for PostgresLeadSink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl LeadSink for PostgresLeadSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    #[instrument(
        name = "postgres_append",
        skip(self, lead),
        fields(row = lead.row_index)
    )]
    async fn append(&mut self, lead: &LeadDraft) -> Result<LeadReceipt, ContractError> {
        let raw_data = serde_json::to_value(&lead.submission)
            .map_err(|e| ContractError::sink_write(SINK_NAME, e.to_string()))?;
        let captured_at = lead.captured_at.as_deref().unwrap_or_default();
        let full_name = lead.full_name.as_deref().unwrap_or_default();
        let email = lead.email.as_deref().unwrap_or_default();

        let client = self.client().await?;
        let result = client
            .query_one(INSERT_LEAD, &[&captured_at, &full_name, &email, &raw_data])
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if e.is_closed() => {
                self.disconnect();
                return Err(ContractError::sink_connection(SINK_NAME, e.to_string()));
            }
            Err(e) => return Err(ContractError::sink_write(SINK_NAME, e.to_string())),
        };

        let id: i32 = row.get(0);
        let created_at: DateTime<Utc> = row.get(1);
        debug!(sink = SINK_NAME, id, "Lead inserted");

        Ok(LeadReceipt {
            id: i64::from(id),
            created_at,
        })
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.disconnect();
        debug!(sink = SINK_NAME, "PostgresLeadSink closed");
        Ok(())
    }
}
