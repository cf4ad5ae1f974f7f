//! # Integration Tests
//!
//! End-to-end poll scenarios across crates.
//!
//! Covers:
//! - Contract snapshot tests
//! - Mock sheet -> file storage -> channel workers, no network involved
//! - Configuration driven wiring

#[cfg(test)]
mod contract_tests {
    use contracts::{Submission, WatermarkKey, INITIAL_WATERMARK};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(INITIAL_WATERMARK, 1);
    }

    #[test]
    fn test_submission_json_keeps_header_order() {
        let header = ["Time", "Name", "Email"].map(String::from);
        let row = ["t1", "Alice"].map(String::from);

        let submission = Submission::from_row(&header, &row);
        let json = serde_json::to_string(&submission).unwrap();
        assert_eq!(json, r#"{"Time":"t1","Name":"Alice","Email":""}"#);
    }

    #[test]
    fn test_watermark_key_rendering() {
        let key = WatermarkKey::new("sheet1", "Form Responses 1");
        assert_eq!(key.storage_key(), "sheet1:Form Responses 1");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{
        ColumnMapping, ContractError, CycleOutcome, LeadDraft, LeadReceipt, LeadSink,
        Notification, NotifyChannel, RowSet, WatermarkKey,
    };
    use dispatcher::{ChannelHandle, LogChannel, Notifier};
    use ingestion::MockRowSource;
    use lead_store::JsonlLeadSink;
    use poller::PollCycle;
    use serde_json::Value;
    use tempfile::tempdir;
    use watermark::{FileWatermarkStore, WatermarkStore};

    /// Channel recording what it was asked to deliver
    #[derive(Clone, Default)]
    struct RecordingChannel {
        received: Arc<Mutex<Vec<Notification>>>,
    }

    impl RecordingChannel {
        fn names(&self) -> Vec<String> {
            self.received
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.full_name_or_default().to_string())
                .collect()
        }
    }

    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&mut self, notification: &Notification) -> Result<(), ContractError> {
            self.received.lock().unwrap().push(notification.clone());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Sink whose first append fails as if the database were down
    struct FlakySink {
        inner: JsonlLeadSink,
        failed_once: bool,
    }

    impl LeadSink for FlakySink {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn append(&mut self, lead: &LeadDraft) -> Result<LeadReceipt, ContractError> {
            if !self.failed_once {
                self.failed_once = true;
                return Err(ContractError::sink_connection("flaky", "connection refused"));
            }
            self.inner.append(lead).await
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.inner.close().await
        }
    }

    fn key() -> WatermarkKey {
        WatermarkKey::new("sheet1", "Form Responses 1")
    }

    fn columns() -> ColumnMapping {
        ColumnMapping {
            timestamp: "Time".into(),
            full_name: "Name".into(),
            email: "Email".into(),
        }
    }

    fn alice_and_bob() -> RowSet {
        RowSet::from_iter([
            vec!["Time", "Name", "Email"],
            vec!["t1", "Alice", "a@x.com"],
            vec!["t2", "Bob", "b@x.com"],
        ])
    }

    fn notifier(channel: &RecordingChannel) -> Notifier {
        Notifier::with_handles(
            vec![
                ChannelHandle::spawn(channel.clone(), 8),
                ChannelHandle::spawn(LogChannel::new("log"), 8),
            ],
            Duration::from_secs(5),
        )
    }

    fn stored_lines(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// End-to-end test: MockRowSource -> JsonlLeadSink + channels -> state file
    #[tokio::test]
    async fn test_two_new_rows_stored_notified_and_watermarked() {
        let dir = tempdir().unwrap();
        let leads = dir.path().join("leads.jsonl");
        let state = dir.path().join("state.json");
        let channel = RecordingChannel::default();

        let mut poller = PollCycle::new(
            key(),
            columns(),
            MockRowSource::with_rows(alice_and_bob()),
            Some(JsonlLeadSink::open(&leads).unwrap()),
            FileWatermarkStore::open(&state),
            notifier(&channel),
        );

        let report = poller.run_cycle().await.unwrap();
        poller.shutdown().await;

        assert_eq!(report.outcome, CycleOutcome::Processed);
        assert_eq!(report.leads_persisted, 2);
        // two rows, two channels each
        assert_eq!(report.notifications_sent, 4);

        let lines = stored_lines(&leads);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["full_name"], "Alice");
        assert_eq!(lines[1]["full_name"], "Bob");
        assert_eq!(lines[1]["raw_data"]["Email"], "b@x.com");

        assert_eq!(channel.names(), vec!["Alice", "Bob"]);
        assert_eq!(FileWatermarkStore::open(&state).last_row(&key()), 3);
    }

    #[tokio::test]
    async fn test_access_denied_has_no_side_effects() {
        let dir = tempdir().unwrap();
        let leads = dir.path().join("leads.jsonl");
        let state = dir.path().join("state.json");
        let channel = RecordingChannel::default();

        let source = MockRowSource::new();
        source.push_access_denied();

        let mut poller = PollCycle::new(
            key(),
            columns(),
            source,
            Some(JsonlLeadSink::open(&leads).unwrap()),
            FileWatermarkStore::open(&state),
            notifier(&channel),
        );

        let report = poller.run_cycle().await.unwrap();
        poller.shutdown().await;

        assert_eq!(report.outcome, CycleOutcome::FetchFailed);
        assert!(stored_lines(&leads).is_empty());
        assert!(channel.names().is_empty());
        assert!(!state.exists());
        assert_eq!(FileWatermarkStore::open(&state).last_row(&key()), 1);
    }

    #[tokio::test]
    async fn test_failed_append_does_not_block_the_rest() {
        let dir = tempdir().unwrap();
        let leads = dir.path().join("leads.jsonl");
        let state = dir.path().join("state.json");
        let channel = RecordingChannel::default();

        let sink = FlakySink {
            inner: JsonlLeadSink::open(&leads).unwrap(),
            failed_once: false,
        };
        let mut poller = PollCycle::new(
            key(),
            columns(),
            MockRowSource::with_rows(alice_and_bob()),
            Some(sink),
            FileWatermarkStore::open(&state),
            notifier(&channel),
        );

        let report = poller.run_cycle().await.unwrap();
        poller.shutdown().await;

        assert_eq!(report.leads_failed, 1);
        assert_eq!(report.leads_persisted, 1);

        let lines = stored_lines(&leads);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["full_name"], "Bob");

        assert_eq!(channel.names(), vec!["Alice", "Bob"]);
        assert_eq!(FileWatermarkStore::open(&state).last_row(&key()), 3);
    }

    #[tokio::test]
    async fn test_restart_does_not_reprocess() {
        let dir = tempdir().unwrap();
        let leads = dir.path().join("leads.jsonl");
        let state = dir.path().join("state.json");

        for _ in 0..2 {
            let channel = RecordingChannel::default();
            let mut poller = PollCycle::new(
                key(),
                columns(),
                MockRowSource::with_rows(alice_and_bob()),
                Some(JsonlLeadSink::open(&leads).unwrap()),
                FileWatermarkStore::open(&state),
                notifier(&channel),
            );
            poller.run_cycle().await.unwrap();
            poller.shutdown().await;
        }

        let lines = stored_lines(&leads);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_other_views_keep_their_watermark() {
        let dir = tempdir().unwrap();
        let state = dir.path().join("state.json");
        let other = WatermarkKey::new("sheet1", "Archive");

        let mut store = FileWatermarkStore::open(&state);
        store.set_last_row(&other, 7).unwrap();

        let mut poller = PollCycle::new(
            key(),
            columns(),
            MockRowSource::with_rows(alice_and_bob()),
            None::<JsonlLeadSink>,
            store,
            Notifier::with_handles(Vec::new(), Duration::from_secs(1)),
        );
        poller.run_cycle().await.unwrap();

        let reopened = FileWatermarkStore::open(&state);
        assert_eq!(reopened.last_row(&key()), 3);
        assert_eq!(reopened.last_row(&other), 7);
    }
}

#[cfg(test)]
mod config_tests {
    use std::fs;

    use config_loader::ConfigLoader;
    use contracts::{CycleOutcome, LeadSink, RowSet, StorageBackend};
    use dispatcher::Notifier;
    use ingestion::MockRowSource;
    use lead_store::LeadStore;
    use poller::PollCycle;
    use tempfile::tempdir;
    use watermark::{FileWatermarkStore, WatermarkStore};

    /// Configuration file + environment -> wired components -> one cycle
    #[tokio::test]
    async fn test_configured_pipeline_with_form_headers() {
        let dir = tempdir().unwrap();
        let credentials = dir.path().join("service-account.json");
        fs::write(&credentials, "{}").unwrap();

        let config_path = dir.path().join("leads.toml");
        fs::write(
            &config_path,
            format!(
                r#"
[source]
sheet_id = "from-file"

[storage]
backend = "jsonl"
jsonl_path = "{}"

[notify]
log = true

[state]
path = "{}"
"#,
                dir.path().join("out/leads.jsonl").display(),
                dir.path().join("state.json").display(),
            ),
        )
        .unwrap();

        let vars = vec![
            ("GOOGLE_SHEET_ID".to_string(), "from-env".to_string()),
            (
                "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
                credentials.display().to_string(),
            ),
        ];
        let config = ConfigLoader::load(Some(&config_path), vars).unwrap();

        // environment wins over the file
        assert_eq!(config.source.sheet_id, "from-env");
        assert_eq!(config.storage.backend, StorageBackend::Jsonl);

        let sink = LeadStore::from_config(&config.storage).unwrap().unwrap();
        assert_eq!(sink.name(), "jsonl");

        let notifier = Notifier::from_config(&config.notify);
        assert_eq!(notifier.channel_names(), vec!["log"]);

        let columns = config.columns.clone();
        let rows = RowSet::from_iter([
            vec![
                columns.timestamp.as_str(),
                columns.full_name.as_str(),
                columns.email.as_str(),
                "Телефон",
            ],
            vec!["01.02.2024 10:00:00", "Иван Петров", "ivan@example.com", "+7 900"],
        ]);

        let mut poller = PollCycle::new(
            config.watermark_key(),
            columns,
            MockRowSource::with_rows(rows),
            Some(sink),
            FileWatermarkStore::open(&config.state.path),
            notifier,
        );
        let report = poller.run_cycle().await.unwrap();
        poller.shutdown().await;

        assert_eq!(report.outcome, CycleOutcome::Processed);
        assert_eq!(report.leads_persisted, 1);
        assert_eq!(report.notifications_sent, 1);

        let stored = fs::read_to_string(dir.path().join("out/leads.jsonl")).unwrap();
        assert!(stored.contains("Иван Петров"));
        assert!(stored.contains("+7 900"));

        let state = FileWatermarkStore::open(&config.state.path);
        assert_eq!(state.entries(), vec![("from-env:Form Responses 1".to_string(), 2)]);
    }
}
