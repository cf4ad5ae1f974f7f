//! JsonlLeadSink - one JSON object per line, append only

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::{ContractError, LeadDraft, LeadReceipt, LeadSink, Submission};
use serde::Serialize;
use tracing::{debug, error, instrument};

const SINK_NAME: &str = "jsonl";

/// Line layout, mirroring the columns of the `leads` table
#[derive(Serialize)]
struct LeadLine<'a> {
    id: i64,
    created_at: DateTime<Utc>,
    timestamp: &'a str,
    full_name: &'a str,
    email: &'a str,
    raw_data: &'a Submission,
}

/// Lead sink writing a JSON lines file
///
/// The id of a lead is its 1-based line number; reopening an existing file
/// continues the sequence.
pub struct JsonlLeadSink {
    path: PathBuf,
    file: File,
    next_id: i64,
}

impl JsonlLeadSink {
    /// Open (or create) the output file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ContractError::sink_connection(SINK_NAME, e.to_string()))?;
        }

        let existing = Self::count_lines(&path)
            .map_err(|e| ContractError::sink_connection(SINK_NAME, e.to_string()))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ContractError::sink_connection(SINK_NAME, e.to_string()))?;

        debug!(path = %path.display(), existing, "JsonlLeadSink opened");

        Ok(Self {
            path,
            file,
            next_id: existing + 1,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn count_lines(path: &Path) -> io::Result<i64> {
        match File::open(path) {
            Ok(file) => {
                let mut count = 0;
                for line in BufReader::new(file).lines() {
                    if !line?.trim().is_empty() {
                        count += 1;
                    }
                }
                Ok(count)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_line(&mut self, lead: &LeadDraft, receipt: LeadReceipt) -> io::Result<()> {
        let line = LeadLine {
            id: receipt.id,
            created_at: receipt.created_at,
            timestamp: lead.captured_at.as_deref().unwrap_or_default(),
            full_name: lead.full_name.as_deref().unwrap_or_default(),
            email: lead.email.as_deref().unwrap_or_default(),
            raw_data: &lead.submission,
        };

        let mut json = serde_json::to_vec(&line).map_err(io::Error::other)?;
        json.push(b'\n');
        append_whole(&mut self.file, &json, |file, bytes| {
            file.write_all(bytes)?;
            file.flush()
        })
    }
}

/// Append `bytes` through `write`, cutting the file back to its previous
/// length when the write fails so no partial line is left behind
fn append_whole(
    file: &mut File,
    bytes: &[u8],
    write: impl FnOnce(&mut File, &[u8]) -> io::Result<()>,
) -> io::Result<()> {
    let len = file.metadata()?.len();
    if let Err(e) = write(file, bytes) {
        if let Err(rollback) = file.set_len(len) {
            error!(sink = SINK_NAME, error = %rollback, "Failed to remove partial line");
        }
        return Err(e);
    }
    Ok(())
}

impl LeadSink for JsonlLeadSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    #[instrument(
        name = "jsonl_append",
        skip(self, lead),
        fields(path = %self.path.display(), row = lead.row_index)
    )]
    async fn append(&mut self, lead: &LeadDraft) -> Result<LeadReceipt, ContractError> {
        let receipt = LeadReceipt {
            id: self.next_id,
            created_at: Utc::now(),
        };

        self.write_line(lead, receipt).map_err(|e| {
            error!(sink = SINK_NAME, error = %e, "Write failed");
            ContractError::sink_write(SINK_NAME, e.to_string())
        })?;

        self.next_id += 1;
        Ok(receipt)
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.file
            .sync_all()
            .map_err(|e| ContractError::sink_write(SINK_NAME, e.to_string()))?;
        debug!(sink = SINK_NAME, "JsonlLeadSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ColumnMapping;
    use tempfile::tempdir;

    fn lead(name: &str) -> LeadDraft {
        let columns = ColumnMapping {
            timestamp: "Time".into(),
            full_name: "Name".into(),
            email: "Email".into(),
        };
        LeadDraft::from_submission(
            1,
            Submission::from_iter([("Time", "t1"), ("Name", name)]),
            &columns,
        )
    }

    #[tokio::test]
    async fn test_append_assigns_line_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("leads.jsonl");

        let mut sink = JsonlLeadSink::open(&path).unwrap();
        assert_eq!(sink.append(&lead("Alice")).await.unwrap().id, 1);
        assert_eq!(sink.append(&lead("Bob")).await.unwrap().id, 2);
        sink.close().await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["full_name"], "Alice");
        assert_eq!(lines[0]["email"], "");
        assert_eq!(lines[1]["raw_data"]["Name"], "Bob");
    }

    #[tokio::test]
    async fn test_reopen_continues_sequence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leads.jsonl");

        let mut sink = JsonlLeadSink::open(&path).unwrap();
        sink.append(&lead("Alice")).await.unwrap();
        drop(sink);

        let mut sink = JsonlLeadSink::open(&path).unwrap();
        assert_eq!(sink.append(&lead("Bob")).await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_interrupted_write_leaves_no_partial_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leads.jsonl");

        let mut sink = JsonlLeadSink::open(&path).unwrap();
        sink.append(&lead("Alice")).await.unwrap();

        let partial = br#"{"id":2,"full_name":"Bob"}"#;
        let interrupted = append_whole(&mut sink.file, partial, |file, bytes| {
            file.write_all(&bytes[..10])?;
            Err(io::Error::other("disk full"))
        });
        assert!(interrupted.is_err());

        assert_eq!(sink.append(&lead("Bob")).await.unwrap().id, 2);
        drop(sink);

        let content = fs::read_to_string(&path).unwrap();
        let names: Vec<String> = content
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
            .map(|v| v["full_name"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);

        let mut reopened = JsonlLeadSink::open(&path).unwrap();
        assert_eq!(reopened.append(&lead("Carol")).await.unwrap().id, 3);
    }
}
