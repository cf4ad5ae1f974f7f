//! Lead records - Lead Sink input/output

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ColumnMapping, Submission};

/// A lead ready to be persisted
///
/// The three named fields are `None` when the header has no such column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadDraft {
    /// Position of the source row (header = 0)
    pub row_index: usize,

    /// Capture timestamp, free text as provided by the form
    pub captured_at: Option<String>,

    /// Display name
    pub full_name: Option<String>,

    /// Contact email
    pub email: Option<String>,

    /// Every column of the row
    pub submission: Submission,
}

impl LeadDraft {
    /// Extract the named fields from a submission
    pub fn from_submission(
        row_index: usize,
        submission: Submission,
        columns: &ColumnMapping,
    ) -> Self {
        let pick = |column: &str| submission.get(column).map(str::to_string);

        Self {
            row_index,
            captured_at: pick(&columns.timestamp),
            full_name: pick(&columns.full_name),
            email: pick(&columns.email),
            submission,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &str {
        self.email.as_deref().unwrap_or("no email")
    }
}

/// Storage-assigned identity of a persisted lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeadReceipt {
    /// Sequence identity
    pub id: i64,

    /// Creation time assigned by storage
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnMapping {
        ColumnMapping {
            timestamp: "Time".into(),
            full_name: "Name".into(),
            email: "Email".into(),
        }
    }

    #[test]
    fn test_from_submission_picks_named_columns() {
        let submission = Submission::from_iter([
            ("Time", "t1"),
            ("Name", "Alice"),
            ("Email", "a@x.com"),
            ("Phone", "123"),
        ]);

        let draft = LeadDraft::from_submission(1, submission, &columns());
        assert_eq!(draft.captured_at.as_deref(), Some("t1"));
        assert_eq!(draft.full_name.as_deref(), Some("Alice"));
        assert_eq!(draft.email.as_deref(), Some("a@x.com"));
        assert_eq!(draft.submission.len(), 4);
        assert_eq!(draft.label(), "a@x.com");
    }

    #[test]
    fn test_absent_column_is_none() {
        let submission = Submission::from_iter([("Name", "Bob")]);

        let draft = LeadDraft::from_submission(2, submission, &columns());
        assert_eq!(draft.captured_at, None);
        assert_eq!(draft.email, None);
        assert_eq!(draft.label(), "no email");
    }
}
