//! RowSet - Row Source output
//!
//! Raw tabular contents of one sheet view plus the key its watermark is stored under.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Watermark value for a key never seen before: only the header is consumed.
pub const INITIAL_WATERMARK: usize = 1;

/// Full contents of one sheet view
///
/// Record 0 is the header; records `1..len()` are data rows.
/// Rows may be shorter than the header (trailing empty cells are not sent by the API).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowSet {
    records: Vec<Vec<String>>,
}

impl RowSet {
    /// Create a row set from raw records (header first)
    pub fn new(records: Vec<Vec<String>>) -> Self {
        Self { records }
    }

    /// Number of records, header included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header record (column names)
    pub fn header(&self) -> Option<&[String]> {
        self.records.first().map(Vec::as_slice)
    }

    /// All records, header included
    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    /// Records at positions `>= watermark`, paired with their position
    ///
    /// Yields nothing when `watermark >= len()`.
    pub fn rows_from(&self, watermark: usize) -> impl Iterator<Item = (usize, &[String])> {
        self.records
            .iter()
            .enumerate()
            .skip(watermark)
            .map(|(idx, row)| (idx, row.as_slice()))
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for RowSet {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

/// Watermark key: one view of one spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatermarkKey {
    /// Spreadsheet identifier
    pub sheet_id: String,
    /// View (tab) name
    pub view_name: String,
}

impl WatermarkKey {
    pub fn new(sheet_id: impl Into<String>, view_name: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            view_name: view_name.into(),
        }
    }

    /// Key as stored in the state file: `"<sheet_id>:<view_name>"`
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WatermarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sheet_id, self.view_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowSet {
        RowSet::from_iter([
            vec!["Time", "Name", "Email"],
            vec!["t1", "Alice", "a@x.com"],
            vec!["t2", "Bob", "b@x.com"],
        ])
    }

    #[test]
    fn test_rows_from_skips_consumed() {
        let rows = sample();
        assert_eq!(rows.len(), 3);

        let fresh: Vec<_> = rows.rows_from(1).collect();
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh[0].0, 1);
        assert_eq!(fresh[0].1[1], "Alice");
        assert_eq!(fresh[1].1[1], "Bob");
    }

    #[test]
    fn test_rows_from_past_end_is_empty() {
        let rows = sample();
        assert_eq!(rows.rows_from(3).count(), 0);
        assert_eq!(rows.rows_from(10).count(), 0);
    }

    #[test]
    fn test_header() {
        assert_eq!(sample().header().unwrap()[0], "Time");
        assert!(RowSet::default().header().is_none());
    }

    #[test]
    fn test_storage_key_format() {
        let key = WatermarkKey::new("sheet1", "Form Responses 1");
        assert_eq!(key.storage_key(), "sheet1:Form Responses 1");
    }
}
