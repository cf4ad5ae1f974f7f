//! Submission - one data row keyed by column name

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One form submission: column name -> cell value, in header order
///
/// Built by zipping a data row against the header. Cells missing at the end of
/// the row map to `""`; cells past the header are ignored. If the header
/// repeats a name, the later cell wins but the first position is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    fields: Vec<(String, String)>,
}

impl Submission {
    /// Zip a data row against the header
    pub fn from_row(header: &[String], row: &[String]) -> Self {
        let mut fields: Vec<(String, String)> = Vec::with_capacity(header.len());

        for (idx, column) in header.iter().enumerate() {
            let value = row.get(idx).cloned().unwrap_or_default();
            match fields.iter_mut().find(|(name, _)| name == column) {
                Some(existing) => existing.1 = value,
                None => fields.push((column.clone(), value)),
            }
        }

        Self { fields }
    }

    /// Cell value for a column, `None` if the header has no such column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate `(column, value)` pairs in header order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Submission {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for Submission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
