//! FileWatermarkStore - watermarks in a JSON state file
//!
//! Layout: `{ "<sheet_id>:<view_name>": <rows consumed>, ... }`, pretty printed.
//! The whole object is rewritten on every update (temp file, then rename).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use contracts::{ContractError, WatermarkKey, INITIAL_WATERMARK};
use tracing::{debug, instrument, warn};

use crate::WatermarkStore;

/// File-backed watermark store
#[derive(Debug)]
pub struct FileWatermarkStore {
    path: PathBuf,
    state: BTreeMap<String, usize>,
}

impl FileWatermarkStore {
    /// Open the state file
    ///
    /// A missing file starts empty. An unreadable or corrupt file is logged
    /// and also treated as empty; it is replaced on the next update.
    #[instrument(name = "watermark_open", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = Self::load(&path);
        debug!(entries = state.len(), "Watermark state loaded");
        Self { path, state }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> BTreeMap<String, usize> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, "State file unreadable, starting empty");
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "State file corrupt, starting empty");
                BTreeMap::new()
            }
        }
    }

    fn persist(&self) -> Result<(), ContractError> {
        self.write_atomically().map_err(|e| ContractError::StatePersist {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn write_atomically(&self) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.state).map_err(std::io::Error::other)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn last_row(&self, key: &WatermarkKey) -> usize {
        self.state
            .get(&key.storage_key())
            .copied()
            .unwrap_or(INITIAL_WATERMARK)
    }

    #[instrument(name = "watermark_set", skip(self, key), fields(key = %key))]
    fn set_last_row(&mut self, key: &WatermarkKey, row: usize) -> Result<(), ContractError> {
        self.state.insert(key.storage_key(), row);
        self.persist()
    }

    fn entries(&self) -> Vec<(String, usize)> {
        self.state.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key() -> WatermarkKey {
        WatermarkKey::new("sheet1", "Form Responses 1")
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = FileWatermarkStore::open(dir.path().join("state.json"));
        assert_eq!(store.last_row(&key()), INITIAL_WATERMARK);
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_update_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = FileWatermarkStore::open(&path);
        store.set_last_row(&key(), 5).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["sheet1:Form Responses 1"], 5);
        assert!(!dir.path().join("state.json.tmp").exists());

        let reopened = FileWatermarkStore::open(&path);
        assert_eq!(reopened.last_row(&key()), 5);
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = FileWatermarkStore::open(&path);
        assert_eq!(store.last_row(&key()), INITIAL_WATERMARK);

        store.set_last_row(&key(), 2).unwrap();
        assert_eq!(FileWatermarkStore::open(&path).last_row(&key()), 2);
    }

    #[test]
    fn test_other_keys_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{ "sheet1:Archive": 12 }"#).unwrap();

        let mut store = FileWatermarkStore::open(&path);
        store.set_last_row(&key(), 3).unwrap();

        let reopened = FileWatermarkStore::open(&path);
        assert_eq!(reopened.last_row(&WatermarkKey::new("sheet1", "Archive")), 12);
        assert_eq!(reopened.last_row(&key()), 3);
    }

    #[test]
    fn test_persist_failure_keeps_memory_value() {
        let dir = tempdir().unwrap();
        // A directory where the state file should be makes the rename fail
        let path = dir.path().join("state.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let mut store = FileWatermarkStore::open(&path);
        let err = store.set_last_row(&key(), 4).unwrap_err();

        assert!(matches!(err, ContractError::StatePersist { .. }));
        assert_eq!(store.last_row(&key()), 4);
    }
}
