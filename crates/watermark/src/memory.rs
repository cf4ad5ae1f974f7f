//! MemoryWatermarkStore - nothing survives the process

use std::collections::BTreeMap;

use contracts::{ContractError, WatermarkKey, INITIAL_WATERMARK};

use crate::WatermarkStore;

#[derive(Debug, Default, Clone)]
pub struct MemoryWatermarkStore {
    state: BTreeMap<String, usize>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a watermark (test setup)
    pub fn with_entry(mut self, key: &WatermarkKey, row: usize) -> Self {
        self.state.insert(key.storage_key(), row);
        self
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn last_row(&self, key: &WatermarkKey) -> usize {
        self.state
            .get(&key.storage_key())
            .copied()
            .unwrap_or(INITIAL_WATERMARK)
    }

    fn set_last_row(&mut self, key: &WatermarkKey, row: usize) -> Result<(), ContractError> {
        self.state.insert(key.storage_key(), row);
        Ok(())
    }

    fn entries(&self) -> Vec<(String, usize)> {
        self.state.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_key_is_initial() {
        let store = MemoryWatermarkStore::new();
        assert_eq!(store.last_row(&WatermarkKey::new("s", "v")), INITIAL_WATERMARK);
    }

    #[test]
    fn test_key_isolation() {
        let main = WatermarkKey::new("sheet1", "Form Responses 1");
        let other = WatermarkKey::new("sheet1", "Archive");
        let mut store = MemoryWatermarkStore::new().with_entry(&other, 7);

        store.set_last_row(&main, 3).unwrap();

        assert_eq!(store.last_row(&main), 3);
        assert_eq!(store.last_row(&other), 7);
        assert_eq!(
            store.entries(),
            vec![
                ("sheet1:Archive".to_string(), 7),
                ("sheet1:Form Responses 1".to_string(), 3)
            ]
        );
    }
}
