//! In-memory key-value store.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{KeyValueStore, StoreResult};

/// Non-durable store, useful for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn all_keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }

    fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        let mut items = self.items.write();
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }
}
