//! In-memory store used by tests and embedders that do their own persistence

use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};

use super::{Store, StoreKey};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: HashMap<StoreKey, String>,
    failing: HashSet<StoreKey>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save of `key` fail
    pub fn fail_saves_for(&mut self, key: StoreKey) {
        self.failing.insert(key);
    }

    pub fn restore_saves_for(&mut self, key: StoreKey) {
        self.failing.remove(&key);
    }
}

impl Store for MemoryStore {
    fn load(&self, key: StoreKey) -> Result<Option<String>> {
        Ok(self.documents.get(&key).cloned())
    }

    fn save(&mut self, key: StoreKey, value: &str) -> Result<()> {
        if self.failing.contains(&key) {
            bail!("simulated write failure for {key}");
        }
        self.documents.insert(key, value.to_string());
        Ok(())
    }
}
