//! File-backed store: one JSON file per document under the data directory

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Store, StoreKey};

pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: StoreKey) -> PathBuf {
        self.root.join(format!("{}.json", key.as_str()))
    }
}

impl Store for JsonFileStore {
    fn load(&self, key: StoreKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Writes to a sibling temp file then renames over the target so a crash
    /// mid-write never leaves a truncated document behind
    fn save(&mut self, key: StoreKey, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create data directory {}", self.root.display()))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(key = %key, bytes = value.len(), "Saved document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreExt;
    use crate::types::{Item, ItemDraft};

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load(StoreKey::Inventory).unwrap().is_none());
    }

    #[test]
    fn test_save_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let mut store = JsonFileStore::new(&root);

        store.save_locations(&["Garage".to_string()]).unwrap();

        let raw = fs::read_to_string(root.join("locations.json")).unwrap();
        assert_eq!(raw, r#"["Garage"]"#);
        assert!(!root.join("locations.json.tmp").exists());
    }

    #[test]
    fn test_documents_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        let item = Item::from_draft(ItemDraft::new("Screws", 10, "Garage"));

        store.save_inventory(std::slice::from_ref(&item)).unwrap();
        store.save_locations(&["Garage".to_string()]).unwrap();

        let reopened = JsonFileStore::new(dir.path());
        assert_eq!(reopened.load_inventory().unwrap(), vec![item]);
        assert_eq!(reopened.load_locations().unwrap(), vec!["Garage".to_string()]);
    }

    #[test]
    fn test_save_overwrites_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        store.save_locations(&["A".to_string(), "B".to_string()]).unwrap();
        store.save_locations(&["C".to_string()]).unwrap();
        assert_eq!(store.load_locations().unwrap(), vec!["C".to_string()]);
    }

    #[test]
    fn test_unwritable_root_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let mut store = JsonFileStore::new(blocker.join("data"));
        assert!(store.save_locations(&["Garage".to_string()]).is_err());
    }
}
