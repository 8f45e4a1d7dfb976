//! Persistent Store
//!
//! Whole-document key/value persistence. Callers read an entire collection,
//! mutate it in memory and write the entire collection back; there are no
//! partial updates and no automatic retries.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::warn;

use crate::types::{Item, ThemePreference};

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Logical documents kept by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Inventory,
    Locations,
    ThemePreference,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Inventory => "inventory",
            StoreKey::Locations => "locations",
            StoreKey::ThemePreference => "themePreference",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw document storage
pub trait Store {
    /// Stored document for `key`, or `None` when nothing was ever saved
    fn load(&self, key: StoreKey) -> Result<Option<String>>;

    /// Replace the document for `key`
    fn save(&mut self, key: StoreKey, value: &str) -> Result<()>;
}

/// Typed accessors for the three documents
pub trait StoreExt: Store {
    fn load_json<T: DeserializeOwned + Default>(&self, key: StoreKey) -> Result<T> {
        match self.load(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse stored {key} document")),
            None => Ok(T::default()),
        }
    }

    fn save_json<T: Serialize + ?Sized>(&mut self, key: StoreKey, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize {key} document"))?;
        self.save(key, &raw)
    }

    fn load_inventory(&self) -> Result<Vec<Item>> {
        self.load_json(StoreKey::Inventory)
    }

    fn save_inventory(&mut self, items: &[Item]) -> Result<()> {
        self.save_json(StoreKey::Inventory, items)
    }

    fn load_locations(&self) -> Result<Vec<String>> {
        self.load_json(StoreKey::Locations)
    }

    fn save_locations(&mut self, locations: &[String]) -> Result<()> {
        self.save_json(StoreKey::Locations, locations)
    }

    /// Unknown or unreadable values fall back to `auto`
    fn load_theme(&self) -> ThemePreference {
        match self.load(StoreKey::ThemePreference) {
            Ok(Some(raw)) => {
                let value = serde_json::from_str::<String>(&raw).unwrap_or(raw);
                ThemePreference::parse(&value).unwrap_or_else(|| {
                    warn!(value = %value, "Unknown theme preference, using auto");
                    ThemePreference::Auto
                })
            }
            Ok(None) => ThemePreference::Auto,
            Err(e) => {
                warn!(error = ?e, "Failed to load theme preference, using auto");
                ThemePreference::Auto
            }
        }
    }

    fn save_theme(&mut self, theme: ThemePreference) -> Result<()> {
        self.save(StoreKey::ThemePreference, theme.as_str())
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemDraft, ItemId};

    #[test]
    fn test_empty_store_loads_defaults() {
        let store = MemoryStore::new();
        assert!(store.load_inventory().unwrap().is_empty());
        assert!(store.load_locations().unwrap().is_empty());
        assert_eq!(store.load_theme(), ThemePreference::Auto);
    }

    #[test]
    fn test_inventory_roundtrip_preserves_order() {
        let mut store = MemoryStore::new();
        let items = vec![
            Item::from_draft(ItemDraft::new("Screws", 10, "Garage")),
            Item::from_draft(ItemDraft::new("Nails", 3, "Garage")),
        ];
        store.save_inventory(&items).unwrap();

        let loaded = store.load_inventory().unwrap();
        assert_eq!(loaded, items);
    }

    #[test]
    fn test_locations_keep_insertion_order() {
        let mut store = MemoryStore::new();
        let locations = vec!["Kitchen".to_string(), "Attic".to_string(), "Garage".to_string()];
        store.save_locations(&locations).unwrap();
        assert_eq!(store.load_locations().unwrap(), locations);
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let mut store = MemoryStore::new();
        store.save(StoreKey::Inventory, "[{\"id\":").unwrap();
        assert!(store.load_inventory().is_err());
    }

    #[test]
    fn test_theme_accepts_bare_and_quoted_values() {
        let mut store = MemoryStore::new();
        store.save_theme(ThemePreference::Dark).unwrap();
        assert_eq!(store.load(StoreKey::ThemePreference).unwrap().as_deref(), Some("dark"));
        assert_eq!(store.load_theme(), ThemePreference::Dark);

        store.save(StoreKey::ThemePreference, "light").unwrap();
        assert_eq!(store.load_theme(), ThemePreference::Light);

        store.save(StoreKey::ThemePreference, "\"neon\"").unwrap();
        assert_eq!(store.load_theme(), ThemePreference::Auto);
    }

    #[test]
    fn test_item_ids_survive_storage() {
        let mut store = MemoryStore::new();
        let item = Item::from_draft(ItemDraft::new("Lamp", 1, "Attic"));
        let id: ItemId = item.id.clone();
        store.save_inventory(std::slice::from_ref(&item)).unwrap();
        assert_eq!(store.load_inventory().unwrap()[0].id, id);
    }
}
