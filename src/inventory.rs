//! Workflow controller
//!
//! Owns the in-memory copy of the inventory and location documents and is the
//! only thing that writes them. Every mutation builds the new documents,
//! writes them through the [`Store`], and only then replaces the in-memory
//! state. A failed write leaves memory untouched; when the second of two
//! writes fails the first is rolled back.

use tracing::{debug, error, info, warn};

use crate::error::{InventoryError, ValidationError};
use crate::resolution::{Action, Resolution, resolve_create, resolve_reassign_step};
use crate::store::{Store, StoreExt};
use crate::types::{Item, ItemDraft, ItemId, QuantityAdjustment, ThemePreference};
use std::path::PathBuf;

/// Effect of an applied [`Action`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(Item),
    Aggregated { into: Item, removed: Option<Item> },
    Relocated(Item),
    Skipped,
}

/// Result of editing an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub item: Item,
    /// Images referenced before the edit but not after
    pub dropped_images: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Unchanged,
    Renamed { items_updated: usize },
}

pub struct Inventory<S> {
    store: S,
    items: Vec<Item>,
    locations: Vec<String>,
}

impl<S: Store> Inventory<S> {
    /// Read both documents from the store
    pub fn load(store: S) -> Result<Self, InventoryError> {
        let items = store
            .load_inventory()
            .map_err(|e| InventoryError::storage("load inventory", e))?;
        let locations = store
            .load_locations()
            .map_err(|e| InventoryError::storage("load locations", e))?;
        info!(items = items.len(), locations = locations.len(), "Loaded inventory");
        Ok(Self {
            store,
            items,
            locations,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn search(&self, query: &str) -> Vec<&Item> {
        let query = query.trim();
        self.items
            .iter()
            .filter(|item| item.matches_query(query))
            .collect()
    }

    pub fn items_in(&self, location: &str) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.location == location)
            .collect()
    }

    pub fn theme(&self) -> ThemePreference {
        self.store.load_theme()
    }

    pub fn set_theme(&mut self, theme: ThemePreference) -> Result<(), InventoryError> {
        self.store
            .save_theme(theme)
            .map_err(|e| InventoryError::storage("save theme", e))?;
        info!(theme = %theme, "Theme preference saved");
        Ok(())
    }

    /// First step of creating an item: decide whether the user must be asked
    pub fn begin_create(&self, draft: &ItemDraft) -> Resolution {
        resolve_create(draft, &self.items)
    }

    /// Resolution for moving one item to `target`, `None` when the item is gone
    pub fn begin_reassign_step(&self, id: &ItemId, target: &str) -> Option<Resolution> {
        self.item(id)
            .map(|moving| resolve_reassign_step(moving, target, &self.items))
    }

    /// Apply a resolved action and persist it
    pub fn apply(&mut self, action: Action) -> Result<Outcome, InventoryError> {
        match action {
            Action::Create(draft) => {
                draft.validate()?;
                let item = Item::from_draft(draft);
                let mut items = self.items.clone();
                items.push(item.clone());
                let locations = self.with_location(&item.location);
                self.commit("save item", Some(items), locations)?;
                info!(item = %item.id, title = %item.title, location = %item.location, "Item created");
                Ok(Outcome::Created(item))
            }
            Action::Aggregate {
                into,
                quantity,
                remove,
            } => {
                let mut items = self.items.clone();
                let target = position(&items, &into)?;
                items[target].quantity = items[target]
                    .quantity
                    .checked_add(quantity)
                    .ok_or(ValidationError::QuantityOverflow)?;
                let merged = items[target].clone();

                let removed = match remove {
                    Some(id) => {
                        let index = position(&items, &id)?;
                        Some(items.remove(index))
                    }
                    None => None,
                };

                self.commit("aggregate item", Some(items), None)?;
                info!(
                    into = %merged.id,
                    added = quantity,
                    quantity = merged.quantity,
                    removed = ?removed.as_ref().map(|item| item.id.as_str()),
                    "Quantity aggregated"
                );
                Ok(Outcome::Aggregated {
                    into: merged,
                    removed,
                })
            }
            Action::Relocate { item, location } => {
                let mut items = self.items.clone();
                let index = position(&items, &item)?;
                items[index].location = location.clone();
                let moved = items[index].clone();
                let locations = self.with_location(&location);
                self.commit("move item", Some(items), locations)?;
                info!(item = %moved.id, location = %location, "Item relocated");
                Ok(Outcome::Relocated(moved))
            }
            Action::Skip => Ok(Outcome::Skipped),
        }
    }

    /// Replace an item's fields. No duplicate check is made on edit.
    pub fn update_item(&mut self, id: &ItemId, draft: ItemDraft) -> Result<EditOutcome, InventoryError> {
        draft.validate()?;
        let mut items = self.items.clone();
        let index = position(&items, id)?;

        let dropped_images = items[index]
            .images
            .iter()
            .filter(|old| !draft.images.contains(old))
            .cloned()
            .collect();

        let item = &mut items[index];
        item.title = draft.title;
        item.quantity = draft.quantity;
        item.location = draft.location;
        item.description = draft.description;
        item.images = draft.images;
        let updated = item.clone();

        let locations = self.with_location(&updated.location);
        self.commit("save item", Some(items), locations)?;
        info!(item = %updated.id, "Item updated");
        Ok(EditOutcome {
            item: updated,
            dropped_images,
        })
    }

    /// Remove an item; the caller owns cleanup of its stored images
    pub fn delete_item(&mut self, id: &ItemId) -> Result<Item, InventoryError> {
        let mut items = self.items.clone();
        let index = position(&items, id)?;
        let removed = items.remove(index);
        self.commit("delete item", Some(items), None)?;
        info!(item = %removed.id, title = %removed.title, "Item deleted");
        Ok(removed)
    }

    pub fn adjust_quantity(
        &mut self,
        id: &ItemId,
        adjustment: QuantityAdjustment,
    ) -> Result<Item, InventoryError> {
        let mut items = self.items.clone();
        let index = position(&items, id)?;
        items[index].quantity = adjustment.apply(items[index].quantity)?;
        let adjusted = items[index].clone();
        self.commit("update quantity", Some(items), None)?;
        info!(item = %adjusted.id, ?adjustment, quantity = adjusted.quantity, "Quantity adjusted");
        Ok(adjusted)
    }

    pub fn add_location(&mut self, name: &str) -> Result<String, InventoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyLocationName.into());
        }
        if self.locations.iter().any(|existing| existing == name) {
            return Err(ValidationError::LocationExists(name.to_string()).into());
        }
        let mut locations = self.locations.clone();
        locations.push(name.to_string());
        self.commit("add location", None, Some(locations))?;
        info!(location = %name, "Location added");
        Ok(name.to_string())
    }

    /// Rename a location and every item that references it
    pub fn rename_location(&mut self, old: &str, new: &str) -> Result<RenameOutcome, InventoryError> {
        let index = self
            .locations
            .iter()
            .position(|existing| existing == old)
            .ok_or_else(|| ValidationError::UnknownLocation(old.to_string()))?;
        let new = new.trim();
        if new.is_empty() {
            return Err(ValidationError::EmptyLocationName.into());
        }
        if new == old {
            return Ok(RenameOutcome::Unchanged);
        }
        if self.locations.iter().any(|existing| existing == new) {
            return Err(ValidationError::LocationExists(new.to_string()).into());
        }

        let mut locations = self.locations.clone();
        locations[index] = new.to_string();

        let mut items = self.items.clone();
        let mut items_updated = 0;
        for item in items.iter_mut().filter(|item| item.location == old) {
            item.location = new.to_string();
            items_updated += 1;
        }

        self.commit("rename location", Some(items), Some(locations))?;
        info!(from = %old, to = %new, items_updated, "Location renamed");
        Ok(RenameOutcome::Renamed { items_updated })
    }

    /// Delete a location nothing references
    pub fn delete_location(&mut self, name: &str) -> Result<(), InventoryError> {
        let index = self
            .locations
            .iter()
            .position(|existing| existing == name)
            .ok_or_else(|| ValidationError::UnknownLocation(name.to_string()))?;
        let in_use = self.items_in(name).len();
        if in_use > 0 {
            return Err(ValidationError::LocationInUse {
                name: name.to_string(),
                items: in_use,
            }
            .into());
        }

        let mut locations = self.locations.clone();
        locations.remove(index);
        self.commit("delete location", None, Some(locations))?;
        info!(location = %name, "Location deleted");
        Ok(())
    }

    /// Install both documents wholesale (import)
    pub fn replace_all(&mut self, items: Vec<Item>, locations: Vec<String>) -> Result<(), InventoryError> {
        let (item_count, location_count) = (items.len(), locations.len());
        self.commit("import", Some(items), Some(locations))?;
        info!(items = item_count, locations = location_count, "Inventory replaced");
        Ok(())
    }

    /// Empty both documents. Stored images are the caller's to purge.
    pub fn clear_all(&mut self) -> Result<(), InventoryError> {
        self.commit("delete all data", Some(Vec::new()), Some(Vec::new()))?;
        warn!("All inventory data deleted");
        Ok(())
    }

    /// Location set with `name` appended, or `None` when nothing changes
    fn with_location(&self, name: &str) -> Option<Vec<String>> {
        if name.is_empty() || self.locations.iter().any(|existing| existing == name) {
            return None;
        }
        debug!(location = %name, "Registering new location");
        let mut locations = self.locations.clone();
        locations.push(name.to_string());
        Some(locations)
    }

    /// Write locations then inventory; restore the locations document if the
    /// inventory write fails. Memory is updated only after both succeed.
    fn commit(
        &mut self,
        operation: &'static str,
        items: Option<Vec<Item>>,
        locations: Option<Vec<String>>,
    ) -> Result<(), InventoryError> {
        if let Some(locations) = &locations {
            self.store
                .save_locations(locations)
                .map_err(|e| InventoryError::storage(operation, e))?;
        }

        if let Some(items) = &items
            && let Err(e) = self.store.save_inventory(items)
        {
            if locations.is_some() {
                match self.store.save_locations(&self.locations) {
                    Ok(()) => warn!(operation, "Inventory write failed, locations rolled back"),
                    Err(rollback) => {
                        error!(operation, error = ?rollback, "Failed to roll back locations after inventory write failure")
                    }
                }
            }
            return Err(InventoryError::storage(operation, e));
        }

        if let Some(items) = items {
            self.items = items;
        }
        if let Some(locations) = locations {
            self.locations = locations;
        }
        Ok(())
    }
}

fn position(items: &[Item], id: &ItemId) -> Result<usize, InventoryError> {
    items
        .iter()
        .position(|item| &item.id == id)
        .ok_or_else(|| InventoryError::ItemNotFound(id.clone()))
}
