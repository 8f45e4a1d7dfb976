//! Import: read, validate, restore inlined images, then reconcile
//!
//! Staging does everything that can fail structurally before the user is
//! asked for a strategy, so a rejected file never touches existing data.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::document::{IncomingDocument, IncomingItem};
use crate::constants::image::IMPORTED_PREFIX;
use crate::constants::transfer::{IMPORT_COPY_PREFIX, MAX_DOCUMENT_SIZE};
use crate::error::{ImportError, InventoryError};
use crate::images::{ImageEncoder, ImagePipeline};
use crate::inventory::Inventory;
use crate::platform::FileOps;
use crate::store::Store;
use crate::types::{Item, ItemId};

/// How an import is reconciled with existing data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStrategy {
    /// Discard current data and install the imported documents
    Replace,
    /// Add incoming items whose (title, location) key is new; union locations
    Merge,
}

impl ImportStrategy {
    pub const ALL: [ImportStrategy; 2] = [ImportStrategy::Replace, ImportStrategy::Merge];

    pub fn label(&self) -> &'static str {
        match self {
            ImportStrategy::Replace => "Replace",
            ImportStrategy::Merge => "Merge",
        }
    }
}

impl fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub strategy: ImportStrategy,
    pub items_added: usize,
    /// Incoming items dropped because their key already existed
    pub items_dropped: usize,
    pub locations_added: usize,
}

/// A validated document whose images are already restored locally
#[derive(Debug)]
pub struct StagedImport {
    items: Vec<Item>,
    locations: Vec<String>,
    restored: Vec<PathBuf>,
    exported_at: Option<String>,
}

impl StagedImport {
    /// Read and validate `source`, restoring inlined images under the images
    /// directory. Per-image failures are logged and skipped.
    pub fn stage<F: FileOps, E: ImageEncoder>(
        source: &Path,
        pipeline: &ImagePipeline<F, E>,
    ) -> Result<Self, ImportError> {
        let bytes = read_document(source, pipeline)?;
        let document = parse_document(&bytes)?;

        let mut restored = Vec::new();
        let items = document
            .inventory
            .into_iter()
            .map(|incoming| restore_item(incoming, pipeline, &mut restored))
            .collect::<Vec<_>>();

        info!(
            source = %source.display(),
            items = items.len(),
            locations = document.locations.len(),
            images_restored = restored.len(),
            "Import staged"
        );
        Ok(Self {
            items,
            locations: document.locations,
            restored,
            exported_at: document.exported_at,
        })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn restored_images(&self) -> &[PathBuf] {
        &self.restored
    }

    pub fn exported_at(&self) -> Option<&str> {
        self.exported_at.as_deref()
    }

    /// Reconcile with `inventory`. Both documents are written or neither is.
    pub fn apply<S: Store>(
        &self,
        strategy: ImportStrategy,
        inventory: &mut Inventory<S>,
    ) -> Result<ImportSummary, InventoryError> {
        let summary = match strategy {
            ImportStrategy::Replace => {
                inventory.replace_all(self.items.clone(), self.locations.clone())?;
                ImportSummary {
                    strategy,
                    items_added: self.items.len(),
                    items_dropped: 0,
                    locations_added: self.locations.len(),
                }
            }
            ImportStrategy::Merge => {
                let (items, locations, summary) = merge(inventory.items(), inventory.locations(), self);
                inventory.replace_all(items, locations)?;
                summary
            }
        };
        info!(
            strategy = %strategy,
            added = summary.items_added,
            dropped = summary.items_dropped,
            "Import applied"
        );
        Ok(summary)
    }

    /// Abandon the import and delete the images staging restored
    pub fn discard<F: FileOps, E: ImageEncoder>(self, pipeline: &ImagePipeline<F, E>) {
        for path in &self.restored {
            pipeline.delete_stored(path);
        }
        debug!(images = self.restored.len(), "Staged import discarded");
    }
}

fn merge(
    existing: &[Item],
    existing_locations: &[String],
    staged: &StagedImport,
) -> (Vec<Item>, Vec<String>, ImportSummary) {
    let keys: HashSet<(String, String)> = existing.iter().map(Item::merge_key).collect();
    let mut ids: HashSet<ItemId> = existing.iter().map(|item| item.id.clone()).collect();
    let mut items = existing.to_vec();
    let mut dropped = 0;

    for incoming in &staged.items {
        if keys.contains(&incoming.merge_key()) {
            debug!(title = %incoming.title, location = %incoming.location, "Dropping colliding import item");
            dropped += 1;
            continue;
        }
        let mut item = incoming.clone();
        if !ids.insert(item.id.clone()) {
            item.id = ItemId::generate();
            ids.insert(item.id.clone());
        }
        items.push(item);
    }

    let mut locations = existing_locations.to_vec();
    for name in &staged.locations {
        if !locations.contains(name) {
            locations.push(name.clone());
        }
    }

    let summary = ImportSummary {
        strategy: ImportStrategy::Merge,
        items_added: items.len() - existing.len(),
        items_dropped: dropped,
        locations_added: locations.len() - existing_locations.len(),
    };
    (items, locations, summary)
}

/// Read the document directly, else through a local scratch copy
fn read_document<F: FileOps, E: ImageEncoder>(
    source: &Path,
    pipeline: &ImagePipeline<F, E>,
) -> Result<Vec<u8>, ImportError> {
    let files = pipeline.files();
    if let Ok(size) = files.size(source)
        && size > MAX_DOCUMENT_SIZE
    {
        return Err(ImportError::TooLarge {
            size,
            max: MAX_DOCUMENT_SIZE,
        });
    }

    let bytes = match files.read(source) {
        Ok(bytes) => bytes,
        Err(direct) => {
            warn!(source = %source.display(), error = ?direct, "Direct read failed, trying a local copy");
            let scratch = pipeline.dirs().scratch_dir();
            let copy = scratch.join(format!("{IMPORT_COPY_PREFIX}{}.json", Utc::now().timestamp_millis()));
            let copied = files
                .create_dir_all(&scratch)
                .and_then(|()| files.copy_file(source, &copy))
                .and_then(|()| files.read(&copy));
            if let Err(e) = files.remove_file(&copy) {
                debug!(path = %copy.display(), error = ?e, "Could not remove import copy");
            }
            copied.map_err(|e| ImportError::Unreadable {
                path: source.to_path_buf(),
                source: e.context(format!("direct read also failed: {direct:#}")),
            })?
        }
    };

    let size = bytes.len() as u64;
    if size > MAX_DOCUMENT_SIZE {
        return Err(ImportError::TooLarge {
            size,
            max: MAX_DOCUMENT_SIZE,
        });
    }
    Ok(bytes)
}

fn parse_document(bytes: &[u8]) -> Result<IncomingDocument, ImportError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let is_array = |field: &str| value.get(field).is_some_and(Value::is_array);
    if !is_array("inventory") || !is_array("locations") {
        return Err(ImportError::InvalidShape("inventory and locations must be arrays"));
    }
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Import document has malformed entries");
        ImportError::InvalidShape("inventory or locations contain malformed entries")
    })
}

fn restore_item<F: FileOps, E: ImageEncoder>(
    incoming: IncomingItem,
    pipeline: &ImagePipeline<F, E>,
    restored: &mut Vec<PathBuf>,
) -> Item {
    let id = incoming.id.unwrap_or_else(ItemId::generate);

    let mut images = Vec::new();
    for inline in &incoming.images_base64 {
        let Some(payload) = &inline.base64 else {
            continue;
        };
        let bytes = match STANDARD.decode(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(item = %id, uri = %inline.uri, error = %e, "Skipping undecodable image");
                continue;
            }
        };
        match pipeline.store_bytes(&bytes, IMPORTED_PREFIX) {
            Ok(path) => {
                restored.push(path.clone());
                images.push(path);
            }
            Err(e) => warn!(item = %id, uri = %inline.uri, error = ?e, "Could not restore image"),
        }
    }
    if images.is_empty() {
        images = incoming.images;
    }

    Item {
        id,
        title: incoming.title,
        images,
        quantity: incoming.quantity,
        location: incoming.location,
        description: incoming.description,
    }
}
