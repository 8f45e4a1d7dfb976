//! Export: inline every image and hand the document to the share target

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

use super::document::{ExportDocument, ExportedItem, InlineImage};
use crate::constants::transfer::EXPORT_PREFIX;
use crate::error::InventoryError;
use crate::images::{ImageEncoder, ImagePipeline};
use crate::inventory::Inventory;
use crate::platform::{FileOps, ShareOutcome, ShareTarget};
use crate::store::Store;
use crate::types::Item;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Where the document was written
    pub document: PathBuf,
    pub outcome: ShareOutcome,
    pub items: usize,
    pub images_inlined: usize,
    /// Images recorded with a null payload
    pub images_unreadable: usize,
}

/// Build the document in memory. Unreadable images get a null payload.
pub fn build_document<F: FileOps, E: ImageEncoder>(
    items: &[Item],
    locations: &[String],
    pipeline: &ImagePipeline<F, E>,
) -> ExportDocument {
    let inventory = items
        .iter()
        .map(|item| {
            let images_base64 = item
                .images
                .iter()
                .map(|path| {
                    let base64 = match pipeline.read_bytes(path) {
                        Ok(bytes) => Some(STANDARD.encode(bytes)),
                        Err(e) => {
                            warn!(item = %item.id, path = %path.display(), error = ?e, "Image unreadable, exporting without payload");
                            None
                        }
                    };
                    InlineImage {
                        uri: path.display().to_string(),
                        base64,
                    }
                })
                .collect();
            ExportedItem {
                item: item.clone(),
                images_base64,
            }
        })
        .collect();

    ExportDocument {
        exported_at: Utc::now(),
        inventory,
        locations: locations.to_vec(),
    }
}

/// Write the export document to scratch space and share it
pub fn export<S, F, E, T>(
    inventory: &Inventory<S>,
    pipeline: &ImagePipeline<F, E>,
    share: &T,
) -> Result<ExportReport, InventoryError>
where
    S: Store,
    F: FileOps,
    E: ImageEncoder,
    T: ShareTarget,
{
    let document = build_document(inventory.items(), inventory.locations(), pipeline);
    let (images_inlined, images_unreadable) = document
        .inventory
        .iter()
        .flat_map(|item| &item.images_base64)
        .fold((0, 0), |(ok, missing), image| match image.base64 {
            Some(_) => (ok + 1, missing),
            None => (ok, missing + 1),
        });

    let dir = pipeline.dirs().scratch_dir();
    let path = dir.join(format!("{EXPORT_PREFIX}{}.json", document.exported_at.timestamp_millis()));
    let bytes = serde_json::to_vec_pretty(&document)
        .context("Failed to serialize export document")
        .map_err(InventoryError::Export)?;
    pipeline
        .files()
        .create_dir_all(&dir)
        .and_then(|()| pipeline.files().write(&path, &bytes))
        .map_err(InventoryError::Export)?;

    let outcome = share.share(&path).map_err(InventoryError::Export)?;
    info!(
        path = %path.display(),
        items = document.inventory.len(),
        images_inlined,
        images_unreadable,
        shared = matches!(outcome, ShareOutcome::Shared(_)),
        "Export written"
    );

    Ok(ExportReport {
        document: path,
        outcome,
        items: document.inventory.len(),
        images_inlined,
        images_unreadable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::JpegEncoder;
    use crate::platform::{CopyToDestination, LocalFiles, NoShare, StorageDirs};
    use crate::resolution::Action;
    use crate::store::MemoryStore;
    use crate::types::ItemDraft;
    use std::fs;

    #[test]
    fn test_export_inlines_images_and_tolerates_missing() {
        let root = tempfile::tempdir().unwrap();
        let dirs = StorageDirs::new(Some(root.path().join("doc")), Some(root.path().join("cache")));
        let pipeline = ImagePipeline::new(LocalFiles, JpegEncoder, dirs);

        let present = pipeline.store_bytes(b"jpeg-bytes", "img_").unwrap();
        let missing = root.path().join("doc/images/gone.jpg");

        let mut inventory = Inventory::load(MemoryStore::new()).unwrap();
        inventory
            .apply(Action::Create(
                ItemDraft::new("Lamp", 1, "Attic").with_images(vec![present.clone(), missing]),
            ))
            .unwrap();

        let report = export(&inventory, &pipeline, &NoShare).unwrap();
        assert_eq!(report.outcome, ShareOutcome::Unavailable);
        assert_eq!((report.images_inlined, report.images_unreadable), (1, 1));
        assert!(report.document.starts_with(root.path().join("cache")));
        let name = report.document.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("casa_export_") && name.ends_with(".json"));

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&report.document).unwrap()).unwrap();
        let inlined = &value["inventory"][0]["imagesBase64"];
        assert_eq!(inlined[0]["base64"], STANDARD.encode(b"jpeg-bytes"));
        assert!(inlined[1]["base64"].is_null());
        assert_eq!(value["locations"][0], "Attic");
    }

    #[test]
    fn test_export_shares_to_destination() {
        let root = tempfile::tempdir().unwrap();
        let dirs = StorageDirs::new(Some(root.path().join("doc")), Some(root.path().join("cache")));
        let pipeline = ImagePipeline::new(LocalFiles, JpegEncoder, dirs);
        let inventory = Inventory::load(MemoryStore::new()).unwrap();
        let dest = root.path().join("backup.json");

        let report = export(&inventory, &pipeline, &CopyToDestination::new(&dest)).unwrap();
        assert_eq!(report.outcome, ShareOutcome::Shared(dest.clone()));
        assert_eq!(report.items, 0);
        assert!(dest.exists());
    }
}
