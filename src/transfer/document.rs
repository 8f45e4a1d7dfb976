//! Portable export document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{Item, ItemId};

/// Top-level export file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub inventory: Vec<ExportedItem>,
    pub locations: Vec<String>,
}

/// Item fields plus the inlined content of each image
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedItem {
    #[serde(flatten)]
    pub item: Item,
    pub images_base64: Vec<InlineImage>,
}

/// `base64` is `None` when the file could not be read at export time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    pub uri: String,
    pub base64: Option<String>,
}

/// Import side of the document. Only the two arrays are required; items are
/// lenient about missing optional fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IncomingDocument {
    #[serde(default)]
    pub exported_at: Option<String>,
    pub inventory: Vec<IncomingItem>,
    pub locations: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IncomingItem {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<PathBuf>,
    #[serde(default)]
    pub images_base64: Vec<InlineImage>,
}
