//! Error taxonomy
//!
//! Plumbing code uses `anyhow` with context; these enums sit at the domain
//! boundary where the caller must decide what to show the user. Every
//! user-facing message names the operation that failed.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ItemId;

/// Input rejected before any state is touched
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("'{0}' is not a valid quantity")]
    InvalidQuantity(String),
    #[error("adjustment must be greater than 0")]
    ZeroAdjustment,
    #[error("resulting quantity would be negative (current {current}, removing {removing})")]
    NegativeQuantity { current: u32, removing: u32 },
    #[error("quantity is too large")]
    QuantityOverflow,
    #[error("description is {len} characters (max {max})")]
    DescriptionTooLong { len: usize, max: usize },
    #[error("an item can hold at most {max} images (got {count})")]
    TooManyImages { count: usize, max: usize },
    #[error("location name cannot be empty")]
    EmptyLocationName,
    #[error("location '{0}' already exists")]
    LocationExists(String),
    #[error("location '{0}' does not exist")]
    UnknownLocation(String),
    #[error("location '{name}' still holds {items} item(s)")]
    LocationInUse { name: String, items: usize },
    #[error("destination is the same as the source location")]
    SameLocation,
    #[error("no items selected")]
    EmptySelection,
    #[error("a move is already in progress")]
    MoveInProgress,
}

/// Terminal failure of the image pipeline: nothing usable was produced
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source image {0} does not exist")]
    MissingSource(PathBuf),
    #[error("could not obtain or create an image file for {source_path}")]
    Exhausted {
        source_path: PathBuf,
        #[source]
        last_error: Option<anyhow::Error>,
    },
}

/// Import rejected before any data is touched
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not read import file {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("import file is too large ({size} bytes, max {max})")]
    TooLarge { size: u64, max: u64 },
    #[error("import file is not valid JSON")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid file: {0}")]
    InvalidShape(&'static str),
}

/// Failure of a user-initiated operation on the inventory
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{operation} failed")]
    Storage {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("image could not be added")]
    Ingestion(#[from] IngestError),
    #[error("import failed: {0}")]
    Import(#[from] ImportError),
    #[error("export failed")]
    Export(#[source] anyhow::Error),
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
}

impl InventoryError {
    pub(crate) fn storage(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Storage { operation, source }
    }
}
