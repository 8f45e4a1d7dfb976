#![forbid(unsafe_code)]

//! Household inventory core: duplicate resolution, sequential reassignment,
//! compress-to-budget image ingestion and export/import reconciliation.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod images;
pub mod inventory;
pub mod platform;
pub mod resolution;
pub mod sequencer;
pub mod store;
pub mod transfer;
pub mod types;

pub use error::{ImportError, IngestError, InventoryError, ValidationError};
pub use inventory::Inventory;
pub use types::{Item, ItemDraft, ItemId};
