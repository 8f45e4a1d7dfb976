//! Export/Import Reconciler
//!
//! Export inlines every stored image as base64 so the document is portable.
//! Import restores those payloads under fresh local names and reconciles the
//! incoming data with a user-chosen [`ImportStrategy`].

mod document;
mod export;
mod import;

pub use document::{ExportDocument, ExportedItem, InlineImage};
pub use export::{ExportReport, build_document, export};
pub use import::{ImportStrategy, ImportSummary, StagedImport};
