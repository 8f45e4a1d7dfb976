//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Config file location
pub mod config {
    /// Directory under the platform config/data/cache dirs
    pub const APP_DIR: &str = "casa-inventory";

    /// Settings file name inside the config directory
    pub const FILENAME: &str = "config.json";
}

/// Image ingestion budget
pub mod image {
    /// Default resize width in pixels
    pub const DEFAULT_MAX_WIDTH: u32 = 1280;

    /// Default encoded size budget in KB
    pub const DEFAULT_TARGET_SIZE_KB: u64 = 250;

    /// First JPEG quality tried
    pub const START_QUALITY: f32 = 0.9;

    /// Quality decrement between attempts
    pub const QUALITY_STEP: f32 = 0.15;

    /// Loop stops once quality falls below this floor
    pub const MIN_QUALITY: f32 = 0.35;

    /// Subdirectory of the document directory holding stored images
    pub const IMAGES_SUBDIR: &str = "images";

    /// Prefix for ingested image filenames
    pub const INGESTED_PREFIX: &str = "img_";

    /// Prefix for images restored from an import
    pub const IMPORTED_PREFIX: &str = "img_imported_";

    /// Extension of every stored image
    pub const EXTENSION: &str = "jpg";
}

/// Item field limits enforced on drafts
pub mod limits {
    /// Maximum images per item
    pub const MAX_IMAGES: usize = 5;

    /// Maximum description length in characters
    pub const MAX_DESCRIPTION_CHARS: usize = 500;
}

/// Export/import document constants
pub mod transfer {
    /// Prefix for export filenames (followed by a millisecond timestamp)
    pub const EXPORT_PREFIX: &str = "casa_export_";

    /// Prefix for the local copy made when a document cannot be read in place
    pub const IMPORT_COPY_PREFIX: &str = "casa_import_";

    /// Largest import document accepted (256 MB) to bound memory use
    pub const MAX_DOCUMENT_SIZE: u64 = 256 * 1024 * 1024;
}

/// Settings validation ranges
pub mod validation {
    pub const MIN_MAX_WIDTH: u32 = 64;
    pub const MAX_MAX_WIDTH: u32 = 8192;
    pub const MIN_TARGET_SIZE_KB: u64 = 16;
    pub const MAX_TARGET_SIZE_KB: u64 = 10_240;
}
