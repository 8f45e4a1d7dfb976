//! Share/export-destination primitive

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// What happened to a document handed to the share mechanism
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Delivered; the path is where it ended up
    Shared(PathBuf),
    /// No share mechanism; the caller reports the document location instead
    Unavailable,
}

pub trait ShareTarget {
    fn share(&self, document: &Path) -> Result<ShareOutcome>;
}

/// No share mechanism available
#[derive(Debug, Default, Clone, Copy)]
pub struct NoShare;

impl ShareTarget for NoShare {
    fn share(&self, _document: &Path) -> Result<ShareOutcome> {
        Ok(ShareOutcome::Unavailable)
    }
}

/// Copies the document to a user-chosen destination. A directory destination
/// keeps the document's file name.
#[derive(Debug, Clone)]
pub struct CopyToDestination {
    destination: PathBuf,
}

impl CopyToDestination {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self { destination: destination.into() }
    }
}

impl ShareTarget for CopyToDestination {
    fn share(&self, document: &Path) -> Result<ShareOutcome> {
        let target = match document.file_name() {
            Some(name) if self.destination.is_dir() => self.destination.join(name),
            _ => self.destination.clone(),
        };
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::copy(document, &target).with_context(|| {
            format!("Failed to copy {} to {}", document.display(), target.display())
        })?;
        info!(path = %target.display(), "Shared export document");
        Ok(ShareOutcome::Shared(target))
    }
}
