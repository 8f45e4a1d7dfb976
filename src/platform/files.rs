//! File primitives used by the image pipeline and the transfer reconciler

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Existence/size/move/copy/fetch-write/delete primitives
pub trait FileOps {
    fn exists(&self, path: &Path) -> bool;

    /// Size in bytes
    fn size(&self, path: &Path) -> Result<u64>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn move_file(&self, from: &Path, to: &Path) -> Result<()>;

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Read `from` fully into memory, then write the bytes to `to`
    fn fetch_write(&self, from: &Path, to: &Path) -> Result<()> {
        let bytes = self.read(from)?;
        self.write(to, &bytes)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Idempotent: a missing file counts as removed
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Idempotent: a missing directory counts as removed
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// Local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFiles;

impl FileOps for LocalFiles {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn size(&self, path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        Ok(metadata.len())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to)
            .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to)
            .map(|_| ())
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }
}
