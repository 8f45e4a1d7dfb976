//! Durable and cache directory resolution

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::constants::{config::APP_DIR, image::IMAGES_SUBDIR};

/// Document-scoped and cache-scoped base directories. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageDirs {
    pub document: Option<PathBuf>,
    pub cache: Option<PathBuf>,
}

impl StorageDirs {
    pub fn new(document: Option<PathBuf>, cache: Option<PathBuf>) -> Self {
        Self { document, cache }
    }

    /// Settings overrides first, then the platform data/cache dirs
    pub fn resolve(settings: &Settings) -> Self {
        let document = settings
            .data_dir
            .clone()
            .or_else(|| ::dirs::data_dir().map(|d| d.join(APP_DIR)));
        let cache = settings
            .cache_dir
            .clone()
            .or_else(|| ::dirs::cache_dir().map(|d| d.join(APP_DIR)));
        Self { document, cache }
    }

    /// Base for durable files: the document dir, else the cache dir
    pub fn durable_base(&self) -> Option<&Path> {
        self.document.as_deref().or(self.cache.as_deref())
    }

    /// Where ingested and imported images are kept
    pub fn images_dir(&self) -> Option<PathBuf> {
        self.durable_base().map(|base| base.join(IMAGES_SUBDIR))
    }

    /// Scratch space: the cache dir, else the document dir, else the OS temp dir
    pub fn scratch_dir(&self) -> PathBuf {
        self.cache
            .clone()
            .or_else(|| self.document.clone())
            .unwrap_or_else(std::env::temp_dir)
    }

    /// True when `path` lives under the document or cache directory
    pub fn contains(&self, path: &Path) -> bool {
        [self.document.as_deref(), self.cache.as_deref()]
            .into_iter()
            .flatten()
            .any(|base| path.starts_with(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images_dir_prefers_document() {
        let dirs = StorageDirs::new(Some("/doc".into()), Some("/cache".into()));
        assert_eq!(dirs.images_dir(), Some(PathBuf::from("/doc/images")));
        assert_eq!(dirs.scratch_dir(), PathBuf::from("/cache"));
    }

    #[test]
    fn test_images_dir_falls_back_to_cache() {
        let dirs = StorageDirs::new(None, Some("/cache".into()));
        assert_eq!(dirs.images_dir(), Some(PathBuf::from("/cache/images")));
    }

    #[test]
    fn test_no_durable_directory() {
        let dirs = StorageDirs::default();
        assert_eq!(dirs.images_dir(), None);
        assert_eq!(dirs.scratch_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_contains() {
        let dirs = StorageDirs::new(Some("/doc".into()), Some("/cache".into()));
        assert!(dirs.contains(Path::new("/doc/images/a.jpg")));
        assert!(dirs.contains(Path::new("/cache/tmp.jpg")));
        assert!(!dirs.contains(Path::new("/home/me/a.jpg")));
    }

    #[test]
    fn test_resolve_uses_settings_overrides() {
        let settings = Settings {
            data_dir: Some("/srv/casa".into()),
            cache_dir: Some("/tmp/casa".into()),
            ..Settings::default()
        };
        let dirs = StorageDirs::resolve(&settings);
        assert_eq!(dirs.document, Some(PathBuf::from("/srv/casa")));
        assert_eq!(dirs.cache, Some(PathBuf::from("/tmp/casa")));
    }
}
