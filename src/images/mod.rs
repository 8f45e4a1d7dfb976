//! Image Pipeline
//!
//! Turns a picked photo into a compressed, size-bounded, durably stored file.
//! Each quality step is encoded to a temporary file and then persisted with a
//! move -> copy -> fetch-write fallback chain. A step whose persistence fails
//! entirely is skipped; the loop itself is bounded by the quality floor.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ImageSettings;
use crate::constants::image::{
    DEFAULT_MAX_WIDTH, DEFAULT_TARGET_SIZE_KB, EXTENSION, INGESTED_PREFIX, MIN_QUALITY,
    QUALITY_STEP, START_QUALITY,
};
use crate::error::IngestError;
use crate::platform::{FileOps, StorageDirs};

mod encoder;

pub use encoder::{ImageEncoder, JpegEncoder};

/// Budget for one ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub max_width: u32,
    pub target_size_kb: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            target_size_kb: DEFAULT_TARGET_SIZE_KB,
        }
    }
}

impl From<&ImageSettings> for IngestOptions {
    fn from(settings: &ImageSettings) -> Self {
        Self {
            max_width: settings.max_width,
            target_size_kb: settings.target_size_kb,
        }
    }
}

/// Diagnostic view of a stored image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub exists: bool,
    pub size_kb: Option<u64>,
    /// Lives under the document or cache directory
    pub persisted: bool,
}

/// JPEG qualities tried in order: 0.9, 0.75, 0.6, 0.45
pub fn quality_steps() -> impl Iterator<Item = f32> {
    (0u16..)
        .map(|step| START_QUALITY - QUALITY_STEP * f32::from(step))
        .take_while(|quality| *quality >= MIN_QUALITY - 1e-4)
}

/// `<prefix><millis>_<uuid>.jpg`
pub fn unique_image_name(prefix: &str) -> String {
    format!(
        "{prefix}{}_{}.{EXTENSION}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

pub struct ImagePipeline<F, E> {
    files: F,
    encoder: E,
    dirs: StorageDirs,
}

impl<F: FileOps, E: ImageEncoder> ImagePipeline<F, E> {
    pub fn new(files: F, encoder: E, dirs: StorageDirs) -> Self {
        Self { files, encoder, dirs }
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    pub fn dirs(&self) -> &StorageDirs {
        &self.dirs
    }

    /// Compress `source` to the size budget and store it durably.
    ///
    /// Returns, in order of preference: the first persisted file within budget,
    /// the last persisted file once the quality floor is reached, the last
    /// temporary encode when nothing could be persisted, or a verbatim copy of
    /// the source when no encode ever succeeded. Fails only when none of these
    /// produced a file.
    pub fn ingest(&self, source: &Path, options: &IngestOptions) -> Result<PathBuf, IngestError> {
        if !self.files.exists(source) {
            return Err(IngestError::MissingSource(source.to_path_buf()));
        }

        let images_dir = self.dirs.images_dir();
        match &images_dir {
            Some(dir) => {
                if let Err(e) = self.files.create_dir_all(dir) {
                    warn!(dir = %dir.display(), error = ?e, "Could not create images directory, continuing");
                }
            }
            None => warn!("No durable directory available, image will be kept in a temporary file"),
        }

        let scratch = self.dirs.scratch_dir();
        let target_bytes = options.target_size_kb.saturating_mul(1024);
        let mut persisted: Option<PathBuf> = None;
        let mut temporary: Option<PathBuf> = None;
        let mut last_error: Option<anyhow::Error> = None;

        for quality in quality_steps() {
            let encoded = match self.encoder.encode(source, options.max_width, quality, &scratch) {
                Ok(path) => path,
                Err(e) => {
                    warn!(quality, error = ?e, "Encode failed, trying next quality");
                    last_error = Some(e);
                    continue;
                }
            };

            let candidate = match &images_dir {
                Some(dir) => {
                    let final_path = dir.join(unique_image_name(INGESTED_PREFIX));
                    match self.persist(&encoded, &final_path) {
                        Ok(()) => {
                            if let Some(previous) = persisted.replace(final_path.clone()) {
                                self.discard(&previous);
                            }
                            final_path
                        }
                        Err(e) => {
                            warn!(quality, error = ?e, "Could not persist encoded image, trying next quality");
                            last_error = Some(e);
                            if let Some(previous) = temporary.replace(encoded) {
                                self.discard(&previous);
                            }
                            continue;
                        }
                    }
                }
                None => {
                    if let Some(previous) = temporary.replace(encoded.clone()) {
                        self.discard(&previous);
                    }
                    encoded
                }
            };

            match self.files.size(&candidate) {
                Ok(bytes) if bytes <= target_bytes => {
                    info!(path = %candidate.display(), quality, bytes, "Image ingested within budget");
                    self.discard_fallback(&temporary, &candidate);
                    return Ok(candidate);
                }
                Ok(bytes) => debug!(quality, bytes, target_bytes, "Encoded image over budget"),
                Err(e) if self.files.exists(&candidate) => {
                    warn!(path = %candidate.display(), error = ?e, "Could not read image size, accepting it");
                    self.discard_fallback(&temporary, &candidate);
                    return Ok(candidate);
                }
                Err(e) => {
                    warn!(path = %candidate.display(), error = ?e, "Encoded image vanished");
                    last_error = Some(e);
                }
            }
        }

        if let Some(best) = persisted {
            info!(path = %best.display(), "Quality floor reached, keeping smallest persisted image");
            self.discard_fallback(&temporary, &best);
            return Ok(best);
        }

        if let Some(best) = temporary.filter(|path| self.files.exists(path)) {
            warn!(path = %best.display(), "Keeping non-durable temporary image");
            return Ok(best);
        }

        if let Some(dir) = &images_dir {
            let final_path = dir.join(unique_image_name(INGESTED_PREFIX));
            match self.files.fetch_write(source, &final_path) {
                Ok(()) => {
                    warn!(path = %final_path.display(), "No encode succeeded, stored original bytes");
                    return Ok(final_path);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(IngestError::Exhausted {
            source_path: source.to_path_buf(),
            last_error,
        })
    }

    /// Move, else copy, else fetch-write `encoded` to `final_path`
    fn persist(&self, encoded: &Path, final_path: &Path) -> Result<()> {
        let move_err = match self.files.move_file(encoded, final_path) {
            Ok(()) => {
                debug!(path = %final_path.display(), "Persisted image by move");
                return Ok(());
            }
            Err(e) => e,
        };

        let copy_err = match self.files.copy_file(encoded, final_path) {
            Ok(()) => {
                debug!(path = %final_path.display(), move_error = ?move_err, "Persisted image by copy");
                self.discard(encoded);
                return Ok(());
            }
            Err(e) => e,
        };

        match self.files.fetch_write(encoded, final_path) {
            Ok(()) => {
                debug!(path = %final_path.display(), copy_error = ?copy_err, "Persisted image by fetch-write");
                self.discard(encoded);
                Ok(())
            }
            Err(e) => Err(e.context(format!(
                "move, copy and fetch-write to {} all failed",
                final_path.display()
            ))),
        }
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = self.files.remove_file(path) {
            debug!(path = %path.display(), error = ?e, "Could not remove intermediate image");
        }
    }

    fn discard_fallback(&self, temporary: &Option<PathBuf>, keep: &Path) {
        if let Some(temp) = temporary
            && temp != keep
        {
            self.discard(temp);
        }
    }

    /// Delete a stored image. Deleting an absent file counts as success.
    pub fn delete_stored(&self, path: &Path) -> bool {
        match self.files.remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "Deleted stored image");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = ?e, "Could not delete local file");
                false
            }
        }
    }

    /// Write raw image bytes under a fresh name in the images directory
    pub fn store_bytes(&self, bytes: &[u8], prefix: &str) -> Result<PathBuf> {
        let dir = self
            .dirs
            .images_dir()
            .ok_or_else(|| anyhow!("No durable directory available for images"))?;
        self.files.create_dir_all(&dir)?;
        let path = dir.join(unique_image_name(prefix));
        self.files
            .write(&path, bytes)
            .with_context(|| format!("Failed to store image {}", path.display()))?;
        Ok(path)
    }

    pub fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        self.files.read(path)
    }

    pub fn inspect(&self, path: &Path) -> ImageInfo {
        let exists = self.files.exists(path);
        let size_kb = if exists {
            self.files.size(path).ok().map(|bytes| (bytes + 512) / 1024)
        } else {
            None
        };
        ImageInfo {
            path: path.to_path_buf(),
            exists,
            size_kb,
            persisted: self.dirs.contains(path),
        }
    }

    /// Remove the whole images directory
    pub fn purge(&self) -> Result<()> {
        if let Some(dir) = self.dirs.images_dir() {
            self.files.remove_dir_all(&dir)?;
            info!(dir = %dir.display(), "Removed images directory");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::LocalFiles;
    use anyhow::bail;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use tempfile::TempDir;

    /// Writes files of scripted sizes instead of real JPEGs
    struct FakeEncoder {
        out_dir: PathBuf,
        sizes: Vec<usize>,
        fail: bool,
        qualities: RefCell<Vec<f32>>,
    }

    impl FakeEncoder {
        fn new(out_dir: &Path, sizes_kb: &[usize]) -> Self {
            Self {
                out_dir: out_dir.to_path_buf(),
                sizes: sizes_kb.iter().map(|kb| kb * 1024).collect(),
                fail: false,
                qualities: RefCell::new(Vec::new()),
            }
        }

        fn failing(out_dir: &Path) -> Self {
            Self { fail: true, ..Self::new(out_dir, &[]) }
        }
    }

    impl ImageEncoder for FakeEncoder {
        fn encode(&self, _source: &Path, _max_width: u32, quality: f32, _scratch: &Path) -> Result<PathBuf> {
            let call = self.qualities.borrow().len();
            self.qualities.borrow_mut().push(quality);
            if self.fail {
                bail!("decoder exploded");
            }
            let size = self.sizes.get(call).or(self.sizes.last()).copied().unwrap_or(1024);
            let path = self.out_dir.join(format!("tmp_{call}.jpg"));
            fs::write(&path, vec![0u8; size]).unwrap();
            Ok(path)
        }
    }

    /// Local files where the first `persist_failures` persistence attempts fail
    #[derive(Default)]
    struct FlakyFiles {
        fail_move: bool,
        fail_copy: bool,
        persist_failures: Cell<usize>,
        fail_fetch: bool,
    }

    impl FileOps for FlakyFiles {
        fn exists(&self, path: &Path) -> bool {
            LocalFiles.exists(path)
        }
        fn size(&self, path: &Path) -> Result<u64> {
            LocalFiles.size(path)
        }
        fn create_dir_all(&self, path: &Path) -> Result<()> {
            LocalFiles.create_dir_all(path)
        }
        fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
            if self.fail_move || self.persist_failures.get() > 0 {
                bail!("move refused");
            }
            LocalFiles.move_file(from, to)
        }
        fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
            if self.fail_copy || self.persist_failures.get() > 0 {
                bail!("copy refused");
            }
            LocalFiles.copy_file(from, to)
        }
        fn fetch_write(&self, from: &Path, to: &Path) -> Result<()> {
            let remaining = self.persist_failures.get();
            if remaining > 0 {
                self.persist_failures.set(remaining - 1);
                bail!("fetch refused");
            }
            if self.fail_fetch {
                bail!("fetch refused");
            }
            LocalFiles.fetch_write(from, to)
        }
        fn read(&self, path: &Path) -> Result<Vec<u8>> {
            LocalFiles.read(path)
        }
        fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
            LocalFiles.write(path, bytes)
        }
        fn remove_file(&self, path: &Path) -> Result<()> {
            LocalFiles.remove_file(path)
        }
        fn remove_dir_all(&self, path: &Path) -> Result<()> {
            LocalFiles.remove_dir_all(path)
        }
    }

    struct Fixture {
        root: TempDir,
        source: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let source = root.path().join("picked.png");
            fs::write(&source, b"original bytes").unwrap();
            fs::create_dir(root.path().join("enc")).unwrap();
            Self { root, source }
        }

        fn dirs(&self) -> StorageDirs {
            StorageDirs::new(Some(self.root.path().join("doc")), Some(self.root.path().join("cache")))
        }

        fn enc_dir(&self) -> PathBuf {
            self.root.path().join("enc")
        }

        fn images_dir(&self) -> PathBuf {
            self.root.path().join("doc").join("images")
        }

        fn stored_images(&self) -> Vec<PathBuf> {
            match fs::read_dir(self.images_dir()) {
                Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
                Err(_) => Vec::new(),
            }
        }
    }

    #[test]
    fn test_quality_steps() {
        let steps: Vec<f32> = quality_steps().collect();
        assert_eq!(steps.len(), 4);
        assert!((steps[0] - 0.9).abs() < 1e-6);
        assert!((steps[3] - 0.45).abs() < 1e-6);
        assert!(steps.iter().all(|q| *q >= MIN_QUALITY));
    }

    #[test]
    fn test_first_quality_within_budget() {
        let fx = Fixture::new();
        let encoder = FakeEncoder::new(&fx.enc_dir(), &[100]);
        let pipeline = ImagePipeline::new(LocalFiles, encoder, fx.dirs());

        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();
        assert!(stored.starts_with(fx.images_dir()));
        assert!(stored.exists());
        assert_eq!(pipeline.encoder.qualities.borrow().len(), 1);
        assert!(!fx.enc_dir().join("tmp_0.jpg").exists());
    }

    #[test]
    fn test_steps_down_until_budget_met() {
        let fx = Fixture::new();
        let encoder = FakeEncoder::new(&fx.enc_dir(), &[400, 300, 200]);
        let pipeline = ImagePipeline::new(LocalFiles, encoder, fx.dirs());

        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();
        assert_eq!(fs::metadata(&stored).unwrap().len(), 200 * 1024);
        assert_eq!(pipeline.encoder.qualities.borrow().len(), 3);
        // Superseded attempts are cleaned up
        assert_eq!(fx.stored_images(), vec![stored]);
    }

    #[test]
    fn test_quality_floor_returns_last_persisted() {
        let fx = Fixture::new();
        let encoder = FakeEncoder::new(&fx.enc_dir(), &[900, 800, 700, 600]);
        let pipeline = ImagePipeline::new(LocalFiles, encoder, fx.dirs());

        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();
        assert!(stored.exists());
        assert_eq!(fs::metadata(&stored).unwrap().len(), 600 * 1024);
        assert_eq!(pipeline.encoder.qualities.borrow().len(), 4);
        assert_eq!(fx.stored_images().len(), 1);
    }

    #[test]
    fn test_copy_used_when_move_fails() {
        let fx = Fixture::new();
        let files = FlakyFiles { fail_move: true, ..FlakyFiles::default() };
        let pipeline = ImagePipeline::new(files, FakeEncoder::new(&fx.enc_dir(), &[10]), fx.dirs());

        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();
        assert!(stored.starts_with(fx.images_dir()));
        assert!(!fx.enc_dir().join("tmp_0.jpg").exists());
    }

    #[test]
    fn test_fetch_write_used_when_move_and_copy_fail() {
        let fx = Fixture::new();
        let files = FlakyFiles { fail_move: true, fail_copy: true, ..FlakyFiles::default() };
        let pipeline = ImagePipeline::new(files, FakeEncoder::new(&fx.enc_dir(), &[10]), fx.dirs());

        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();
        assert!(stored.starts_with(fx.images_dir()));
        assert_eq!(fs::metadata(&stored).unwrap().len(), 10 * 1024);
    }

    #[test]
    fn test_failed_step_continues_at_next_quality() {
        let fx = Fixture::new();
        let files = FlakyFiles { persist_failures: Cell::new(1), ..FlakyFiles::default() };
        let pipeline = ImagePipeline::new(files, FakeEncoder::new(&fx.enc_dir(), &[10, 20]), fx.dirs());

        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();
        assert_eq!(pipeline.encoder.qualities.borrow().len(), 2);
        assert_eq!(fs::metadata(&stored).unwrap().len(), 20 * 1024);
        // The first attempt's temporary file is not left behind
        assert!(!fx.enc_dir().join("tmp_0.jpg").exists());
    }

    #[test]
    fn test_unpersistable_falls_back_to_temporary() {
        let fx = Fixture::new();
        let files = FlakyFiles { fail_move: true, fail_copy: true, fail_fetch: true, ..FlakyFiles::default() };
        let pipeline = ImagePipeline::new(files, FakeEncoder::new(&fx.enc_dir(), &[500]), fx.dirs());

        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();
        assert!(stored.exists());
        assert!(stored.starts_with(fx.enc_dir()));
        assert_eq!(pipeline.encoder.qualities.borrow().len(), 4);
    }

    #[test]
    fn test_no_durable_directory_returns_temporary() {
        let fx = Fixture::new();
        let pipeline = ImagePipeline::new(LocalFiles, FakeEncoder::new(&fx.enc_dir(), &[50]), StorageDirs::default());

        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();
        assert_eq!(stored, fx.enc_dir().join("tmp_0.jpg"));
        assert!(stored.exists());
    }

    #[test]
    fn test_encoder_failure_stores_original_bytes() {
        let fx = Fixture::new();
        let pipeline = ImagePipeline::new(LocalFiles, FakeEncoder::failing(&fx.enc_dir()), fx.dirs());

        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();
        assert!(stored.starts_with(fx.images_dir()));
        assert_eq!(fs::read(&stored).unwrap(), b"original bytes");
    }

    #[test]
    fn test_terminal_failure() {
        let fx = Fixture::new();
        let files = FlakyFiles { fail_fetch: true, ..FlakyFiles::default() };
        let pipeline = ImagePipeline::new(files, FakeEncoder::failing(&fx.enc_dir()), fx.dirs());

        let err = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::Exhausted { last_error: Some(_), .. }));
        assert!(fx.stored_images().is_empty());
    }

    #[test]
    fn test_missing_source() {
        let fx = Fixture::new();
        let pipeline = ImagePipeline::new(LocalFiles, FakeEncoder::new(&fx.enc_dir(), &[1]), fx.dirs());
        let err = pipeline.ingest(&fx.root.path().join("gone.png"), &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::MissingSource(_)));
    }

    #[test]
    fn test_real_encoder_meets_budget() {
        let fx = Fixture::new();
        let source = fx.root.path().join("photo.png");
        image::RgbImage::from_fn(1600, 900, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
            .save(&source)
            .unwrap();
        let pipeline = ImagePipeline::new(LocalFiles, JpegEncoder, fx.dirs());

        let stored = pipeline.ingest(&source, &IngestOptions::default()).unwrap();
        assert!(fs::metadata(&stored).unwrap().len() <= 250 * 1024);
        assert_eq!(image::image_dimensions(&stored).unwrap().0, 1280);
    }

    #[test]
    fn test_delete_stored_is_idempotent() {
        let fx = Fixture::new();
        let pipeline = ImagePipeline::new(LocalFiles, FakeEncoder::new(&fx.enc_dir(), &[1]), fx.dirs());
        let stored = pipeline.ingest(&fx.source, &IngestOptions::default()).unwrap();

        assert!(pipeline.delete_stored(&stored));
        assert!(!stored.exists());
        assert!(pipeline.delete_stored(&stored));
    }

    #[test]
    fn test_store_bytes_and_inspect() {
        let fx = Fixture::new();
        let pipeline = ImagePipeline::new(LocalFiles, FakeEncoder::new(&fx.enc_dir(), &[1]), fx.dirs());

        let a = pipeline.store_bytes(&[7u8; 2048], "img_imported_").unwrap();
        let b = pipeline.store_bytes(&[7u8; 2048], "img_imported_").unwrap();
        assert_ne!(a, b);

        let info = pipeline.inspect(&a);
        assert!(info.exists);
        assert!(info.persisted);
        assert_eq!(info.size_kb, Some(2));

        let outside = pipeline.inspect(&fx.source);
        assert!(outside.exists);
        assert!(!outside.persisted);

        pipeline.purge().unwrap();
        assert!(!pipeline.inspect(&a).exists);
    }

    #[test]
    fn test_store_bytes_without_durable_dir_fails() {
        let fx = Fixture::new();
        let pipeline = ImagePipeline::new(LocalFiles, FakeEncoder::new(&fx.enc_dir(), &[1]), StorageDirs::default());
        assert!(pipeline.store_bytes(b"x", "img_").is_err());
    }
}
