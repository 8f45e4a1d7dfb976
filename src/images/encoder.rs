//! Resize + JPEG re-encode step of the ingestion pipeline

use anyhow::{Context, Result, bail};
use image::codecs::jpeg::JpegEncoder as JpegCodec;
use image::imageops::FilterType;
use image::{GenericImageView, ImageReader};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

pub trait ImageEncoder {
    /// Resize `source` to at most `max_width` pixels wide and encode it at
    /// `quality` (0.0..=1.0) into a new temporary file under `scratch_dir`
    fn encode(&self, source: &Path, max_width: u32, quality: f32, scratch_dir: &Path) -> Result<PathBuf>;
}

/// `image`-crate backed JPEG encoder. Never upscales.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn encode(&self, source: &Path, max_width: u32, quality: f32, scratch_dir: &Path) -> Result<PathBuf> {
        let decoded = ImageReader::open(source)
            .with_context(|| format!("Failed to open image {}", source.display()))?
            .with_guessed_format()
            .with_context(|| format!("Failed to detect image format {}", source.display()))?
            .decode()
            .with_context(|| format!("Failed to decode image {}", source.display()))?;

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            bail!("Invalid image dimensions {}x{} for {}", width, height, source.display());
        }

        let bounded_width = max_width.max(1);
        let resized = if width > bounded_width {
            let scale = bounded_width as f64 / width as f64;
            let target_height = ((height as f64) * scale).round().max(1.0) as u32;
            decoded.resize_exact(bounded_width, target_height, FilterType::Triangle)
        } else {
            decoded
        };

        fs::create_dir_all(scratch_dir)
            .with_context(|| format!("Failed to create scratch directory {}", scratch_dir.display()))?;
        let output = scratch_dir.join(format!("encode_{}.jpg", Uuid::new_v4().simple()));
        let file = File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        let mut writer = BufWriter::new(file);

        let jpeg_quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
        let rgb = resized.to_rgb8();
        JpegCodec::new_with_quality(&mut writer, jpeg_quality)
            .encode_image(&rgb)
            .with_context(|| format!("Failed to encode JPEG {}", output.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", output.display()))?;

        debug!(
            source = %source.display(),
            output = %output.display(),
            source_w = width,
            source_h = height,
            target_w = rgb.width(),
            target_h = rgb.height(),
            quality = jpeg_quality,
            "Encoded image"
        );
        Ok(output)
    }
}
