//! Application settings
//!
//! JSON structure stored at `<config_dir>/casa-inventory/config.json`.
//! Missing keys fall back to defaults; environment variables override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::{image, validation};

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Overrides the durable document directory (defaults to the platform data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Overrides the cache directory (defaults to the platform cache dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(default)]
    pub image: ImageSettings,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Ingestion budget for newly added photos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSettings {
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_target_size_kb")]
    pub target_size_kb: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_width() -> u32 {
    image::DEFAULT_MAX_WIDTH
}

fn default_target_size_kb() -> u64 {
    image::DEFAULT_TARGET_SIZE_KB
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            target_size_kb: default_target_size_kb(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            cache_dir: None,
            image: ImageSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load settings from the default location, creating the file on first run
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            let settings: Settings = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
            info!(path = %path.display(), "Loaded settings");
            settings
        } else {
            info!(path = %path.display(), "Settings file not found, creating default");
            let settings = Settings::default();
            if let Err(e) = settings.save_to(path) {
                warn!(error = ?e, "Failed to write default settings");
            }
            settings
        };

        settings.apply_env_overrides();
        settings.validate_and_clamp();
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("CASA_DATA_DIR")
            && !dir.trim().is_empty()
        {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = env::var("CASA_CACHE_DIR")
            && !dir.trim().is_empty()
        {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
    }

    /// Clamp values to safe ranges
    fn validate_and_clamp(&mut self) {
        use validation::*;

        if self.image.max_width < MIN_MAX_WIDTH {
            warn!(max_width = self.image.max_width, min = MIN_MAX_WIDTH, "image.max_width below minimum, clamping");
            self.image.max_width = MIN_MAX_WIDTH;
        } else if self.image.max_width > MAX_MAX_WIDTH {
            warn!(max_width = self.image.max_width, max = MAX_MAX_WIDTH, "image.max_width exceeds maximum, clamping");
            self.image.max_width = MAX_MAX_WIDTH;
        }

        if self.image.target_size_kb < MIN_TARGET_SIZE_KB {
            warn!(target_size_kb = self.image.target_size_kb, min = MIN_TARGET_SIZE_KB, "image.target_size_kb below minimum, clamping");
            self.image.target_size_kb = MIN_TARGET_SIZE_KB;
        } else if self.image.target_size_kb > MAX_TARGET_SIZE_KB {
            warn!(target_size_kb = self.image.target_size_kb, max = MAX_TARGET_SIZE_KB, "image.target_size_kb exceeds maximum, clamping");
            self.image.target_size_kb = MAX_TARGET_SIZE_KB;
        }

        if !matches!(self.log_level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            warn!(log_level = %self.log_level, "Unknown log_level, using info");
            self.log_level = default_log_level();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_use_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.image.max_width, 1280);
        assert_eq!(settings.image.target_size_kb, 250);
    }

    #[test]
    fn test_partial_image_section() {
        let settings: Settings = serde_json::from_str(r#"{"image": {"max_width": 800}}"#).unwrap();
        assert_eq!(settings.image.max_width, 800);
        assert_eq!(settings.image.target_size_kb, 250);
    }

    #[test]
    fn test_validate_and_clamp() {
        let mut settings = Settings {
            image: ImageSettings { max_width: 10, target_size_kb: 1_000_000 },
            log_level: "verbose".to_string(),
            ..Settings::default()
        };
        settings.validate_and_clamp();
        assert_eq!(settings.image.max_width, validation::MIN_MAX_WIDTH);
        assert_eq!(settings.image.target_size_kb, validation::MAX_TARGET_SIZE_KB);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let settings = Settings::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(settings.image, ImageSettings::default());
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Settings::load_from(&path).is_err());
        // The broken file is left in place for the user to fix
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_save_roundtrip_skips_unset_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        Settings::default().save_to(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("data_dir"));
        let loaded: Settings = serde_json::from_str(&contents).unwrap();
        assert_eq!(loaded, Settings::default());
    }
}
