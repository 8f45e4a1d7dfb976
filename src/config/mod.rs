//! Configuration management for casa-inventory
//!
//! Settings live in a JSON file under the platform config directory and can be
//! overridden per-field from the environment.

pub mod settings;

pub use settings::{ImageSettings, Settings};
