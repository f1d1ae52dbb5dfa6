//! Map configuration, loaded from TOML.
//!
//! Every section and field is optional; anything left out takes its default.
//!
//! ```toml
//! [layout]
//! iterations = 120
//! min_separation = 0.08
//!
//! [limits]
//! max_tags = 4
//!
//! [surface]
//! width = 800.0
//! height = 560.0
//!
//! [storage]
//! key = "campaign_one"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::layout::LayoutConfig;
use crate::persist::DEFAULT_STORAGE_KEY;
use crate::render::Surface;
use world_graph::SanitizeLimits;

/// Upper bound on relaxation rounds. A pass runs synchronously on the
/// caller's thread and must stay short.
pub const MAX_LAYOUT_ITERATIONS: u32 = 1000;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the world is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Top-level map configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub layout: LayoutConfig,
    pub limits: SanitizeLimits,
    pub surface: Surface,
    pub storage: StorageConfig,
}

impl MapConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: MapConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values that would stall or scramble the layout pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        if layout.iterations > MAX_LAYOUT_ITERATIONS {
            return Err(ConfigError::Invalid(format!(
                "layout.iterations must be at most {MAX_LAYOUT_ITERATIONS}, got {}",
                layout.iterations
            )));
        }
        for (name, value) in [
            ("layout.spring_step", layout.spring_step),
            ("layout.repulsion", layout.repulsion),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }
        for (name, value) in [
            ("layout.unit_distance", layout.unit_distance),
            ("layout.min_separation", layout.min_separation),
            ("layout.seed_jitter", layout.seed_jitter),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(self.surface.width > 0.0 && self.surface.height > 0.0) {
            return Err(ConfigError::Invalid(
                "surface width and height must be positive".to_string(),
            ));
        }
        if self.storage.key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.key must not be empty".to_string()));
        }
        Ok(())
    }
}
