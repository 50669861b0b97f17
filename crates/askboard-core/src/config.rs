//! Board configuration, read from JSON. Every field has a default.

use crate::auto_frame::{AutoFrameEngine, DEFAULT_FRAME_MARGIN};
use crate::prompt::PromptConfig;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid frame margin {0}: must be a finite, non-negative number")]
    Margin(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Padding between handwriting and its frame.
    pub margin: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_FRAME_MARGIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl ViewportConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Top-level board settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub prompt: PromptConfig,
    pub frame: FrameConfig,
    pub viewport: ViewportConfig,
}

impl BoardConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// A negative margin would turn the frame box inside out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let margin = self.frame.margin;
        if !margin.is_finite() || margin < 0.0 {
            return Err(ConfigError::Margin(margin));
        }
        Ok(())
    }

    /// Read a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn auto_frame_engine(&self) -> AutoFrameEngine {
        AutoFrameEngine::new(self.frame.margin)
    }
}
