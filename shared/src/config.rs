use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    DEFAULT_RECHECK_DELAY_MS, MAX_CONTENT_CHARS, MAX_IMAGES_PER_RECORD, MAX_IMAGE_BYTES,
    MAX_RECHECK_DELAY_MS, MIN_RECHECK_DELAY_MS,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} is {value}, above the maximum of {max}")]
    TooLarge {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Runtime knobs for the engine. The shell may replace these at any time with
/// `Event::ConfigUpdated`; an invalid config is rejected and the old one kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay between a submission and the challenge status re-check.
    /// Out-of-range values are clamped rather than rejected.
    pub recheck_delay_ms: u64,
    /// Overrides the per-kind banner duration when set.
    pub notification_duration_ms: Option<u64>,
    pub max_images: usize,
    pub max_image_bytes: u64,
    pub max_content_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recheck_delay_ms: DEFAULT_RECHECK_DELAY_MS,
            notification_duration_ms: None,
            max_images: MAX_IMAGES_PER_RECORD,
            max_image_bytes: MAX_IMAGE_BYTES,
            max_content_chars: MAX_CONTENT_CHARS,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_images == 0 {
            return Err(ConfigError::Zero {
                field: "max_images",
            });
        }
        if self.max_images > MAX_IMAGES_PER_RECORD {
            return Err(ConfigError::TooLarge {
                field: "max_images",
                value: self.max_images as u64,
                max: MAX_IMAGES_PER_RECORD as u64,
            });
        }
        if self.max_image_bytes == 0 {
            return Err(ConfigError::Zero {
                field: "max_image_bytes",
            });
        }
        if self.max_content_chars == 0 {
            return Err(ConfigError::Zero {
                field: "max_content_chars",
            });
        }
        if self.notification_duration_ms == Some(0) {
            return Err(ConfigError::Zero {
                field: "notification_duration_ms",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn effective_recheck_delay_ms(&self) -> u64 {
        self.recheck_delay_ms
            .clamp(MIN_RECHECK_DELAY_MS, MAX_RECHECK_DELAY_MS)
    }
}
