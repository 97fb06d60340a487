//! Viewer configuration.

use serde::{Deserialize, Serialize};

use crate::autoscroll::DEFAULT_SCROLL_THRESHOLD;
use crate::buffer::DEFAULT_CAPACITY;
use crate::error::ConfigError;

/// Configuration for one live log view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Maximum number of retained log entries.
    pub capacity: usize,

    /// Distance from the bottom under which the view keeps following.
    pub scroll_threshold: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
        }
    }
}

impl ViewerConfig {
    /// Reject values the buffer and controller would otherwise clamp.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !self.scroll_threshold.is_finite() || self.scroll_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.scroll_threshold));
        }
        Ok(())
    }
}
