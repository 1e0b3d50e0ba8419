//! Progress sampler configuration.
//!
//! Can be embedded in an application's TOML configuration:
//!
//! ```toml
//! interval_ms = 1000
//! window_capacity = 6
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_RATE_WINDOW, DEFAULT_SAMPLE_INTERVAL};

/// Errors produced while loading a [`SamplerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid sampler configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Sampler tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Tick period in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Number of recent deltas averaged into the rate estimate.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
}

fn default_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL.as_millis() as u64
}

fn default_window_capacity() -> usize {
    DEFAULT_RATE_WINDOW
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            window_capacity: default_window_capacity(),
        }
    }
}

impl SamplerConfig {
    /// Parses a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), ?config, "sampler configuration loaded");
        Ok(config)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    /// Tick period, never shorter than 1 ms.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Window capacity, never below 1.
    pub fn capacity(&self) -> usize {
        self.window_capacity.max(1)
    }
}
