//! Engine timing configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration:
//!
//! ```toml
//! debounce_ms = 800
//! max_wait_ms = 4000
//! settle_delay_ms = 1200
//! resume_poll_ms = 2500
//! ```

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use applypilot_contracts::error::{PilotError, PilotResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Triggers closer together than this collapse into one recheck.
    pub debounce_ms: u64,
    /// Upper bound on how long a continuous trigger burst can postpone a recheck.
    pub max_wait_ms: u64,
    /// Delay after a full page load before the first pass, to let the page render.
    pub settle_delay_ms: u64,
    /// Interval of the resume monitor while the worker is paused.
    pub resume_poll_ms: u64,
    /// `source` field stamped on events emitted by the page controller.
    pub source: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 800,
            max_wait_ms: 4_000,
            settle_delay_ms: 1_200,
            resume_poll_ms: 2_500,
            source: "page_controller".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `PilotError::ConfigError` on malformed TOML or when the debounce
    /// window exceeds the maximum wait.
    pub fn from_toml_str(s: &str) -> PilotResult<Self> {
        let config: EngineConfig = toml::from_str(s).map_err(|e| PilotError::ConfigError {
            reason: format!("failed to parse engine TOML: {}", e),
        })?;
        if config.debounce_ms > config.max_wait_ms {
            return Err(PilotError::ConfigError {
                reason: format!(
                    "debounce_ms ({}) must not exceed max_wait_ms ({})",
                    config.debounce_ms, config.max_wait_ms
                ),
            });
        }
        Ok(config)
    }

    /// Read the file at `path` and parse it as engine configuration.
    pub fn from_file(path: &Path) -> PilotResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| PilotError::ConfigError {
            reason: format!("failed to read engine config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn debounce(&self) -> Duration {
        millis(self.debounce_ms)
    }

    pub fn max_wait(&self) -> Duration {
        millis(self.max_wait_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        millis(self.settle_delay_ms)
    }

    pub fn resume_poll(&self) -> Duration {
        millis(self.resume_poll_ms)
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX / 1_000_000))
}
