//! Telemetry pipeline configuration.
//!
//! ```toml
//! queue_cap = 200
//! batch_size = 50
//! persist_queue = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use applypilot_contracts::error::{PilotError, PilotResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Maximum queued events; the oldest are dropped beyond this.
    pub queue_cap: usize,
    /// Maximum events sent per `flush`.
    pub batch_size: usize,
    /// Mirror the queue into the session store so a reload does not lose it.
    pub persist_queue: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            queue_cap: 200,
            batch_size: 50,
            persist_queue: true,
        }
    }
}

impl TelemetryConfig {
    /// Parse `s` as TOML.
    ///
    /// Zero-sized queues and batches are rejected, as is a batch larger than
    /// the queue.
    pub fn from_toml_str(s: &str) -> PilotResult<Self> {
        let config: TelemetryConfig = toml::from_str(s).map_err(|e| PilotError::ConfigError {
            reason: format!("failed to parse telemetry TOML: {}", e),
        })?;
        if config.queue_cap == 0 || config.batch_size == 0 {
            return Err(PilotError::ConfigError {
                reason: "queue_cap and batch_size must be positive".to_string(),
            });
        }
        if config.batch_size > config.queue_cap {
            return Err(PilotError::ConfigError {
                reason: format!(
                    "batch_size ({}) must not exceed queue_cap ({})",
                    config.batch_size, config.queue_cap
                ),
            });
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> PilotResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| PilotError::ConfigError {
            reason: format!("failed to read telemetry config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }
}
