//! Automation preferences: persistent global settings plus session overrides.

use serde::{Deserialize, Serialize};

/// Settings that survive across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPreferences {
    /// Run autofill when the worker is cleared to continue.
    pub autofill_enabled: bool,
    /// Emit observability events at all.
    pub telemetry_enabled: bool,
}

impl Default for GlobalPreferences {
    fn default() -> Self {
        Self {
            autofill_enabled: true,
            telemetry_enabled: true,
        }
    }
}

/// Overrides scoped to one apply session.
///
/// Force-cleared whenever the owning session closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOverrides {
    /// The task whose session owns these overrides.
    pub task_id: String,
    #[serde(default)]
    pub autofill_enabled: Option<bool>,
}

/// The versioned preferences record kept in the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationPreferences {
    pub version: u32,
    pub global: GlobalPreferences,
    #[serde(default)]
    pub session: Option<SessionOverrides>,
}

impl AutomationPreferences {
    /// The record layout this build reads and writes.
    pub const CURRENT_VERSION: u32 = 2;

    /// Whether autofill may run for `task_id`.
    ///
    /// A session override only applies to the task that owns it.
    pub fn autofill_enabled_for(&self, task_id: &str) -> bool {
        self.session
            .as_ref()
            .filter(|s| s.task_id == task_id)
            .and_then(|s| s.autofill_enabled)
            .unwrap_or(self.global.autofill_enabled)
    }

    /// Drop session overrides. Returns true if any were present.
    pub fn clear_session_overrides(&mut self) -> bool {
        self.session.take().is_some()
    }
}

impl Default for AutomationPreferences {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            global: GlobalPreferences::default(),
            session: None,
        }
    }
}
