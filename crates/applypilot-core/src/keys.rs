//! Persisted local state keys and typed access helpers.

use serde::{de::DeserializeOwned, Serialize};

use applypilot_contracts::error::{PilotError, PilotResult};

use crate::traits::SessionStore;

/// The active apply session record.
pub const ACTIVE_SESSION: &str = "applypilot.active_session";
/// Task and job cached for the current page.
pub const PAGE_TASK: &str = "applypilot.page_task";
/// The most recent detection snapshot.
pub const DETECTION_SNAPSHOT: &str = "applypilot.detection_snapshot";
/// Versioned automation preferences.
pub const PREFERENCES: &str = "applypilot.preferences";

/// Closed session record for `task_id`.
pub fn session_record(task_id: &str) -> String {
    format!("applypilot.sessions.{task_id}")
}

/// Persisted telemetry queue for `run_id`.
pub fn telemetry_queue(run_id: &str) -> String {
    format!("applypilot.telemetry_queue.{run_id}")
}

/// Read and deserialize `key`. A value that no longer parses is reported as
/// `StoreFailed` rather than silently dropped.
pub fn load<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> PilotResult<Option<T>> {
    match store.get(key)? {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| PilotError::StoreFailed {
                reason: format!("stored value under '{}' is malformed: {}", key, e),
            }),
    }
}

/// Serialize `value` and write it under `key`.
pub fn save<T: Serialize>(store: &dyn SessionStore, key: &str, value: &T) -> PilotResult<()> {
    let value = serde_json::to_value(value).map_err(|e| PilotError::StoreFailed {
        reason: format!("value for '{}' is not serializable: {}", key, e),
    })?;
    store.put(key, value)
}
