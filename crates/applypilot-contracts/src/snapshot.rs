//! The persisted record of the most recent detection pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    action::WorkerAction,
    guidance::Guidance,
    platform::PlatformResult,
    session::TriggerCategory,
    stage::StageResult,
};

/// What the control surface and the debug accessor show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    pub task_id: String,
    pub url: String,
    pub platform: PlatformResult,
    pub stage: StageResult,
    pub action: WorkerAction,
    /// Present only when the pass paused.
    pub guidance: Option<Guidance>,
    /// Dedup signature of the pass.
    pub signature: String,
    pub trigger: TriggerCategory,
    pub recheck_count: u64,
    pub captured_at: DateTime<Utc>,
}
