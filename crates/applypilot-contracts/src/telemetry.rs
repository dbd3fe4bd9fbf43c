//! Observability events and runs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::TaskStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A structured event correlated to a run.
///
/// Redacted in place before it is queued; the raw form never leaves the
/// enqueue call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityEvent {
    /// Which component emitted the event (e.g. "page_controller", "background").
    pub source: String,
    pub severity: Severity,
    pub event_name: String,
    pub url: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl ObservabilityEvent {
    /// Build an event. The timestamp is re-stamped when it is enqueued.
    pub fn new(
        source: impl Into<String>,
        severity: Severity,
        event_name: impl Into<String>,
        url: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            source: source.into(),
            severity,
            event_name: event_name.into(),
            url: url.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    NeedsUser,
    Canceled,
    Failed,
    /// The user abandoned the session without a task outcome.
    Abandoned,
}

impl RunStatus {
    /// Map a task exit state to the run status; non-terminal states abandon.
    pub fn from_task_status(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Success => RunStatus::Success,
            TaskStatus::NeedsUser => RunStatus::NeedsUser,
            TaskStatus::Canceled => RunStatus::Canceled,
            TaskStatus::Failed => RunStatus::Failed,
            TaskStatus::Queued | TaskStatus::InProgress => RunStatus::Abandoned,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Success => "success",
            RunStatus::NeedsUser => "needs_user",
            RunStatus::Canceled => "canceled",
            RunStatus::Failed => "failed",
            RunStatus::Abandoned => "abandoned",
        })
    }
}

/// The telemetry-correlation unit, one per apply session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub task_id: String,
    pub job_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<RunStatus>,
    #[serde(default)]
    pub end_reason: Option<String>,
}

impl Run {
    /// Begin a run with a fresh v4 id.
    pub fn begin(task_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            job_id: job_id.into(),
            started_at: Utc::now(),
            ended_at: None,
            status: None,
            end_reason: None,
        }
    }
}
