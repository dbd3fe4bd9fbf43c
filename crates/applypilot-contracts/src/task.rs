//! Apply tasks issued by the task-queue backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a claimed task: `queued → in_progress → {success, needs_user, canceled, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    InProgress,
    Success,
    NeedsUser,
    Canceled,
    Failed,
}

impl TaskStatus {
    /// True for the four exit states. Reaching one closes the apply session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::NeedsUser | TaskStatus::Canceled | TaskStatus::Failed
        )
    }

    /// Whether the status vocabulary allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match self {
            TaskStatus::Queued => next == TaskStatus::InProgress,
            TaskStatus::InProgress => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Success => "success",
            TaskStatus::NeedsUser => "needs_user",
            TaskStatus::Canceled => "canceled",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job application the worker has been asked to drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub job_id: String,
    /// The application page the worker opens when the task is claimed.
    pub destination_url: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
}
