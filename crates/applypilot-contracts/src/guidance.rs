//! Human-facing guidance and the status-surface contract.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the worker paused, finer-grained than the stage that triggered it.
///
/// Two vendors can both be `login_required` while asking the user for
/// different things (create an account vs sign in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ClickToApply,
    ClickToContinue,
    Login,
    Registration,
    EmailVerification,
    Unclassifiable,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intent::ClickToApply => "click_to_apply",
            Intent::ClickToContinue => "click_to_continue",
            Intent::Login => "login",
            Intent::Registration => "registration",
            Intent::EmailVerification => "email_verification",
            Intent::Unclassifiable => "unclassifiable",
        })
    }
}

/// Instruction shown to the user while the worker is paused.
///
/// Regenerated every pass; only the latest one is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guidance {
    pub title: String,
    pub what_happening: String,
    pub user_action: String,
    pub what_next: String,
    pub intent: Intent,
    pub task_id: String,
    pub job_id: String,
}

/// Visual register of the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    /// Autofill is running.
    Working,
    /// Waiting for the user to complete a step.
    Paused,
    /// Waiting for an explicit confirmation.
    Attention,
    /// The pipeline failed; the user continues manually.
    Fallback,
}

/// Everything the host renders on the page-level status surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusContent {
    pub title: String,
    pub progress: String,
    pub instruction: String,
    pub reassurance: String,
    pub what_next: String,
    pub task_id: String,
    pub job_id: String,
    pub tone: StatusTone,
}
