//! Worker actions derived from a classification pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;

/// What the automated worker is allowed to do on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Autofill may run.
    Continue,
    /// Control goes back to the human.
    PauseNeedsUser,
    /// Nothing to do; waiting on explicit human confirmation.
    Noop,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Continue => "continue",
            ActionKind::PauseNeedsUser => "pause_needs_user",
            ActionKind::Noop => "noop",
        })
    }
}

/// The decision for one `(task, platform, stage)` triple.
///
/// Never stored as the source of truth; always recomputable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerAction {
    pub action: ActionKind,
    pub reason: String,
    pub evidence: Vec<Evidence>,
}
