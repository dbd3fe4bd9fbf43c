//! Application-funnel stage classification results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{evidence::Evidence, platform::Confidence};

/// Which step of the application funnel the page represents.
///
/// Marked `non_exhaustive` so every consumer outside this crate carries a
/// default arm; the worker-action state machine maps that arm to a pause.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Landing,
    LoginRequired,
    VerificationRequired,
    FormFilling,
    ReadyToSubmit,
    Submitted,
    Blocked,
    Unknown,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Landing,
        Stage::LoginRequired,
        Stage::VerificationRequired,
        Stage::FormFilling,
        Stage::ReadyToSubmit,
        Stage::Submitted,
        Stage::Blocked,
        Stage::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Landing => "landing",
            Stage::LoginRequired => "login_required",
            Stage::VerificationRequired => "verification_required",
            Stage::FormFilling => "form_filling",
            Stage::ReadyToSubmit => "ready_to_submit",
            Stage::Submitted => "submitted",
            Stage::Blocked => "blocked",
            Stage::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The output of one stage classification pass.
///
/// Always accompanies exactly one `PlatformResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub confidence: Confidence,
    pub evidence: Vec<Evidence>,
}
