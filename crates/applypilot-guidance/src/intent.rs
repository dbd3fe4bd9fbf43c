//! Why the worker paused.
//!
//! The stage says *that* the user is needed; the intent says *what for*.
//! Two `login_required` pages can ask for different things, so the stage
//! classifier's call-to-action evidence and the vendor's conventions refine
//! the stage into an `Intent`.

use applypilot_contracts::{
    evidence::{kinds, Evidence},
    guidance::Intent,
    platform::{PlatformKind, PlatformResult},
    stage::{Stage, StageResult},
};

/// Map a classification pass to the reason for pausing.
pub fn intent_for(platform: &PlatformResult, stage: &StageResult) -> Intent {
    let has = |kind: &str| stage.evidence.iter().any(|e: &Evidence| e.is(kind));

    match stage.stage {
        Stage::LoginRequired => {
            // Workday accounts are per employer: a first application there
            // always starts by creating one.
            let registration = has(kinds::REGISTRATION_CTA)
                && (!has(kinds::SIGN_IN_CTA) || platform.platform_kind == PlatformKind::Workday);
            if registration {
                Intent::Registration
            } else {
                Intent::Login
            }
        }
        Stage::VerificationRequired if has(kinds::VERIFICATION_TEXT) => Intent::EmailVerification,
        Stage::VerificationRequired => Intent::ClickToContinue,
        Stage::Landing => Intent::ClickToApply,
        Stage::FormFilling | Stage::ReadyToSubmit | Stage::Submitted => Intent::ClickToContinue,
        _ => Intent::Unclassifiable,
    }
}
