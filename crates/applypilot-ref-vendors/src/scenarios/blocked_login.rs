//! Scenario 1: Blocked login
//!
//! A Workday anti-bot interstitial that still renders the password form
//! behind it. The blocked gate runs before the login gate, so the worker
//! reports the block instead of asking the user to sign in, and pauses.

use applypilot_contracts::{
    action::ActionKind,
    error::PilotResult,
    guidance::{Intent, StatusContent},
    platform::PlatformKind,
    stage::Stage,
};
use applypilot_core::RecheckOutcome;

use crate::{
    fixtures::{queued_task, workday_blocked, WORKDAY_APPLY_URL},
    harness::VendorRig,
};

use super::{describe, next_pass, print_content, start_time};

#[derive(Debug)]
pub struct BlockedLoginReport {
    pub outcome: RecheckOutcome,
    pub intent: Option<Intent>,
    pub content: Option<StatusContent>,
}

pub fn walk() -> PilotResult<BlockedLoginReport> {
    let t0 = start_time();
    let rig = VendorRig::new(vec![queued_task(
        "task-201",
        WORKDAY_APPLY_URL,
        "Acme",
        "Backend Engineer",
    )])?;
    rig.claim(t0)?;

    let mut page = rig.open_page(workday_blocked());
    page.controller.attach(t0)?;
    let outcome = next_pass(&mut page)?;

    let intent = page
        .controller
        .debug_snapshot()
        .and_then(|s| s.guidance.as_ref())
        .map(|g| g.intent);
    Ok(BlockedLoginReport {
        outcome,
        intent,
        content: page.surface.current(),
    })
}

/// Run Scenario 1: Blocked login.
pub fn run_scenario() -> PilotResult<()> {
    println!("=== Scenario 1: Blocked login ===");
    println!();
    println!("  Page: Workday sign-in form behind an 'unusual traffic' block");
    println!();

    let report = walk()?;
    println!("  Pass:   {}", describe(&report.outcome));
    if let Some(intent) = report.intent {
        println!("  Intent: {}", intent);
    }
    println!();

    let blocked_first = matches!(
        report.outcome,
        RecheckOutcome::Completed {
            platform: PlatformKind::Workday,
            stage: Stage::Blocked,
            action: ActionKind::PauseNeedsUser,
            ..
        }
    );
    println!(
        "  Blocked beats login: {}",
        if blocked_first { "YES" } else { "NO" }
    );
    print_content(report.content.as_ref());
    println!();
    println!("  Scenario 1 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_page_with_password_field_pauses_as_blocked() {
        let report = walk().unwrap();
        match report.outcome {
            RecheckOutcome::Completed {
                platform,
                stage,
                action,
                resumed,
            } => {
                assert_eq!(platform, PlatformKind::Workday);
                assert_eq!(stage, Stage::Blocked);
                assert_eq!(action, ActionKind::PauseNeedsUser);
                assert!(!resumed);
            }
            other => panic!("expected Completed, got {:?}", other),
        }
        assert_eq!(report.intent, Some(Intent::Unclassifiable));
        let content = report.content.expect("surface shows paused content");
        assert_eq!(content.title, "The site paused automated access");
    }
}
