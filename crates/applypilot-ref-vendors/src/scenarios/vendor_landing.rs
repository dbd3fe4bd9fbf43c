//! Scenario 2: Vendor landing page
//!
//! A Greenhouse job posting before the application form is opened. Host,
//! path and the board's DOM marker agree on the vendor with high
//! confidence; the stage is `landing`, so the worker pauses and asks the
//! user to click Apply.

use applypilot_contracts::{
    error::PilotResult,
    guidance::{Intent, StatusContent},
    platform::{Confidence, PlatformKind},
    stage::Stage,
};
use applypilot_core::RecheckOutcome;

use crate::{
    fixtures::{greenhouse_landing, queued_task},
    harness::VendorRig,
};

use super::{describe, next_pass, print_content, start_time};

#[derive(Debug)]
pub struct LandingReport {
    pub outcome: RecheckOutcome,
    pub platform_confidence: Option<Confidence>,
    pub intent: Option<Intent>,
    pub content: Option<StatusContent>,
    /// Automation event kinds the backend received.
    pub automation_events: Vec<String>,
}

pub fn walk() -> PilotResult<LandingReport> {
    let t0 = start_time();
    let landing = greenhouse_landing();
    let rig = VendorRig::new(vec![queued_task(
        "task-202",
        &landing.url,
        "Globex",
        "Platform Engineer",
    )])?;
    rig.claim(t0)?;

    let mut page = rig.open_page(landing);
    page.controller.attach(t0)?;
    let outcome = next_pass(&mut page)?;

    let snapshot = page.controller.debug_snapshot();
    let content = page.surface.current();
    let automation_events = rig
        .backend
        .state
        .lock()
        .map(|s| s.automation_events.iter().map(|(_, kind)| kind.clone()).collect())
        .unwrap_or_default();

    Ok(LandingReport {
        outcome,
        platform_confidence: snapshot.map(|s| s.platform.confidence),
        intent: snapshot.and_then(|s| s.guidance.as_ref()).map(|g| g.intent),
        content,
        automation_events,
    })
}

/// Run Scenario 2: Vendor landing page.
pub fn run_scenario() -> PilotResult<()> {
    println!("=== Scenario 2: Vendor landing page ===");
    println!();
    println!("  Page: Greenhouse job board posting, no form fields yet");
    println!();

    let report = walk()?;
    println!("  Pass:       {}", describe(&report.outcome));
    if let Some(confidence) = report.platform_confidence {
        println!("  Confidence: {:?}", confidence);
    }
    if let Some(intent) = report.intent {
        println!("  Intent:     {}", intent);
    }
    println!("  Backend automation events: {:?}", report.automation_events);
    println!(
        "  Landing detected: {}",
        if is_paused_landing(&report.outcome) { "YES" } else { "NO" }
    );
    println!();
    print_content(report.content.as_ref());
    println!();
    println!("  Scenario 2 complete.");
    println!();
    Ok(())
}

fn is_paused_landing(outcome: &RecheckOutcome) -> bool {
    matches!(
        outcome,
        RecheckOutcome::Completed {
            platform: PlatformKind::Greenhouse,
            stage: Stage::Landing,
            ..
        }
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
