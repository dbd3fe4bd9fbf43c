//! Scenario 5: Sign-in, then resume
//!
//! Workday asks for a per-employer account before the form. The worker
//! pauses with registration guidance and starts the resume monitor, which
//! re-checks the unchanged page cheaply. When the user signs in and the form
//! appears, the next pass continues, reports the resume to the backend and
//! the collector, and autofill takes over.

use applypilot_contracts::{
    error::PilotResult,
    guidance::{Intent, StatusContent},
    profile::FillReport,
};
use applypilot_core::{HostEvent, NavigationKind, RecheckOutcome};

use crate::{
    fixtures::{queued_task, workday_application, workday_sign_in, WORKDAY_APPLY_URL},
    harness::VendorRig,
};

use super::{after, describe, next_pass, print_content, start_time};

#[derive(Debug)]
pub struct ResumeReport {
    /// Sign-in pass, resume-poll pass, post-sign-in pass.
    pub outcomes: Vec<RecheckOutcome>,
    pub intent: Option<Intent>,
    pub paused_content: Option<StatusContent>,
    pub polling_while_paused: bool,
    pub polling_after_resume: bool,
    pub automation_events: Vec<String>,
    pub fill: Option<FillReport>,
    pub event_names: Vec<String>,
}

pub fn walk() -> PilotResult<ResumeReport> {
    let t0 = start_time();
    let rig = VendorRig::new(vec![queued_task(
        "task-205",
        WORKDAY_APPLY_URL,
        "Acme",
        "Backend Engineer",
    )])?;
    rig.claim(t0)?;

    let mut page = rig.open_page(workday_sign_in());
    page.controller.attach(t0)?;
    let mut outcomes = vec![next_pass(&mut page)?];
    let intent = page
        .controller
        .debug_snapshot()
        .and_then(|s| s.guidance.as_ref())
        .map(|g| g.intent);
    let paused_content = page.surface.current();
    let polling_while_paused = page.controller.is_resume_polling();

    // The resume monitor fires while the user is still typing.
    outcomes.push(next_pass(&mut page)?);

    let form = workday_application();
    let form_url = form.url.clone();
    page.page.show(form);
    page.controller.handle_host_event(
        HostEvent::NavigationObserved {
            kind: NavigationKind::Push,
            url: form_url,
        },
        after(t0, 5_000),
    );
    outcomes.push(next_pass(&mut page)?);

    let automation_events = rig
        .backend
        .state
        .lock()
        .map(|s| s.automation_events.iter().map(|(_, kind)| kind.clone()).collect())
        .unwrap_or_default();

    Ok(ResumeReport {
        outcomes,
        intent,
        paused_content,
        polling_while_paused,
        polling_after_resume: page.controller.is_resume_polling(),
        automation_events,
        fill: page.autofill.last_report(),
        event_names: rig.telemetry.queued().into_iter().map(|e| e.event_name).collect(),
    })
}

/// Run Scenario 5: Sign-in, then resume.
pub fn run_scenario() -> PilotResult<()> {
    println!("=== Scenario 5: Sign-in, then resume ===");
    println!();
    println!("  Page: Workday account wall, then 'My Information'");
    println!();

    let report = walk()?;
    for (step, outcome) in ["sign-in page", "resume poll", "after sign-in"].iter().zip(&report.outcomes) {
        println!("  {:<14} {}", format!("{}:", step), describe(outcome));
    }
    if let Some(intent) = report.intent {
        println!("  Paused for:    {}", intent);
    }
    println!();
    print_content(report.paused_content.as_ref());
    println!();
    println!("  Backend automation events: {:?}", report.automation_events);
    if let Some(fill) = &report.fill {
        println!("  Autofill after resume: {}/{} fields", fill.filled, fill.attempted);
    }
    println!(
        "  Resume monitor: {} while paused, {} after resume",
        if report.polling_while_paused { "on" } else { "off" },
        if report.polling_after_resume { "on" } else { "off" },
    );
    println!();
    println!("  Scenario 5 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
