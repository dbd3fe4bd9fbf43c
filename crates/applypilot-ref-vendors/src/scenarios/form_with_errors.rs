//! Scenario 3: Form with validation errors
//!
//! A Lever form with six inputs, a "Submit application" button and two
//! visible inline errors. The errors demote `ready_to_submit` to
//! `form_filling`; either way the worker continues and autofill runs. Once
//! the errors clear the same form reads as ready to submit. Submitting leads
//! to a confirmation page, which the worker never closes by itself: the
//! user confirms and the task moves to `success`.

use applypilot_contracts::{
    error::PilotResult,
    guidance::StatusContent,
    profile::FillReport,
    task::TaskStatus,
};
use applypilot_core::{HostEvent, NavigationKind, RecheckOutcome};

use crate::{
    fixtures::{lever_form_with_errors, lever_submitted, queued_task, LEVER_APPLY_URL},
    harness::VendorRig,
};

use super::{after, describe, next_pass, print_content, start_time};

#[derive(Debug)]
pub struct FormReport {
    /// Outcomes in order: errors shown, errors cleared, confirmation page.
    pub outcomes: Vec<RecheckOutcome>,
    pub fill: Option<FillReport>,
    /// What the surface showed on the confirmation page.
    pub confirmation: Option<StatusContent>,
    pub final_status: Option<TaskStatus>,
    pub delivered_events: Vec<String>,
}

pub fn walk() -> PilotResult<FormReport> {
    let t0 = start_time();
    let rig = VendorRig::new(vec![queued_task(
        "task-203",
        LEVER_APPLY_URL,
        "Initech",
        "Backend Engineer",
    )])?;
    rig.claim(t0)?;

    let mut page = rig.open_page(lever_form_with_errors());
    page.controller.attach(t0)?;
    let mut outcomes = vec![next_pass(&mut page)?];
    let fill = page.autofill.last_report();

    // The user fixes both fields; the form re-renders without errors.
    let mut fixed = lever_form_with_errors();
    fixed.error_markers = 0;
    fixed.visible_text = "Submit your application.".to_string();
    page.page.show(fixed);
    page.controller
        .handle_host_event(HostEvent::ContentMutated { mutations: 14 }, after(t0, 4_000));
    outcomes.push(next_pass(&mut page)?);

    // The user clicks submit and lands on the thank-you page.
    let thanks = lever_submitted();
    let thanks_url = thanks.url.clone();
    page.page.show(thanks);
    page.controller.handle_host_event(
        HostEvent::NavigationObserved {
            kind: NavigationKind::Push,
            url: thanks_url,
        },
        after(t0, 9_000),
    );
    outcomes.push(next_pass(&mut page)?);
    let confirmation = page.surface.current();

    page.controller
        .complete_task(TaskStatus::Success, "user confirmed the submission")?;

    Ok(FormReport {
        outcomes,
        fill,
        confirmation,
        final_status: rig.backend.status_of("task-203"),
        delivered_events: rig.delivered_events(),
    })
}

/// Run Scenario 3: Form with validation errors.
pub fn run_scenario() -> PilotResult<()> {
    println!("=== Scenario 3: Form with validation errors ===");
    println!();
    println!("  Page: Lever application, 6 inputs, 2 inline errors");
    println!();

    let report = walk()?;
    let labels = ["errors shown", "errors fixed", "after submit"];
    for (label, outcome) in labels.iter().zip(&report.outcomes) {
        println!("  {:<13} {}", format!("{}:", label), describe(outcome));
    }
    if let Some(fill) = &report.fill {
        println!(
            "  Autofill: {}/{} fields ({:.0}%), skipped {:?}",
            fill.filled,
            fill.attempted,
            fill.fill_rate() * 100.0,
            fill.skipped
        );
    }
    println!();
    print_content(report.confirmation.as_ref());
    if let Some(status) = report.final_status {
        println!("  Task status after user confirmation: {}", status);
    }
    println!("  Collector received {} event(s):", report.delivered_events.len());
    println!("    {}", report.delivered_events.join(", "));
    println!();
    println!("  Scenario 3 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
