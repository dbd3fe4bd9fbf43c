//! Scenario 4: Unchanged page
//!
//! Three triggers (page load, tab refocus, manual recheck) arrive on an
//! Ashby form that never changes. The first pass classifies the page; the
//! other two see the same `(url, page_type, task_id)` signature and stop
//! before any classifier runs, without touching the session or emitting a
//! detection event. The page's own scripts wipe the status surface between
//! the second and third trigger, and the duplicate pass still puts it back.

use applypilot_contracts::{error::PilotResult, telemetry::ObservabilityEvent};
use applypilot_core::{HostEvent, RecheckOutcome};

use crate::{
    fixtures::{ashby_ready, queued_task},
    harness::VendorRig,
};

use super::{after, describe, next_pass, start_time};

#[derive(Debug)]
pub struct UnchangedReport {
    pub outcomes: Vec<RecheckOutcome>,
    pub classification_passes: u64,
    pub recheck_count: u64,
    pub surface_present: bool,
    /// Queued telemetry, oldest first.
    pub events: Vec<ObservabilityEvent>,
}

impl UnchangedReport {
    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.event_name == name).count()
    }
}

pub fn walk() -> PilotResult<UnchangedReport> {
    let t0 = start_time();
    let form = ashby_ready();
    let rig = VendorRig::new(vec![queued_task("task-204", &form.url, "Hooli", "Data Engineer")])?;
    rig.claim(t0)?;

    let mut page = rig.open_page(form);
    page.controller.attach(t0)?;
    let mut outcomes = vec![next_pass(&mut page)?];

    page.controller
        .handle_host_event(HostEvent::VisibilityChanged { visible: true }, after(t0, 3_000));
    outcomes.push(next_pass(&mut page)?);

    page.surface.wipe();
    page.controller.handle_host_event(HostEvent::ManualRecheck, after(t0, 6_000));
    outcomes.push(next_pass(&mut page)?);

    Ok(UnchangedReport {
        outcomes,
        classification_passes: page.controller.classification_passes(),
        recheck_count: page.controller.session().map(|s| s.recheck_count).unwrap_or(0),
        surface_present: page.surface.current().is_some(),
        events: rig.telemetry.queued(),
    })
}

/// Run Scenario 4: Unchanged page.
pub fn run_scenario() -> PilotResult<()> {
    println!("=== Scenario 4: Unchanged page ===");
    println!();
    println!("  Page: Ashby form, unchanged across three triggers");
    println!();

    let report = walk()?;
    for (trigger, outcome) in ["page load", "tab refocus", "manual"].iter().zip(&report.outcomes) {
        println!("  {:<12} {}", format!("{}:", trigger), describe(outcome));
    }
    println!();
    println!("  Classifier runs:      {}", report.classification_passes);
    println!("  Session recheck count: {}", report.recheck_count);
    println!("  detection_pass events: {}", report.count("detection_pass"));
    println!(
        "  Surface after wipe:    {}",
        if report.surface_present { "RESTORED" } else { "MISSING" }
    );
    println!();
    println!("  Scenario 4 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use applypilot_contracts::{action::ActionKind, stage::Stage, telemetry::Severity};

    use super::*;

    #[test]
    fn identical_signature_classifies_once() {
        let report = walk().unwrap();

        match &report.outcomes[0] {
            RecheckOutcome::Completed { stage, .. } => assert_eq!(*stage, Stage::ReadyToSubmit),
            other => panic!("expected Completed, got {:?}", other),
        }
        let signatures: Vec<&str> = report.outcomes[1..]
            .iter()
            .map(|o| match o {
                RecheckOutcome::Deduplicated { signature } => signature.as_str(),
                other => panic!("expected Deduplicated, got {:?}", other),
            })
            .collect();
        assert_eq!(signatures[0], signatures[1]);

        assert_eq!(report.classification_passes, 1);
        assert_eq!(report.recheck_count, 1);
        assert_eq!(report.count("detection_pass"), 1);
    }

    #[test]
    fn duplicate_pass_still_restores_the_surface() {
        let report = walk().unwrap();
        assert!(report.surface_present);

        assert_eq!(report.count("overlay_shown"), 1);
        let recreated: Vec<Severity> = report
            .events
            .iter()
            .filter(|e| e.event_name == "overlay_recreated")
            .map(|e| e.severity)
            .collect();
        // Only the wipe counts as a loss; the first render does not.
        assert_eq!(recreated, vec![Severity::Warning]);
    }

    #[test]
    fn challenge_widget_on_an_unchanged_form_is_rechecked() {
        let t0 = start_time();
        let form = ashby_ready();
        let rig = VendorRig::new(vec![queued_task("task-204", &form.url, "Hooli", "Data Engineer")]).unwrap();
        rig.claim(t0).unwrap();
        let mut page = rig.open_page(form.clone());
        page.controller.attach(t0).unwrap();

        match next_pass(&mut page).unwrap() {
            RecheckOutcome::Completed { stage, action, .. } => {
                assert_eq!(stage, Stage::ReadyToSubmit);
                assert_eq!(action, ActionKind::Continue);
            }
            other => panic!("expected Completed, got {:?}", other),
        }

        // Same url, text and fields; only the Turnstile widget appears.
        let mut challenged = form;
        challenged.markers.push("cf-turnstile".to_string());
        page.page.show(challenged);
        page.controller
            .handle_host_event(HostEvent::ContentMutated { mutations: 3 }, after(t0, 3_000));

        match next_pass(&mut page).unwrap() {
            RecheckOutcome::Completed { stage, action, .. } => {
                assert_eq!(stage, Stage::VerificationRequired);
                assert_eq!(action, ActionKind::PauseNeedsUser);
            }
            other => panic!("expected Completed, got {:?}", other),
        }
        assert_eq!(page.controller.classification_passes(), 2);
    }
}
