//! Scenario 6: Session exclusivity
//!
//! The worker claims a Lever task and starts on its form, then claims a
//! Greenhouse task before finishing. Opening the second session closes the
//! first: its record is kept inactive, its telemetry run ends as
//! `abandoned`, and a late task update for the old page is discarded.

use applypilot_contracts::{error::PilotResult, session::ApplySession};
use applypilot_core::{keys, traits::TaskBackend, RecheckOutcome};

use crate::{
    fixtures::{greenhouse_landing, lever_form_with_errors, queued_task, LEVER_APPLY_URL},
    harness::VendorRig,
};

use super::{after, describe, next_pass, start_time};

#[derive(Debug)]
pub struct ExclusivityReport {
    pub first_outcome: RecheckOutcome,
    pub second_outcome: RecheckOutcome,
    pub first_record: Option<ApplySession>,
    pub active_task: Option<String>,
    /// `status` of every `run_ended` event the collector received.
    pub ended_runs: Vec<String>,
    pub stale_update_accepted: bool,
}

pub fn walk() -> PilotResult<ExclusivityReport> {
    let t0 = start_time();
    let landing = greenhouse_landing();
    let rig = VendorRig::new(vec![
        queued_task("task-206", LEVER_APPLY_URL, "Initech", "Backend Engineer"),
        queued_task("task-207", &landing.url, "Globex", "Platform Engineer"),
    ])?;

    rig.claim(t0)?;
    let mut first = rig.open_page(lever_form_with_errors());
    first.controller.attach(t0)?;
    let first_outcome = next_pass(&mut first)?;

    let t1 = after(t0, 60_000);
    let second_session = rig.claim(t1)?;
    let mut second = rig.open_page(landing);
    second.controller.attach(t1)?;
    let second_outcome = next_pass(&mut second)?;

    let first_record = keys::load::<ApplySession>(&rig.store, &keys::session_record("task-206"))?;
    let active_task = keys::load::<ApplySession>(&rig.store, keys::ACTIVE_SESSION)?.map(|s| s.task_id);

    // A response for the new task reaching the old page is stale there.
    let update = rig.backend.task(&second_session.task_id)?;
    let stale_update_accepted = first.controller.accept_task_update(&update);

    let ended_runs: Vec<String> = rig
        .transport
        .log
        .lock()
        .map(|log| {
            log.batches
                .iter()
                .flat_map(|(_, events)| events.iter())
                .filter(|e| e.event_name == "run_ended")
                .filter_map(|e| e.payload["status"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(ExclusivityReport {
        first_outcome,
        second_outcome,
        first_record,
        active_task,
        ended_runs,
        stale_update_accepted,
    })
}

/// Run Scenario 6: Session exclusivity.
pub fn run_scenario() -> PilotResult<()> {
    println!("=== Scenario 6: Session exclusivity ===");
    println!();
    println!("  Task A: Initech on Lever   Task B: Globex on Greenhouse");
    println!();

    let report = walk()?;
    println!("  Task A first pass: {}", describe(&report.first_outcome));
    println!("  Task B first pass: {}", describe(&report.second_outcome));
    println!();
    if let Some(record) = &report.first_record {
        println!(
            "  Task A session record: active={} after {} recheck(s)",
            record.active, record.recheck_count
        );
    }
    println!(
        "  Active session now:    {}",
        report.active_task.as_deref().unwrap_or("(none)")
    );
    println!("  Runs ended:            {:?}", report.ended_runs);
    println!(
        "  Task B update on task A's page: {}",
        if report.stale_update_accepted { "ACCEPTED" } else { "DISCARDED" }
    );
    println!();
    println!("  Scenario 6 complete.");
    println!();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use applypilot_contracts::telemetry::RunStatus;

    use super::*;

    #[test]
    fn second_claim_closes_the_first_session() {
        let report = walk().unwrap();

        let record = report.first_record.expect("closed session record kept");
        assert!(!record.active);
        assert_eq!(record.recheck_count, 1);
        assert_eq!(report.active_task.as_deref(), Some("task-207"));
        assert_eq!(report.ended_runs, vec![RunStatus::Abandoned.to_string()]);
    }

    #[test]
    fn both_pages_ran_a_pass() {
        let report = walk().unwrap();
        assert!(matches!(report.first_outcome, RecheckOutcome::Completed { .. }));
        assert!(matches!(report.second_outcome, RecheckOutcome::Completed { .. }));
    }

    #[test]
    fn old_page_discards_updates_for_the_new_task() {
        assert!(!walk().unwrap().stale_update_accepted);
    }
}
