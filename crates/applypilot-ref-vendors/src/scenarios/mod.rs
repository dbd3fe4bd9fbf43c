//! Reference scenarios.
//!
//! Each scenario builds its own `VendorRig`, drives one or more pages through
//! the engine on a fixed clock, and prints what the user and the collector
//! would see. `walk` returns the facts a test can assert on; `run_scenario`
//! prints them.

pub mod blocked_login;
pub mod form_with_errors;
pub mod resume_after_sign_in;
pub mod session_exclusivity;
pub mod unchanged_page;
pub mod vendor_landing;

use chrono::{DateTime, Duration, TimeZone, Utc};

use applypilot_contracts::{
    error::{PilotError, PilotResult},
    guidance::StatusContent,
};
use applypilot_core::RecheckOutcome;

use crate::harness::PageHandle;

/// Run every scenario in order.
pub fn run_all() -> PilotResult<()> {
    blocked_login::run_scenario()?;
    vendor_landing::run_scenario()?;
    form_with_errors::run_scenario()?;
    unchanged_page::run_scenario()?;
    resume_after_sign_in::run_scenario()?;
    session_exclusivity::run_scenario()?;
    Ok(())
}

/// The fixed start of every scenario clock.
pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub(crate) fn after(t0: DateTime<Utc>, ms: i64) -> DateTime<Utc> {
    t0 + Duration::milliseconds(ms)
}

/// Run the next due recheck; a scenario step that schedules nothing is a bug.
pub(crate) fn next_pass(page: &mut PageHandle) -> PilotResult<RecheckOutcome> {
    page.run_next()
        .map(|(_, outcome)| outcome)
        .ok_or_else(|| PilotError::Classification {
            reason: "no recheck was scheduled".to_string(),
        })
}

pub(crate) fn describe(outcome: &RecheckOutcome) -> String {
    match outcome {
        RecheckOutcome::Idle => "idle (no active session)".to_string(),
        RecheckOutcome::Deduplicated { signature } => {
            format!("deduplicated (signature {}…)", &signature[..12.min(signature.len())])
        }
        RecheckOutcome::Completed {
            platform,
            stage,
            action,
            resumed,
        } => {
            let resumed = if *resumed { ", resumed" } else { "" };
            format!("{} / {} → {}{}", platform, stage, action, resumed)
        }
        RecheckOutcome::Fallback { reason } => format!("fallback: {}", reason),
        RecheckOutcome::Abandoned { reason } => format!("abandoned: {}", reason),
    }
}

pub(crate) fn print_content(content: Option<&StatusContent>) {
    match content {
        Some(content) => {
            println!("  Surface [{:?}]: {}", content.tone, content.title);
            println!("    {}", content.progress);
            println!("    {}", content.instruction);
            println!("    {}", content.what_next);
        }
        None => println!("  Surface: (not shown)"),
    }
}
