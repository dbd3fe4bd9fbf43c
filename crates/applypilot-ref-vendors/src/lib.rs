//! # applypilot-ref-vendors
//!
//! Reference runtime for the applypilot engine.
//!
//! Wires the real classifiers, guidance, telemetry pipeline and stores to an
//! in-memory task backend and scripted pages, then walks through the
//! situations the engine has to get right:
//!
//! 1. **Blocked login**: an anti-bot page that also shows a password field.
//! 2. **Vendor landing**: a job posting before the form is opened.
//! 3. **Form with errors**: six inputs and visible validation errors.
//! 4. **Unchanged page**: three triggers on the same page, one pass.
//! 5. **Sign-in then resume**: a Workday login wall cleared by the user.
//! 6. **Session exclusivity**: claiming a second task closes the first.
//!
//! All pages, tasks and profile answers are fictional. Nothing leaves the
//! process.

pub mod fixtures;
pub mod harness;
pub mod scenarios;
