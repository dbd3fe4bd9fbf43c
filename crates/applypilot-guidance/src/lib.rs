//! # applypilot-guidance
//!
//! Turns a paused classification pass into a human instruction, and builds
//! the status-surface content for every other state.
//!
//! [`TemplateGuidance`] implements
//! [`GuidanceProvider`](applypilot_core::traits::GuidanceProvider). It is a
//! lookup table: given the same inputs it always produces the same text.

pub mod intent;
pub mod templates;

pub use intent::intent_for;
pub use templates::TemplateGuidance;

// ── Tests ─────────────────────────────────────────────────────────────────────
