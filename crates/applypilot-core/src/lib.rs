//! # applypilot-core
//!
//! The decision engine and lifecycle plumbing for applypilot.
//!
//! - `decision`: the pure `(task, platform, stage) → action` state machine
//! - `background`: task claiming, transitions and the active session record
//! - `controller`: the per-page recheck loop and detection pipeline
//! - `scheduler`: debounced, clock-explicit recheck timing
//! - `traits`: every seam the engine is written against
//!
//! Classifiers, guidance text, telemetry delivery and storage live in their
//! own crates and plug in through `traits`.

pub mod background;
pub mod config;
pub mod controller;
pub mod decision;
pub mod keys;
pub mod scheduler;
pub mod signature;
pub mod traits;

#[cfg(test)]
mod testing;

pub use background::{Background, BackgroundLink, BackgroundRequest, BackgroundResponse};
pub use config::EngineConfig;
pub use controller::{Detectors, HostAdapters, HostEvent, NavigationKind, PageController, RecheckOutcome, SharedServices};
pub use decision::decide;
