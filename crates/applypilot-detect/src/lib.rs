//! # applypilot-detect
//!
//! Catalogue-driven classifiers for the applypilot engine.
//!
//! - [`SignalPlatformDetector`] scores which vendor owns a page.
//! - [`RuleStageDetector`] places the page in the application funnel.
//!
//! Both read a [`SignalCatalogue`] loaded from TOML. The built-in catalogue
//! ships in `signals/default.toml`.
//!
//! ```rust,ignore
//! use applypilot_detect::{SignalCatalogue, SignalPlatformDetector, RuleStageDetector};
//!
//! let catalogue = SignalCatalogue::builtin()?;
//! let platform = SignalPlatformDetector::new(catalogue.clone());
//! let stage = RuleStageDetector::new(catalogue);
//! ```

pub mod catalogue;
pub mod platform;
pub mod stage;

pub use catalogue::{SignalCatalogue, VendorSignals};
pub use platform::SignalPlatformDetector;
pub use stage::RuleStageDetector;

// ── Tests ─────────────────────────────────────────────────────────────────────
