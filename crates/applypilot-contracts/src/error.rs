//! Runtime error types for the applypilot detection pipeline.
//!
//! All fallible operations in the engine return `PilotResult<T>`. Error
//! variants carry enough context to produce a useful telemetry event.

use thiserror::Error;

/// The unified error type for the applypilot engine.
#[derive(Debug, Error)]
pub enum PilotError {
    /// The task-queue backend could not be reached or answered with a failure.
    ///
    /// Never surfaced to the user as a blocking error: the current pass is
    /// abandoned and the next trigger retries.
    #[error("backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    /// The host could not produce a page snapshot at all.
    #[error("page read failed: {reason}")]
    PageRead { reason: String },

    /// A classifier failed outright (as opposed to returning `unknown`).
    #[error("classification failed: {reason}")]
    Classification { reason: String },

    /// The persistent key-value store rejected a read or write.
    #[error("store operation failed: {reason}")]
    StoreFailed { reason: String },

    /// The telemetry transport could not deliver a batch.
    #[error("telemetry transport failed: {reason}")]
    TransportFailed { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A stored JSON document did not match its schema.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },

    /// A task status change that the status vocabulary does not allow.
    #[error("illegal task transition from '{from}' to '{to}'")]
    IllegalTransition { from: String, to: String },

    /// A response or request referred to a task other than the claimed one.
    #[error("session mismatch: expected task '{expected}', got '{actual}'")]
    SessionMismatch { expected: String, actual: String },

    /// An operation required an active apply session and none exists.
    #[error("no active apply session")]
    NoActiveSession,
}

/// Convenience alias used throughout the applypilot crates.
pub type PilotResult<T> = Result<T, PilotError>;
