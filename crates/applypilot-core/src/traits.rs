//! Trait seams for the applypilot engine.
//!
//! The engine is split along the same trust lines everywhere:
//!
//! - `PlatformDetector`, `StageDetector`: pure classifiers over a snapshot
//! - `GuidanceProvider`: deterministic text lookup, no decision logic
//! - `PageReader`, `StatusSurface`, `Autofill`: host adapters owned by the
//!   page context
//! - `TaskBackend`, `SessionStore`, `PreferencesStore`, `TelemetrySink`:
//!   shared services reached from both execution contexts
//!
//! The controller and the background process are written only against these
//! traits so every host-specific hook can be swapped in tests.

use serde_json::Value;

use applypilot_contracts::{
    error::PilotResult,
    guidance::{Guidance, Intent, StatusContent},
    page::PageSnapshot,
    platform::{PlatformKind, PlatformResult},
    prefs::AutomationPreferences,
    profile::{DerivedProfile, FillReport},
    session::ApplySession,
    stage::StageResult,
    task::{Task, TaskStatus},
    telemetry::{ObservabilityEvent, RunStatus},
};

/// Scores which vendor platform owns the page.
pub trait PlatformDetector: Send + Sync {
    /// Classify `page`. Must be free of side effects.
    ///
    /// Ambiguity is not an error: return `unknown`. An `Err` is reserved for a
    /// detector that cannot run at all, and sends the controller to its
    /// fallback guidance.
    fn classify(&self, page: &PageSnapshot) -> PilotResult<PlatformResult>;
}

/// Determines which step of the application funnel the page represents.
pub trait StageDetector: Send + Sync {
    fn classify(&self, page: &PageSnapshot, platform: PlatformKind) -> PilotResult<StageResult>;
}

/// Turns classifications into human-facing text.
///
/// Implementations are lookups: they never fail and never decide anything.
pub trait GuidanceProvider: Send + Sync {
    /// Why the worker paused on this page.
    fn intent(&self, platform: &PlatformResult, stage: &StageResult) -> Intent;

    /// The instruction for a paused pass, scoped to the session's step count.
    fn guidance(
        &self,
        intent: Intent,
        platform: &PlatformResult,
        stage: &StageResult,
        session: &ApplySession,
    ) -> Guidance;

    /// Surface content shown while the first pass of a session is pending.
    fn checking(&self, session: &ApplySession) -> StatusContent;

    /// Surface content for a paused pass.
    fn paused(&self, guidance: &Guidance, session: &ApplySession) -> StatusContent;

    /// Surface content while autofill is cleared to run.
    fn working(&self, platform: &PlatformResult, session: &ApplySession) -> StatusContent;

    /// Surface content when the page looks submitted and the human must confirm.
    fn awaiting_confirmation(&self, platform: &PlatformResult, session: &ApplySession) -> StatusContent;

    /// Static content for when the detection pipeline failed.
    fn fallback(&self, session: &ApplySession) -> StatusContent;
}

/// Host adapter producing guarded reads of the current page.
pub trait PageReader {
    fn snapshot(&self) -> PilotResult<PageSnapshot>;
}

/// Host adapter for the page-level status surface (overlay).
pub trait StatusSurface {
    /// Whether the surface is currently attached to the page.
    fn is_present(&self) -> bool;

    /// Create the surface if needed and show `content`.
    fn render(&mut self, content: &StatusContent) -> PilotResult<()>;

    /// Detach the surface.
    fn remove(&mut self);
}

/// The form-filling routines that consume a `continue` decision.
pub trait Autofill {
    /// Populate what it can on `page` from `profile`.
    fn fill(&mut self, page: &PageSnapshot, profile: &DerivedProfile) -> PilotResult<FillReport>;
}

/// The task-queue backend.
///
/// Every method is a network call. Failures surface as
/// `PilotError::BackendUnavailable`; callers log and retry on the next trigger.
pub trait TaskBackend: Send + Sync {
    /// `GET next-task`. `None` when the queue is empty.
    fn next_task(&self) -> PilotResult<Option<Task>>;

    /// `GET task(id)`.
    fn task(&self, task_id: &str) -> PilotResult<Task>;

    /// `POST task/:id/transition`.
    fn transition(&self, task_id: &str, to: TaskStatus, reason: &str, details: &Value) -> PilotResult<Task>;

    /// `GET active-session`.
    fn active_session(&self) -> PilotResult<Option<ApplySession>>;

    /// `DELETE active-session`.
    fn clear_active_session(&self) -> PilotResult<()>;

    /// `GET derived-profile`: the only acceptable autofill data source.
    fn derived_profile(&self, task_id: &str) -> PilotResult<DerivedProfile>;

    /// `GET automation-preferences`, as stored (possibly an older version).
    fn get_preferences(&self) -> PilotResult<Option<Value>>;

    /// `PUT automation-preferences`.
    fn put_preferences(&self, prefs: &AutomationPreferences) -> PilotResult<()>;

    /// `POST automation-events`.
    fn post_automation_event(&self, task_id: &str, kind: &str, details: &Value) -> PilotResult<()>;
}

/// The persistent key-value store shared by every execution context.
///
/// Readers must treat stored values as possibly stale and re-read before a
/// read-modify-write.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> PilotResult<Option<Value>>;
    fn put(&self, key: &str, value: Value) -> PilotResult<()>;
    fn remove(&self, key: &str) -> PilotResult<()>;
}

/// Versioned automation preferences.
pub trait PreferencesStore: Send + Sync {
    /// Read the stored record, migrating older versions forward.
    fn load(&self) -> PilotResult<AutomationPreferences>;

    /// Persist `prefs` at the current version.
    fn save(&self, prefs: &AutomationPreferences) -> PilotResult<()>;

    /// Validate, migrate and persist a record fetched from the backend.
    fn import(&self, raw: Value) -> PilotResult<AutomationPreferences>;
}

/// The batched, redacted telemetry channel.
pub trait TelemetrySink: Send + Sync {
    /// Begin a run for the given session and return its id.
    fn start_run(&self, task_id: &str, job_id: &str) -> PilotResult<String>;

    /// Stamp, redact and queue `event` under the current run.
    fn enqueue(&self, event: ObservabilityEvent);

    /// Transmit one batch. Returns the number of events delivered.
    fn flush(&self) -> PilotResult<usize>;

    /// Record the run outcome, flush, and close the run.
    fn end_run(&self, status: RunStatus, reason: &str) -> PilotResult<()>;

    /// Fire-and-forget delivery of whatever is queued; the page is going away.
    fn teardown(&self);

    /// The id of the open run, if any.
    fn current_run_id(&self) -> Option<String>;
}
