//! The long-lived background process.
//!
//! The background owns everything that must outlive a single page: claiming
//! tasks, task-status transitions, the active `ApplySession` record, and the
//! telemetry run that spans it. Page contexts reach it only through
//! `BackgroundLink` request/response messages; no state is shared by
//! reference between the two contexts.
//!
//! The background is the arbiter of "which task is currently claimed". Every
//! write to the session record is a read-modify-write against the shared
//! store, re-reading first because another context may have written since.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use applypilot_contracts::{
    error::{PilotError, PilotResult},
    platform::PlatformKind,
    profile::DerivedProfile,
    session::ApplySession,
    task::{Task, TaskStatus},
    telemetry::{ObservabilityEvent, RunStatus, Severity},
};

use crate::{
    keys,
    traits::{PreferencesStore, SessionStore, TaskBackend, TelemetrySink},
};

/// A message from a page context to the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackgroundRequest {
    GetActiveSession,
    GetTask {
        task_id: String,
    },
    /// Record one executed recheck against the active session.
    TouchSession {
        task_id: String,
        url: String,
        platform: PlatformKind,
        at: DateTime<Utc>,
    },
    FetchDerivedProfile {
        task_id: String,
    },
    /// Move the task to an exit state and close its session.
    CompleteTask {
        task_id: String,
        outcome: TaskStatus,
        reason: String,
    },
    /// The user walked away from the application.
    AbandonSession {
        task_id: String,
        reason: String,
    },
    RecordAutomationEvent {
        task_id: String,
        kind: String,
        details: Value,
    },
}

/// The background's answer to a `BackgroundRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackgroundResponse {
    Session { session: Option<ApplySession> },
    Task { task: Task },
    Profile { profile: DerivedProfile },
    Ack,
}

/// The message channel from a page context to the background.
pub trait BackgroundLink: Send + Sync {
    fn request(&self, request: BackgroundRequest) -> PilotResult<BackgroundResponse>;
}

/// Task claiming, task transitions and cross-page session continuity.
pub struct Background {
    backend: Box<dyn TaskBackend>,
    store: Arc<dyn SessionStore>,
    prefs: Arc<dyn PreferencesStore>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Background {
    pub fn new(
        backend: Box<dyn TaskBackend>,
        store: Arc<dyn SessionStore>,
        prefs: Arc<dyn PreferencesStore>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            backend,
            store,
            prefs,
            telemetry,
        }
    }

    /// Claim the next queued task and open a session for it.
    ///
    /// Returns `Ok(None)` when the queue is empty.
    pub fn claim_next_task(&self, now: DateTime<Utc>) -> PilotResult<Option<ApplySession>> {
        let Some(task) = self.backend.next_task()? else {
            debug!("task queue is empty");
            return Ok(None);
        };

        if !task.status.can_transition_to(TaskStatus::InProgress) {
            return Err(PilotError::IllegalTransition {
                from: task.status.to_string(),
                to: TaskStatus::InProgress.to_string(),
            });
        }

        let task = self.backend.transition(
            &task.task_id,
            TaskStatus::InProgress,
            "claimed by worker",
            &json!({ "claimed_at": now }),
        )?;

        info!(task_id = %task.task_id, job_id = %task.job_id, "task claimed");

        self.refresh_preferences();
        self.open_session(&task, now).map(Some)
    }

    /// Open a session for `task`, closing any session that is still active.
    pub fn open_session(&self, task: &Task, now: DateTime<Utc>) -> PilotResult<ApplySession> {
        if let Some(prior) = keys::load::<ApplySession>(self.store.as_ref(), keys::ACTIVE_SESSION)? {
            if prior.active {
                info!(
                    prior_task_id = %prior.task_id,
                    task_id = %task.task_id,
                    "closing prior session before opening a new one"
                );
                let reason = format!("superseded by task '{}'", task.task_id);
                self.close_session(prior, RunStatus::Abandoned, &reason)?;
            }
        }

        let session = ApplySession::open(&task.task_id, &task.job_id, &task.destination_url, now);
        keys::save(self.store.as_ref(), keys::ACTIVE_SESSION, &session)?;
        keys::save(self.store.as_ref(), keys::PAGE_TASK, task)?;

        let run_id = self.telemetry.start_run(&task.task_id, &task.job_id)?;
        self.emit(
            Severity::Info,
            "session_opened",
            &session.initial_url,
            json!({ "task_id": task.task_id, "job_id": task.job_id, "run_id": run_id }),
        );

        info!(task_id = %task.task_id, run_id = %run_id, "apply session opened");
        Ok(session)
    }

    /// The currently active session, if any.
    ///
    /// Falls back to the backend's record when the local store has none,
    /// which happens after local storage is cleared mid-task.
    pub fn active_session(&self) -> PilotResult<Option<ApplySession>> {
        if let Some(session) = keys::load::<ApplySession>(self.store.as_ref(), keys::ACTIVE_SESSION)? {
            return Ok(Some(session).filter(|s| s.active));
        }

        match self.backend.active_session()? {
            Some(session) if session.active => {
                if self.is_stale_remote(&session)? {
                    info!(task_id = %session.task_id, "ignoring backend session that was already closed");
                    if let Err(err) = self.backend.clear_active_session() {
                        warn!(task_id = %session.task_id, error = %err, "backend active-session clear failed");
                    }
                    return Ok(None);
                }
                info!(task_id = %session.task_id, "restored active session from backend");
                keys::save(self.store.as_ref(), keys::ACTIVE_SESSION, &session)?;
                Ok(Some(session))
            }
            _ => Ok(None),
        }
    }

    /// A backend record is stale when this worker already closed that
    /// session locally, or its task has reached an exit state.
    fn is_stale_remote(&self, session: &ApplySession) -> PilotResult<bool> {
        let closed = keys::load::<ApplySession>(self.store.as_ref(), &keys::session_record(&session.task_id))?
            .is_some_and(|record| !record.active && record.started_at >= session.started_at);
        if closed {
            return Ok(true);
        }
        match self.backend.task(&session.task_id) {
            Ok(task) => Ok(task.status.is_terminal()),
            Err(err) => {
                debug!(task_id = %session.task_id, error = %err, "task status unknown; trusting backend session");
                Ok(false)
            }
        }
    }

    /// Fetch the task, caching it for the page; serve the cache if the backend is down.
    pub fn task(&self, task_id: &str) -> PilotResult<Task> {
        match self.backend.task(task_id) {
            Ok(task) => {
                keys::save(self.store.as_ref(), keys::PAGE_TASK, &task)?;
                Ok(task)
            }
            Err(err) => {
                let cached = keys::load::<Task>(self.store.as_ref(), keys::PAGE_TASK)?
                    .filter(|t| t.task_id == task_id);
                match cached {
                    Some(task) => {
                        warn!(task_id = %task_id, error = %err, "backend unavailable, using cached task");
                        Ok(task)
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Record one executed recheck on the active session.
    pub fn touch_session(
        &self,
        task_id: &str,
        url: &str,
        platform: PlatformKind,
        at: DateTime<Utc>,
    ) -> PilotResult<ApplySession> {
        let mut session = self.require_active(task_id)?;
        session.record_recheck(url, platform, at);
        keys::save(self.store.as_ref(), keys::ACTIVE_SESSION, &session)?;
        debug!(
            task_id = %task_id,
            recheck_count = session.recheck_count,
            platform = %platform,
            "session touched"
        );
        Ok(session)
    }

    /// Move `task_id` to an exit state and close its session.
    ///
    /// This is the only path that ends a session with a task outcome. A
    /// `submitted` page never gets here on its own: the human confirms.
    pub fn complete_task(&self, task_id: &str, outcome: TaskStatus, reason: &str) -> PilotResult<Task> {
        let current = self.backend.task(task_id)?;
        if !current.status.can_transition_to(outcome) {
            return Err(PilotError::IllegalTransition {
                from: current.status.to_string(),
                to: outcome.to_string(),
            });
        }

        let task = self
            .backend
            .transition(task_id, outcome, reason, &json!({ "reason": reason }))?;
        info!(task_id = %task_id, outcome = %outcome, "task reached exit state");

        if let Some(active) = keys::load::<ApplySession>(self.store.as_ref(), keys::ACTIVE_SESSION)? {
            if active.active && active.task_id == task_id {
                self.close_session(active, RunStatus::from_task_status(outcome), reason)?;
            }
        }
        Ok(task)
    }

    /// Close the active session for `task_id` without a task outcome.
    pub fn abandon_session(&self, task_id: &str, reason: &str) -> PilotResult<()> {
        let session = self.require_active(task_id)?;
        self.close_session(session, RunStatus::Abandoned, reason)
    }

    /// The derived profile for the claimed task.
    pub fn derived_profile(&self, task_id: &str) -> PilotResult<DerivedProfile> {
        self.require_active(task_id)?;
        self.backend.derived_profile(task_id)
    }

    /// Pull preferences from the backend into the local store.
    ///
    /// Failures are logged and the local copy stays in place.
    pub fn refresh_preferences(&self) {
        match self.backend.get_preferences() {
            Ok(Some(raw)) => {
                if let Err(err) = self.prefs.import(raw) {
                    warn!(error = %err, "backend preferences rejected; keeping local copy");
                }
            }
            Ok(None) => debug!("backend has no stored preferences"),
            Err(err) => warn!(error = %err, "could not fetch preferences"),
        }
    }

    fn require_active(&self, task_id: &str) -> PilotResult<ApplySession> {
        let session = keys::load::<ApplySession>(self.store.as_ref(), keys::ACTIVE_SESSION)?
            .filter(|s| s.active)
            .ok_or(PilotError::NoActiveSession)?;
        if session.task_id != task_id {
            return Err(PilotError::SessionMismatch {
                expected: session.task_id,
                actual: task_id.to_string(),
            });
        }
        Ok(session)
    }

    fn close_session(&self, mut session: ApplySession, status: RunStatus, reason: &str) -> PilotResult<()> {
        session.active = false;
        keys::save(self.store.as_ref(), &keys::session_record(&session.task_id), &session)?;
        self.store.remove(keys::ACTIVE_SESSION)?;

        if let Some(task) = keys::load::<Task>(self.store.as_ref(), keys::PAGE_TASK)? {
            if task.task_id == session.task_id {
                self.store.remove(keys::PAGE_TASK)?;
            }
        }

        if let Err(err) = self.backend.clear_active_session() {
            warn!(task_id = %session.task_id, error = %err, "backend active-session clear failed");
        }

        self.clear_session_overrides();

        self.emit(
            Severity::Info,
            "session_closed",
            &session.current_url,
            json!({
                "task_id": session.task_id,
                "status": status,
                "reason": reason,
                "recheck_count": session.recheck_count,
            }),
        );
        if let Err(err) = self.telemetry.end_run(status, reason) {
            warn!(task_id = %session.task_id, error = %err, "run ended with undelivered events");
        }

        info!(task_id = %session.task_id, status = %status, "apply session closed");
        Ok(())
    }

    /// Session-scoped overrides never outlive the session.
    fn clear_session_overrides(&self) {
        let mut prefs = match self.prefs.load() {
            Ok(prefs) => prefs,
            Err(err) => {
                warn!(error = %err, "could not load preferences to clear overrides");
                return;
            }
        };
        if !prefs.clear_session_overrides() {
            return;
        }
        if let Err(err) = self.prefs.save(&prefs) {
            warn!(error = %err, "could not persist cleared overrides");
            return;
        }
        if let Err(err) = self.backend.put_preferences(&prefs) {
            warn!(error = %err, "could not push cleared overrides to backend");
        }
    }

    fn emit(&self, severity: Severity, name: &str, url: &str, payload: Value) {
        self.telemetry
            .enqueue(ObservabilityEvent::new("background", severity, name, url, payload));
    }
}

impl BackgroundLink for Background {
    fn request(&self, request: BackgroundRequest) -> PilotResult<BackgroundResponse> {
        match request {
            BackgroundRequest::GetActiveSession => Ok(BackgroundResponse::Session {
                session: self.active_session()?,
            }),
            BackgroundRequest::GetTask { task_id } => Ok(BackgroundResponse::Task {
                task: self.task(&task_id)?,
            }),
            BackgroundRequest::TouchSession {
                task_id,
                url,
                platform,
                at,
            } => Ok(BackgroundResponse::Session {
                session: Some(self.touch_session(&task_id, &url, platform, at)?),
            }),
            BackgroundRequest::FetchDerivedProfile { task_id } => Ok(BackgroundResponse::Profile {
                profile: self.derived_profile(&task_id)?,
            }),
            BackgroundRequest::CompleteTask {
                task_id,
                outcome,
                reason,
            } => Ok(BackgroundResponse::Task {
                task: self.complete_task(&task_id, outcome, &reason)?,
            }),
            BackgroundRequest::AbandonSession { task_id, reason } => {
                self.abandon_session(&task_id, &reason)?;
                Ok(BackgroundResponse::Ack)
            }
            BackgroundRequest::RecordAutomationEvent {
                task_id,
                kind,
                details,
            } => {
                self.require_active(&task_id)?;
                self.backend.post_automation_event(&task_id, &kind, &details)?;
                Ok(BackgroundResponse::Ack)
            }
        }
    }
}
