//! The page controller: one instance per page context.
//!
//! The controller turns host events into debounced rechecks and runs the
//! detection pipeline for each one:
//!
//! ```text
//! trigger → active session? → ensure surface → read page → signature
//!         → (dedup) → platform → stage → decide → touch session
//!         → render → autofill / automation events → telemetry → persist
//! ```
//!
//! Execution is strictly sequential. The host drives time by calling
//! `poll(now)`, so at most one pass is ever in flight and a pass never
//! interleaves with another.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use applypilot_contracts::{
    action::{ActionKind, WorkerAction},
    error::{PilotError, PilotResult},
    guidance::{Guidance, StatusContent},
    page::PageSnapshot,
    platform::{PlatformKind, PlatformResult},
    prefs::AutomationPreferences,
    profile::FillReport,
    session::{ApplySession, RecheckTrigger, TriggerCategory},
    snapshot::DetectionSnapshot,
    stage::{Stage, StageResult},
    task::{Task, TaskStatus},
    telemetry::{ObservabilityEvent, Severity},
};

use crate::{
    background::{BackgroundLink, BackgroundRequest, BackgroundResponse},
    config::EngineConfig,
    decision::decide,
    keys,
    scheduler::RecheckScheduler,
    signature,
    traits::{
        Autofill, GuidanceProvider, PageReader, PlatformDetector, PreferencesStore, SessionStore,
        StageDetector, StatusSurface, TelemetrySink,
    },
};

/// How a history navigation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Push,
    Replace,
    Pop,
}

/// Something the host observed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A full document load finished.
    PageLoaded { url: String },
    /// Single-page navigation without a reload.
    NavigationObserved { kind: NavigationKind, url: String },
    VisibilityChanged { visible: bool },
    /// A batch of content mutations.
    ContentMutated { mutations: u32 },
    /// The user asked for a recheck from the control surface.
    ManualRecheck,
    /// The page is about to go away.
    PageUnloading,
}

/// The result of one recheck.
#[derive(Debug, Clone, PartialEq)]
pub enum RecheckOutcome {
    /// No active session; the page is not part of an application.
    Idle,
    /// The page has not changed since the last executed pass.
    Deduplicated { signature: String },
    /// A full pass ran.
    Completed {
        platform: PlatformKind,
        stage: Stage,
        action: ActionKind,
        /// The previous pass paused and this one continues.
        resumed: bool,
    },
    /// The pipeline failed; fallback guidance is on screen.
    Fallback { reason: String },
    /// A transient failure; the next trigger retries.
    Abandoned { reason: String },
}

/// The pure classifiers and the guidance lookup.
pub struct Detectors {
    pub platform: Box<dyn PlatformDetector>,
    pub stage: Box<dyn StageDetector>,
    pub guidance: Box<dyn GuidanceProvider>,
}

/// Adapters the host provides for its own page.
pub struct HostAdapters {
    pub reader: Box<dyn PageReader>,
    pub surface: Box<dyn StatusSurface>,
    pub autofill: Box<dyn Autofill>,
}

/// Services shared with the background context.
#[derive(Clone)]
pub struct SharedServices {
    pub background: Arc<dyn BackgroundLink>,
    pub store: Arc<dyn SessionStore>,
    pub prefs: Arc<dyn PreferencesStore>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

pub struct PageController {
    config: EngineConfig,
    detectors: Detectors,
    host: HostAdapters,
    shared: SharedServices,
    scheduler: RecheckScheduler,
    session: Option<ApplySession>,
    last_signature: Option<String>,
    last_action: Option<ActionKind>,
    last_content: Option<StatusContent>,
    last_snapshot: Option<DetectionSnapshot>,
    telemetry_enabled: bool,
    passes: u64,
}

impl PageController {
    pub fn new(config: EngineConfig, detectors: Detectors, host: HostAdapters, shared: SharedServices) -> Self {
        let scheduler = RecheckScheduler::new(&config);
        Self {
            config,
            detectors,
            host,
            shared,
            scheduler,
            session: None,
            last_signature: None,
            last_action: None,
            last_content: None,
            last_snapshot: None,
            telemetry_enabled: true,
            passes: 0,
        }
    }

    /// Attach to a freshly loaded page.
    ///
    /// Restores the active session (if any), puts the status surface back on
    /// the page, and schedules the first pass after the settle delay.
    pub fn attach(&mut self, now: DateTime<Utc>) -> PilotResult<Option<ApplySession>> {
        let session = self.fetch_active_session()?;
        // Surface events below must already honour the stored opt-out.
        self.telemetry_enabled = self.load_prefs().global.telemetry_enabled;
        match &session {
            Some(session) => {
                info!(task_id = %session.task_id, url = %session.current_url, "attached to active session");
                self.ensure_surface(session);
                self.scheduler.schedule_page_load(now);
            }
            None => debug!("no active session; page is idle"),
        }
        self.session = session.clone();
        Ok(session)
    }

    /// Feed a host event into the scheduler.
    pub fn handle_host_event(&mut self, event: HostEvent, now: DateTime<Utc>) {
        match event {
            HostEvent::PageLoaded { url } => {
                debug!(url = %url, "page loaded");
                self.scheduler.schedule_page_load(now);
            }
            HostEvent::NavigationObserved { kind, url } => {
                debug!(url = %url, kind = ?kind, "history navigation");
                self.trigger(TriggerCategory::Navigation, now);
            }
            HostEvent::VisibilityChanged { visible: true } => self.trigger(TriggerCategory::Visibility, now),
            HostEvent::VisibilityChanged { visible: false } => {}
            HostEvent::ContentMutated { mutations } if mutations > 0 => {
                self.trigger(TriggerCategory::Mutation, now)
            }
            HostEvent::ContentMutated { .. } => {}
            HostEvent::ManualRecheck => self.trigger(TriggerCategory::Manual, now),
            HostEvent::PageUnloading => {
                debug!("page unloading; flushing telemetry");
                self.shared.telemetry.teardown();
            }
        }
    }

    /// Run the recheck that is due at `now`, if any.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<RecheckOutcome> {
        let trigger = self.scheduler.take_due(now)?;
        Some(self.recheck(trigger))
    }

    /// When the host should call `poll` next.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.scheduler.next_due()
    }

    /// Run one pass immediately, bypassing the debounce.
    pub fn recheck(&mut self, trigger: RecheckTrigger) -> RecheckOutcome {
        let outcome = self.run_pass(trigger);

        let paused = self.session.is_some() && self.last_action == Some(ActionKind::PauseNeedsUser);
        if paused {
            self.scheduler.arm_resume_poll(trigger.at);
        } else {
            self.scheduler.disarm_resume_poll();
        }
        outcome
    }

    /// Confirm the application outcome from the control surface.
    pub fn complete_task(&mut self, outcome: TaskStatus, reason: &str) -> PilotResult<Task> {
        let task_id = self.session_task_id()?;
        let response = self.shared.background.request(BackgroundRequest::CompleteTask {
            task_id,
            outcome,
            reason: reason.to_string(),
        })?;
        let task = match response {
            BackgroundResponse::Task { task } => task,
            other => return Err(unexpected(&other)),
        };
        self.close_session();
        Ok(task)
    }

    /// The user walked away from the application.
    pub fn abandon(&mut self, reason: &str) -> PilotResult<()> {
        let task_id = self.session_task_id()?;
        self.shared.background.request(BackgroundRequest::AbandonSession {
            task_id,
            reason: reason.to_string(),
        })?;
        self.close_session();
        Ok(())
    }

    /// Tear down page-level state after the session ended.
    ///
    /// Cancels every pending timer and removes the status surface.
    pub fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            info!(task_id = %session.task_id, "page controller released session");
        }
        self.scheduler.cancel();
        self.host.surface.remove();
        self.last_signature = None;
        self.last_action = None;
        self.last_content = None;
    }

    /// Whether a task update belongs to this page's session.
    ///
    /// Responses for any other task are stale and must be discarded.
    pub fn accept_task_update(&self, task: &Task) -> bool {
        match &self.session {
            Some(session) if session.task_id == task.task_id => true,
            _ => {
                debug!(task_id = %task.task_id, "discarding stale task update");
                false
            }
        }
    }

    /// The most recent detection pass, for the debug accessor.
    pub fn debug_snapshot(&self) -> Option<&DetectionSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn session(&self) -> Option<&ApplySession> {
        self.session.as_ref()
    }

    /// Number of passes that ran the classifiers.
    pub fn classification_passes(&self) -> u64 {
        self.passes
    }

    pub fn is_resume_polling(&self) -> bool {
        self.scheduler.is_polling()
    }

    fn trigger(&mut self, category: TriggerCategory, at: DateTime<Utc>) {
        self.scheduler.schedule(RecheckTrigger { category, at });
    }

    fn run_pass(&mut self, trigger: RecheckTrigger) -> RecheckOutcome {
        let session = match self.fetch_active_session() {
            Ok(Some(session)) => session,
            Ok(None) => {
                if self.session.is_some() {
                    self.close_session();
                }
                return RecheckOutcome::Idle;
            }
            Err(err) => {
                warn!(error = %err, "could not reach background; retrying on next trigger");
                return RecheckOutcome::Abandoned {
                    reason: err.to_string(),
                };
            }
        };

        let same_task = self.session.as_ref().map(|s| s.task_id.as_str()) == Some(session.task_id.as_str());
        if !same_task {
            self.last_signature = None;
            self.last_action = None;
            self.last_content = None;
        }
        self.session = Some(session.clone());

        // The surface is restored even when the pass turns out to be a duplicate.
        self.ensure_surface(&session);

        let page = match self.host.reader.snapshot() {
            Ok(page) => page,
            Err(err) => return self.fail_safe(&session, &session.current_url, &err),
        };

        let page_type = signature::page_type(&page);
        let sig = signature::recheck_signature(&page.url, &page_type, &session.task_id);
        if self.last_signature.as_deref() == Some(sig.as_str()) {
            debug!(
                task_id = %session.task_id,
                trigger = %trigger.category,
                "page unchanged since last pass; skipping"
            );
            return RecheckOutcome::Deduplicated { signature: sig };
        }

        match self.classify_and_act(&session, &page, trigger, &sig) {
            Ok(outcome) => outcome,
            Err(err @ PilotError::BackendUnavailable { .. }) => {
                warn!(error = %err, "backend unavailable mid-pass; retrying on next trigger");
                RecheckOutcome::Abandoned {
                    reason: err.to_string(),
                }
            }
            Err(err @ (PilotError::SessionMismatch { .. } | PilotError::NoActiveSession)) => {
                info!(error = %err, "session changed during pass; discarding result");
                self.session = None;
                RecheckOutcome::Abandoned {
                    reason: err.to_string(),
                }
            }
            Err(err) => {
                // Recording the signature keeps a mutation storm on a broken
                // page from re-running the failing pipeline.
                self.last_signature = Some(sig);
                self.fail_safe(&session, &page.url, &err)
            }
        }
    }

    fn classify_and_act(
        &mut self,
        session: &ApplySession,
        page: &PageSnapshot,
        trigger: RecheckTrigger,
        sig: &str,
    ) -> PilotResult<RecheckOutcome> {
        self.passes += 1;

        let platform = self.detectors.platform.classify(page)?;
        let stage = self.detectors.stage.classify(page, platform.platform_kind)?;
        let task = self.fetch_task(&session.task_id)?;
        let action = decide(&task, &platform, &stage);

        let session = self.touch(&session.task_id, &page.url, platform.platform_kind, trigger.at)?;
        self.session = Some(session.clone());

        let prefs = self.load_prefs();
        self.telemetry_enabled = prefs.global.telemetry_enabled;

        let previous = self.last_action;
        let resumed = previous == Some(ActionKind::PauseNeedsUser) && action.action == ActionKind::Continue;

        info!(
            task_id = %session.task_id,
            trigger = %trigger.category,
            platform = %platform.platform_kind,
            stage = %stage.stage,
            action = %action.action,
            "detection pass"
        );

        let mut guidance: Option<Guidance> = None;
        let mut fill: Option<FillReport> = None;
        match action.action {
            ActionKind::PauseNeedsUser => {
                let intent = self.detectors.guidance.intent(&platform, &stage);
                let paused = self.detectors.guidance.guidance(intent, &platform, &stage, &session);
                let content = self.detectors.guidance.paused(&paused, &session);
                self.show(content);
                if previous != Some(ActionKind::PauseNeedsUser) {
                    self.automation_event(
                        &session.task_id,
                        "paused",
                        json!({ "stage": stage.stage, "intent": intent, "reason": action.reason }),
                    );
                }
                guidance = Some(paused);
            }
            ActionKind::Continue => {
                let content = self.detectors.guidance.working(&platform, &session);
                self.show(content);
                if resumed {
                    info!(task_id = %session.task_id, "user cleared the blocker; resuming");
                    self.automation_event(&session.task_id, "resumed", json!({ "stage": stage.stage }));
                    self.emit(
                        Severity::Info,
                        "session_resumed",
                        &page.url,
                        json!({ "stage": stage.stage, "recheck_count": session.recheck_count }),
                    );
                }
                fill = self.run_autofill(&session, page, &prefs);
            }
            ActionKind::Noop => {
                let content = self.detectors.guidance.awaiting_confirmation(&platform, &session);
                self.show(content);
                if previous != Some(ActionKind::Noop) && stage.stage == Stage::Submitted {
                    self.automation_event(&session.task_id, "submission_detected", json!({ "url": page.url }));
                }
            }
        }

        self.emit(
            Severity::Info,
            "detection_pass",
            &page.url,
            pass_payload(trigger, &platform, &stage, &action, &session, sig, fill.as_ref()),
        );

        let snapshot = DetectionSnapshot {
            task_id: session.task_id.clone(),
            url: page.url.clone(),
            platform: platform.clone(),
            stage: stage.clone(),
            action: action.clone(),
            guidance,
            signature: sig.to_string(),
            trigger: trigger.category,
            recheck_count: session.recheck_count,
            captured_at: trigger.at,
        };
        if let Err(err) = keys::save(self.shared.store.as_ref(), keys::DETECTION_SNAPSHOT, &snapshot) {
            warn!(error = %err, "could not persist detection snapshot");
        }
        self.last_snapshot = Some(snapshot);
        self.last_signature = Some(sig.to_string());
        self.last_action = Some(action.action);

        Ok(RecheckOutcome::Completed {
            platform: platform.platform_kind,
            stage: stage.stage,
            action: action.action,
            resumed,
        })
    }

    fn run_autofill(
        &mut self,
        session: &ApplySession,
        page: &PageSnapshot,
        prefs: &AutomationPreferences,
    ) -> Option<FillReport> {
        if !prefs.autofill_enabled_for(&session.task_id) {
            debug!(task_id = %session.task_id, "autofill disabled by preferences");
            return None;
        }

        let request = BackgroundRequest::FetchDerivedProfile {
            task_id: session.task_id.clone(),
        };
        let profile = match self.shared.background.request(request) {
            Ok(BackgroundResponse::Profile { profile }) => profile,
            Ok(other) => {
                warn!(error = %unexpected(&other), "derived profile request answered oddly");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "derived profile unavailable; skipping autofill");
                self.emit(
                    Severity::Warning,
                    "autofill_skipped",
                    &page.url,
                    json!({ "reason": err.to_string() }),
                );
                return None;
            }
        };

        match self.host.autofill.fill(page, &profile) {
            Ok(report) => {
                self.emit(
                    Severity::Info,
                    "autofill_completed",
                    &page.url,
                    json!({
                        "attempted": report.attempted,
                        "filled": report.filled,
                        "skipped": report.skipped.len(),
                        "fill_rate": report.fill_rate(),
                    }),
                );
                Some(report)
            }
            Err(err) => {
                warn!(error = %err, "autofill failed");
                self.emit(
                    Severity::Warning,
                    "autofill_failed",
                    &page.url,
                    json!({ "reason": err.to_string() }),
                );
                None
            }
        }
    }

    fn fail_safe(&mut self, session: &ApplySession, url: &str, err: &PilotError) -> RecheckOutcome {
        warn!(task_id = %session.task_id, error = %err, "detection pipeline failed; showing fallback");
        let content = self.detectors.guidance.fallback(session);
        self.show(content);
        self.emit(
            Severity::Error,
            "pipeline_failed",
            url,
            json!({ "reason": err.to_string() }),
        );
        RecheckOutcome::Fallback {
            reason: err.to_string(),
        }
    }

    fn ensure_surface(&mut self, session: &ApplySession) {
        if self.host.surface.is_present() {
            return;
        }
        let had_content = self.last_content.is_some();
        let content = match &self.last_content {
            Some(content) => content.clone(),
            None => self.detectors.guidance.checking(session),
        };
        if let Err(err) = self.host.surface.render(&content) {
            warn!(error = %err, "could not recreate status surface");
            return;
        }
        if had_content {
            debug!(task_id = %session.task_id, "status surface recreated");
            self.emit(
                Severity::Warning,
                "overlay_recreated",
                &session.current_url,
                json!({ "tone": content.tone }),
            );
        } else {
            self.emit(
                Severity::Info,
                "overlay_shown",
                &session.current_url,
                json!({ "tone": content.tone }),
            );
        }
        self.last_content = Some(content);
    }

    fn show(&mut self, content: StatusContent) {
        if let Err(err) = self.host.surface.render(&content) {
            warn!(error = %err, "status surface render failed");
        }
        self.last_content = Some(content);
    }

    fn emit(&self, severity: Severity, name: &str, url: &str, payload: Value) {
        if !self.telemetry_enabled {
            return;
        }
        self.shared.telemetry.enqueue(ObservabilityEvent::new(
            self.config.source.as_str(),
            severity,
            name,
            url,
            payload,
        ));
    }

    fn automation_event(&self, task_id: &str, kind: &str, details: Value) {
        let request = BackgroundRequest::RecordAutomationEvent {
            task_id: task_id.to_string(),
            kind: kind.to_string(),
            details,
        };
        if let Err(err) = self.shared.background.request(request) {
            warn!(kind = %kind, error = %err, "automation event not recorded");
        }
    }

    fn load_prefs(&self) -> AutomationPreferences {
        self.shared.prefs.load().unwrap_or_else(|err| {
            warn!(error = %err, "preferences unreadable; using defaults");
            AutomationPreferences::default()
        })
    }

    fn fetch_active_session(&self) -> PilotResult<Option<ApplySession>> {
        match self.shared.background.request(BackgroundRequest::GetActiveSession)? {
            BackgroundResponse::Session { session } => Ok(session),
            other => Err(unexpected(&other)),
        }
    }

    fn fetch_task(&self, task_id: &str) -> PilotResult<Task> {
        let request = BackgroundRequest::GetTask {
            task_id: task_id.to_string(),
        };
        match self.shared.background.request(request)? {
            BackgroundResponse::Task { task } if task.task_id == task_id => Ok(task),
            BackgroundResponse::Task { task } => Err(PilotError::SessionMismatch {
                expected: task_id.to_string(),
                actual: task.task_id,
            }),
            other => Err(unexpected(&other)),
        }
    }

    fn touch(&self, task_id: &str, url: &str, platform: PlatformKind, at: DateTime<Utc>) -> PilotResult<ApplySession> {
        let request = BackgroundRequest::TouchSession {
            task_id: task_id.to_string(),
            url: url.to_string(),
            platform,
            at,
        };
        match self.shared.background.request(request)? {
            BackgroundResponse::Session { session: Some(session) } => Ok(session),
            BackgroundResponse::Session { session: None } => Err(PilotError::NoActiveSession),
            other => Err(unexpected(&other)),
        }
    }

    fn session_task_id(&self) -> PilotResult<String> {
        self.session
            .as_ref()
            .map(|s| s.task_id.clone())
            .ok_or(PilotError::NoActiveSession)
    }
}

fn unexpected(response: &BackgroundResponse) -> PilotError {
    PilotError::BackendUnavailable {
        reason: format!("unexpected background response: {:?}", response),
    }
}

fn pass_payload(
    trigger: RecheckTrigger,
    platform: &PlatformResult,
    stage: &StageResult,
    action: &WorkerAction,
    session: &ApplySession,
    sig: &str,
    fill: Option<&FillReport>,
) -> Value {
    json!({
        "task_id": session.task_id,
        "trigger": trigger.category,
        "platform": platform.platform_kind,
        "platform_confidence": platform.confidence,
        "stage": stage.stage,
        "stage_confidence": stage.confidence,
        "action": action.action,
        "reason": action.reason,
        "evidence_count": platform.evidence.len() + stage.evidence.len(),
        "recheck_count": session.recheck_count,
        "signature": sig,
        "fill_rate": fill.map(FillReport::fill_rate),
    })
}
