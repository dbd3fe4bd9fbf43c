//! In-memory doubles shared by the unit tests of this crate.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use applypilot_contracts::{
    error::{PilotError, PilotResult},
    evidence::Evidence,
    guidance::{Guidance, Intent, StatusContent, StatusTone},
    page::{ButtonKind, InputField, PageButton, PageSnapshot},
    platform::{Confidence, PlatformKind, PlatformResult},
    prefs::AutomationPreferences,
    profile::{DerivedProfile, FillReport},
    session::ApplySession,
    stage::{Stage, StageResult},
    task::{Task, TaskStatus},
    telemetry::{ObservabilityEvent, RunStatus},
};

use crate::traits::{
    Autofill, GuidanceProvider, PageReader, PlatformDetector, PreferencesStore, SessionStore,
    StageDetector, StatusSurface, TaskBackend, TelemetrySink,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn task(task_id: &str, status: TaskStatus) -> Task {
    Task {
        task_id: task_id.to_string(),
        job_id: format!("job-{task_id}"),
        destination_url: format!("https://jobs.lever.co/acme/{task_id}"),
        status,
        company: Some("Acme".to_string()),
        job_title: Some("Engineer".to_string()),
    }
}

// ── Pages ────────────────────────────────────────────────────────────────────

pub fn login_page(url: &str) -> PageSnapshot {
    PageSnapshot {
        url: url.to_string(),
        title: "Sign in".to_string(),
        visible_text: "Sign in to continue your application".to_string(),
        inputs: vec![
            InputField::visible("email", "email"),
            InputField::visible("password", "password"),
        ],
        buttons: vec![PageButton::visible("Sign In", ButtonKind::Submit)],
        ..Default::default()
    }
}

pub fn form_page(url: &str) -> PageSnapshot {
    PageSnapshot {
        url: url.to_string(),
        title: "Apply".to_string(),
        visible_text: "Tell us about yourself".to_string(),
        inputs: vec![
            InputField::visible("text", "first_name"),
            InputField::visible("text", "last_name"),
            InputField::visible("email", "email"),
        ],
        buttons: vec![PageButton::visible("Next", ButtonKind::Button)],
        ..Default::default()
    }
}

pub fn submitted_page(url: &str) -> PageSnapshot {
    PageSnapshot {
        url: url.to_string(),
        title: "Thanks".to_string(),
        visible_text: "Application submitted".to_string(),
        ..Default::default()
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    pub entries: Mutex<HashMap<String, Value>>,
}

impl MemStore {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl SessionStore for MemStore {
    fn get(&self, key: &str) -> PilotResult<Option<Value>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> PilotResult<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> PilotResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemPrefs {
    pub prefs: Mutex<AutomationPreferences>,
}

impl MemPrefs {
    pub fn with(prefs: AutomationPreferences) -> Self {
        Self {
            prefs: Mutex::new(prefs),
        }
    }
}

impl PreferencesStore for MemPrefs {
    fn load(&self) -> PilotResult<AutomationPreferences> {
        Ok(self.prefs.lock().unwrap().clone())
    }

    fn save(&self, prefs: &AutomationPreferences) -> PilotResult<()> {
        *self.prefs.lock().unwrap() = prefs.clone();
        Ok(())
    }

    fn import(&self, raw: Value) -> PilotResult<AutomationPreferences> {
        let prefs: AutomationPreferences =
            serde_json::from_value(raw).map_err(|e| PilotError::SchemaValidation { reason: e.to_string() })?;
        self.save(&prefs)?;
        Ok(prefs)
    }
}

// ── Telemetry ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct TelemetryLog {
    pub events: Vec<ObservabilityEvent>,
    pub runs_started: Vec<String>,
    pub runs_ended: Vec<(RunStatus, String)>,
    pub teardowns: u32,
}

/// Records every call; shared with the test through an `Arc`.
#[derive(Clone, Default)]
pub struct RecordingTelemetry {
    pub log: Arc<Mutex<TelemetryLog>>,
}

impl RecordingTelemetry {
    pub fn names(&self) -> Vec<String> {
        self.log.lock().unwrap().events.iter().map(|e| e.event_name.clone()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| n.as_str() == name).count()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn start_run(&self, task_id: &str, _job_id: &str) -> PilotResult<String> {
        let run_id = format!("run-{task_id}");
        self.log.lock().unwrap().runs_started.push(run_id.clone());
        Ok(run_id)
    }

    fn enqueue(&self, event: ObservabilityEvent) {
        self.log.lock().unwrap().events.push(event);
    }

    fn flush(&self) -> PilotResult<usize> {
        Ok(0)
    }

    fn end_run(&self, status: RunStatus, reason: &str) -> PilotResult<()> {
        self.log.lock().unwrap().runs_ended.push((status, reason.to_string()));
        Ok(())
    }

    fn teardown(&self) {
        self.log.lock().unwrap().teardowns += 1;
    }

    fn current_run_id(&self) -> Option<String> {
        self.log.lock().unwrap().runs_started.last().cloned()
    }
}

// ── Backend ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct BackendState {
    pub queue: Vec<Task>,
    pub tasks: BTreeMap<String, Task>,
    pub transitions: Vec<(String, TaskStatus, String)>,
    pub automation_events: Vec<(String, String)>,
    pub remote_prefs: Option<Value>,
    pub pushed_prefs: Vec<AutomationPreferences>,
    pub remote_session: Option<ApplySession>,
    pub clears: u32,
    /// `clear_active_session` fails while everything else works.
    pub failing_clears: bool,
    pub offline: bool,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    pub state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    pub fn with_queue(tasks: Vec<Task>) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            for task in &tasks {
                state.tasks.insert(task.task_id.clone(), task.clone());
            }
            state.queue = tasks;
        }
        backend
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    fn check(&self) -> PilotResult<()> {
        if self.state.lock().unwrap().offline {
            return Err(PilotError::BackendUnavailable {
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

impl TaskBackend for MockBackend {
    fn next_task(&self) -> PilotResult<Option<Task>> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if state.queue.is_empty() {
            return Ok(None);
        }
        Ok(Some(state.queue.remove(0)))
    }

    fn task(&self, task_id: &str) -> PilotResult<Task> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| PilotError::BackendUnavailable {
                reason: format!("no task '{task_id}'"),
            })
    }

    fn transition(&self, task_id: &str, to: TaskStatus, reason: &str, _details: &Value) -> PilotResult<Task> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.transitions.push((task_id.to_string(), to, reason.to_string()));
        let task = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| PilotError::BackendUnavailable {
                reason: format!("no task '{task_id}'"),
            })?;
        task.status = to;
        Ok(task.clone())
    }

    fn active_session(&self) -> PilotResult<Option<ApplySession>> {
        self.check()?;
        Ok(self.state.lock().unwrap().remote_session.clone())
    }

    fn clear_active_session(&self) -> PilotResult<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if state.failing_clears {
            return Err(PilotError::BackendUnavailable {
                reason: "active-session delete timed out".to_string(),
            });
        }
        state.remote_session = None;
        state.clears += 1;
        Ok(())
    }

    fn derived_profile(&self, _task_id: &str) -> PilotResult<DerivedProfile> {
        self.check()?;
        let mut answers = BTreeMap::new();
        answers.insert("first_name".to_string(), "Ada".to_string());
        answers.insert("email".to_string(), "ada@example.com".to_string());
        Ok(DerivedProfile { answers })
    }

    fn get_preferences(&self) -> PilotResult<Option<Value>> {
        self.check()?;
        Ok(self.state.lock().unwrap().remote_prefs.clone())
    }

    fn put_preferences(&self, prefs: &AutomationPreferences) -> PilotResult<()> {
        self.check()?;
        self.state.lock().unwrap().pushed_prefs.push(prefs.clone());
        Ok(())
    }

    fn post_automation_event(&self, task_id: &str, kind: &str, _details: &Value) -> PilotResult<()> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .automation_events
            .push((task_id.to_string(), kind.to_string()));
        Ok(())
    }
}

// ── Host adapters ────────────────────────────────────────────────────────────

/// A page the test can swap out between passes.
#[derive(Clone)]
pub struct SharedPage {
    pub page: Arc<Mutex<Option<PageSnapshot>>>,
}

impl SharedPage {
    pub fn new(page: PageSnapshot) -> Self {
        Self {
            page: Arc::new(Mutex::new(Some(page))),
        }
    }

    pub fn set(&self, page: PageSnapshot) {
        *self.page.lock().unwrap() = Some(page);
    }

    /// Make the next reads fail.
    pub fn break_reads(&self) {
        *self.page.lock().unwrap() = None;
    }
}

impl PageReader for SharedPage {
    fn snapshot(&self) -> PilotResult<PageSnapshot> {
        self.page.lock().unwrap().clone().ok_or_else(|| PilotError::PageRead {
            reason: "document detached".to_string(),
        })
    }
}

#[derive(Default)]
pub struct SurfaceLog {
    pub present: bool,
    pub renders: Vec<StatusContent>,
    pub removals: u32,
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn last_tone(&self) -> Option<StatusTone> {
        self.log.lock().unwrap().renders.last().map(|c| c.tone)
    }

    pub fn render_count(&self) -> usize {
        self.log.lock().unwrap().renders.len()
    }

    /// Simulate the host page wiping the overlay.
    pub fn detach(&self) {
        self.log.lock().unwrap().present = false;
    }
}

impl StatusSurface for RecordingSurface {
    fn is_present(&self) -> bool {
        self.log.lock().unwrap().present
    }

    fn render(&mut self, content: &StatusContent) -> PilotResult<()> {
        let mut log = self.log.lock().unwrap();
        log.present = true;
        log.renders.push(content.clone());
        Ok(())
    }

    fn remove(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.present = false;
        log.removals += 1;
    }
}

#[derive(Clone, Default)]
pub struct CountingAutofill {
    pub calls: Arc<Mutex<u32>>,
}

impl Autofill for CountingAutofill {
    fn fill(&mut self, page: &PageSnapshot, profile: &DerivedProfile) -> PilotResult<FillReport> {
        *self.calls.lock().unwrap() += 1;
        let names: Vec<String> = page.fillable_inputs().map(|i| i.name.clone()).collect();
        let filled = names.iter().filter(|n| profile.answers.contains_key(*n)).count() as u32;
        Ok(FillReport {
            attempted: names.len() as u32,
            filled,
            skipped: names.into_iter().filter(|n| !profile.answers.contains_key(n)).collect(),
        })
    }
}

// ── Detectors ────────────────────────────────────────────────────────────────

/// Always reports Lever with high confidence.
pub struct FixedPlatform;

impl PlatformDetector for FixedPlatform {
    fn classify(&self, _page: &PageSnapshot) -> PilotResult<PlatformResult> {
        Ok(PlatformResult {
            platform_kind: PlatformKind::Lever,
            confidence: Confidence::High,
            evidence: vec![Evidence::new("host_match", "jobs.lever.co")],
        })
    }
}

/// A crude stage heuristic; fails on pages mentioning "explode".
pub struct SimpleStage;

impl StageDetector for SimpleStage {
    fn classify(&self, page: &PageSnapshot, _platform: PlatformKind) -> PilotResult<StageResult> {
        let text = page.visible_text.to_lowercase();
        if text.contains("explode") {
            return Err(PilotError::Classification {
                reason: "selector engine crashed".to_string(),
            });
        }
        let stage = if text.contains("submitted") {
            Stage::Submitted
        } else if page.has_password_field() {
            Stage::LoginRequired
        } else if page.fillable_inputs().count() >= 2 {
            Stage::FormFilling
        } else {
            Stage::Unknown
        };
        Ok(StageResult {
            stage,
            confidence: Confidence::High,
            evidence: vec![Evidence::new("stage", stage.as_str())],
        })
    }
}

pub struct PlainGuidance;

impl PlainGuidance {
    fn content(&self, title: &str, session: &ApplySession, tone: StatusTone) -> StatusContent {
        StatusContent {
            title: title.to_string(),
            progress: format!("step {}", session.recheck_count),
            instruction: String::new(),
            reassurance: String::new(),
            what_next: String::new(),
            task_id: session.task_id.clone(),
            job_id: session.job_id.clone(),
            tone,
        }
    }
}

impl GuidanceProvider for PlainGuidance {
    fn intent(&self, _platform: &PlatformResult, stage: &StageResult) -> Intent {
        match stage.stage {
            Stage::LoginRequired => Intent::Login,
            _ => Intent::Unclassifiable,
        }
    }

    fn guidance(&self, intent: Intent, _platform: &PlatformResult, _stage: &StageResult, session: &ApplySession) -> Guidance {
        Guidance {
            title: format!("Paused: {intent}"),
            what_happening: String::new(),
            user_action: String::new(),
            what_next: String::new(),
            intent,
            task_id: session.task_id.clone(),
            job_id: session.job_id.clone(),
        }
    }

    fn checking(&self, session: &ApplySession) -> StatusContent {
        self.content("Checking", session, StatusTone::Working)
    }

    fn paused(&self, guidance: &Guidance, session: &ApplySession) -> StatusContent {
        self.content(&guidance.title, session, StatusTone::Paused)
    }

    fn working(&self, _platform: &PlatformResult, session: &ApplySession) -> StatusContent {
        self.content("Working", session, StatusTone::Working)
    }

    fn awaiting_confirmation(&self, _platform: &PlatformResult, session: &ApplySession) -> StatusContent {
        self.content("Confirm", session, StatusTone::Attention)
    }

    fn fallback(&self, session: &ApplySession) -> StatusContent {
        self.content("Continue manually", session, StatusTone::Fallback)
    }
}
