//! An in-memory host for the engine.
//!
//! `VendorRig` owns the process-wide pieces (store, preferences, telemetry
//! pipeline, background). `VendorRig::open_page` builds a `PageController`
//! for one browser page around scripted host adapters whose handles stay
//! with the caller, so a scenario can change the page and read back what
//! the surface and autofill saw.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use applypilot_contracts::{
    action::{ActionKind, WorkerAction},
    error::{PilotError, PilotResult},
    guidance::{Guidance, Intent, StatusContent, StatusTone},
    page::PageSnapshot,
    platform::PlatformResult,
    prefs::AutomationPreferences,
    profile::{DerivedProfile, FillReport},
    session::ApplySession,
    stage::StageResult,
    task::{Task, TaskStatus},
};
use applypilot_core::{
    decide,
    traits::{Autofill, GuidanceProvider, PageReader, PlatformDetector, StageDetector, StatusSurface, TaskBackend},
    Background, Detectors, EngineConfig, HostAdapters, PageController, RecheckOutcome, SharedServices,
};
use applypilot_detect::{RuleStageDetector, SignalCatalogue, SignalPlatformDetector};
use applypilot_guidance::TemplateGuidance;
use applypilot_store::{JsonPreferencesStore, MemoryStore};
use applypilot_telemetry::{InMemoryTransport, TelemetryConfig, TelemetryPipeline};

use crate::fixtures::sample_profile;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Task backend ──────────────────────────────────────────────────────────────

/// What the mock backend has seen.
#[derive(Debug, Default)]
pub struct BackendState {
    pub tasks: Vec<Task>,
    /// `(task_id, to, reason)` per accepted transition.
    pub transitions: Vec<(String, TaskStatus, String)>,
    /// `(task_id, kind)` per automation event.
    pub automation_events: Vec<(String, String)>,
    pub preferences: Option<Value>,
    pub profile_requests: u32,
}

/// A task backend over a fixed list of tasks.
#[derive(Debug, Clone, Default)]
pub struct MockTaskBackend {
    pub state: Arc<Mutex<BackendState>>,
}

impl MockTaskBackend {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let backend = Self::default();
        lock(&backend.state).tasks = tasks;
        backend
    }

    pub fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        lock(&self.state)
            .tasks
            .iter()
            .find(|t| t.task_id == task_id)
            .map(|t| t.status)
    }

    fn not_found(task_id: &str) -> PilotError {
        PilotError::BackendUnavailable {
            reason: format!("404 for task '{}'", task_id),
        }
    }
}

impl TaskBackend for MockTaskBackend {
    fn next_task(&self) -> PilotResult<Option<Task>> {
        Ok(lock(&self.state)
            .tasks
            .iter()
            .find(|t| t.status == TaskStatus::Queued)
            .cloned())
    }

    fn task(&self, task_id: &str) -> PilotResult<Task> {
        lock(&self.state)
            .tasks
            .iter()
            .find(|t| t.task_id == task_id)
            .cloned()
            .ok_or_else(|| Self::not_found(task_id))
    }

    fn transition(&self, task_id: &str, to: TaskStatus, reason: &str, _details: &Value) -> PilotResult<Task> {
        let mut state = lock(&self.state);
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.task_id == task_id)
            .ok_or_else(|| Self::not_found(task_id))?;
        if !task.status.can_transition_to(to) {
            return Err(PilotError::IllegalTransition {
                from: task.status.to_string(),
                to: to.to_string(),
            });
        }
        task.status = to;
        let updated = task.clone();
        state.transitions.push((task_id.to_string(), to, reason.to_string()));
        Ok(updated)
    }

    fn active_session(&self) -> PilotResult<Option<ApplySession>> {
        Ok(None)
    }

    fn clear_active_session(&self) -> PilotResult<()> {
        Ok(())
    }

    fn derived_profile(&self, _task_id: &str) -> PilotResult<DerivedProfile> {
        lock(&self.state).profile_requests += 1;
        Ok(sample_profile())
    }

    fn get_preferences(&self) -> PilotResult<Option<Value>> {
        Ok(lock(&self.state).preferences.clone())
    }

    fn put_preferences(&self, prefs: &AutomationPreferences) -> PilotResult<()> {
        let value = serde_json::to_value(prefs).map_err(|e| PilotError::BackendUnavailable {
            reason: format!("preferences not serializable: {}", e),
        })?;
        lock(&self.state).preferences = Some(value);
        Ok(())
    }

    fn post_automation_event(&self, task_id: &str, kind: &str, _details: &Value) -> PilotResult<()> {
        lock(&self.state)
            .automation_events
            .push((task_id.to_string(), kind.to_string()));
        Ok(())
    }
}

// ── Host adapters ─────────────────────────────────────────────────────────────

/// The page the controller reads. Swap it to simulate the user moving on.
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    current: Arc<Mutex<PageSnapshot>>,
}

impl ScriptedPage {
    pub fn new(page: PageSnapshot) -> Self {
        Self {
            current: Arc::new(Mutex::new(page)),
        }
    }

    pub fn show(&self, page: PageSnapshot) {
        *lock(&self.current) = page;
    }

    pub fn url(&self) -> String {
        lock(&self.current).url.clone()
    }
}

impl PageReader for ScriptedPage {
    fn snapshot(&self) -> PilotResult<PageSnapshot> {
        Ok(lock(&self.current).clone())
    }
}

#[derive(Debug, Default)]
pub struct SurfaceState {
    pub present: bool,
    pub shown: Vec<StatusContent>,
}

/// A status surface that keeps every piece of content it was asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub state: Arc<Mutex<SurfaceState>>,
}

impl RecordingSurface {
    pub fn current(&self) -> Option<StatusContent> {
        let state = lock(&self.state);
        state.shown.last().filter(|_| state.present).cloned()
    }

    pub fn tones(&self) -> Vec<StatusTone> {
        lock(&self.state).shown.iter().map(|c| c.tone).collect()
    }

    /// Simulate the page's own scripts wiping the overlay.
    pub fn wipe(&self) {
        lock(&self.state).present = false;
    }
}

impl StatusSurface for RecordingSurface {
    fn is_present(&self) -> bool {
        lock(&self.state).present
    }

    fn render(&mut self, content: &StatusContent) -> PilotResult<()> {
        let mut state = lock(&self.state);
        state.present = true;
        state.shown.push(content.clone());
        Ok(())
    }

    fn remove(&mut self) {
        lock(&self.state).present = false;
    }
}

/// Fills every empty fillable input whose name has a profile answer.
#[derive(Debug, Clone, Default)]
pub struct ProfileAutofill {
    pub reports: Arc<Mutex<Vec<FillReport>>>,
}

impl ProfileAutofill {
    pub fn last_report(&self) -> Option<FillReport> {
        lock(&self.reports).last().cloned()
    }
}

impl Autofill for ProfileAutofill {
    fn fill(&mut self, page: &PageSnapshot, profile: &DerivedProfile) -> PilotResult<FillReport> {
        let mut report = FillReport::default();
        for input in page.fillable_inputs().filter(|i| !i.has_value) {
            report.attempted += 1;
            if profile.answers.contains_key(&input.name) {
                report.filled += 1;
            } else {
                report.skipped.push(input.name.clone());
            }
        }
        lock(&self.reports).push(report.clone());
        Ok(report)
    }
}

// ── Rig ───────────────────────────────────────────────────────────────────────

/// One browser page under a `PageController`, with the adapter handles kept.
pub struct PageHandle {
    pub controller: PageController,
    pub page: ScriptedPage,
    pub surface: RecordingSurface,
    pub autofill: ProfileAutofill,
}

impl PageHandle {
    /// Run whichever recheck is due next, advancing the clock to it.
    ///
    /// A due resume poll first becomes a debounced recheck, so this may poll
    /// twice before a pass runs.
    pub fn run_next(&mut self) -> Option<(DateTime<Utc>, RecheckOutcome)> {
        for _ in 0..2 {
            let due = self.controller.next_due()?;
            if let Some(outcome) = self.controller.poll(due) {
                return Some((due, outcome));
            }
        }
        None
    }
}

/// The process-wide pieces, built from the real crates.
pub struct VendorRig {
    pub store: MemoryStore,
    pub prefs: Arc<JsonPreferencesStore>,
    pub backend: MockTaskBackend,
    pub transport: InMemoryTransport,
    pub telemetry: Arc<TelemetryPipeline>,
    pub background: Arc<Background>,
    catalogue: SignalCatalogue,
}

impl VendorRig {
    pub fn new(tasks: Vec<Task>) -> PilotResult<Self> {
        let catalogue = SignalCatalogue::builtin()?;
        let store = MemoryStore::new();
        let prefs = Arc::new(JsonPreferencesStore::new(Arc::new(store.clone())));
        let backend = MockTaskBackend::with_tasks(tasks);
        let transport = InMemoryTransport::new();
        let telemetry = Arc::new(
            TelemetryPipeline::new(TelemetryConfig::default(), Box::new(transport.clone()))
                .with_store(Arc::new(store.clone())),
        );
        let background = Arc::new(Background::new(
            Box::new(backend.clone()),
            Arc::new(store.clone()),
            prefs.clone(),
            telemetry.clone(),
        ));
        Ok(Self {
            store,
            prefs,
            backend,
            transport,
            telemetry,
            background,
            catalogue,
        })
    }

    /// Claim the next queued task.
    pub fn claim(&self, now: DateTime<Utc>) -> PilotResult<ApplySession> {
        self.background
            .claim_next_task(now)?
            .ok_or(PilotError::NoActiveSession)
    }

    /// Put a controller on a new page showing `page`.
    pub fn open_page(&self, page: PageSnapshot) -> PageHandle {
        let scripted = ScriptedPage::new(page);
        let surface = RecordingSurface::default();
        let autofill = ProfileAutofill::default();

        let controller = PageController::new(
            EngineConfig::default(),
            self.detectors(),
            HostAdapters {
                reader: Box::new(scripted.clone()),
                surface: Box::new(surface.clone()),
                autofill: Box::new(autofill.clone()),
            },
            SharedServices {
                background: self.background.clone(),
                store: Arc::new(self.store.clone()),
                prefs: self.prefs.clone(),
                telemetry: self.telemetry.clone(),
            },
        );

        PageHandle {
            controller,
            page: scripted,
            surface,
            autofill,
        }
    }

    /// Names of every event the collector received, in order.
    pub fn delivered_events(&self) -> Vec<String> {
        lock(&self.transport.log).delivered_names()
    }

    fn detectors(&self) -> Detectors {
        Detectors {
            platform: Box::new(SignalPlatformDetector::new(self.catalogue.clone())),
            stage: Box::new(RuleStageDetector::new(self.catalogue.clone())),
            guidance: Box::new(TemplateGuidance::new()),
        }
    }
}

// ── One-off classification ────────────────────────────────────────────────────

/// One detection pass over a page, outside of any session.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub url: String,
    pub platform: PlatformResult,
    pub stage: StageResult,
    pub action: WorkerAction,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<Guidance>,
}

/// Classify `page` with the built-in catalogue as if an in-progress task
/// pointed at it.
pub fn classify_page(page: &PageSnapshot) -> PilotResult<DetectionReport> {
    let catalogue = SignalCatalogue::builtin()?;
    let platform = SignalPlatformDetector::new(catalogue.clone()).classify(page)?;
    let stage = RuleStageDetector::new(catalogue).classify(page, platform.platform_kind)?;

    let task = Task {
        task_id: "task-inspect".to_string(),
        job_id: "job-inspect".to_string(),
        destination_url: page.url.clone(),
        status: TaskStatus::InProgress,
        company: None,
        job_title: None,
    };
    let action = decide(&task, &platform, &stage);

    let guidance_provider = TemplateGuidance::new();
    let intent = guidance_provider.intent(&platform, &stage);
    let guidance = (action.action == ActionKind::PauseNeedsUser).then(|| {
        let session = ApplySession::open(&task.task_id, &task.job_id, &page.url, Utc::now());
        guidance_provider.guidance(intent, &platform, &stage, &session)
    });

    Ok(DetectionReport {
        url: page.url.clone(),
        platform,
        stage,
        action,
        intent,
        guidance,
    })
}
