//! `TelemetryPipeline`: the `TelemetrySink` the engine talks to.
//!
//! One run is open at a time. Events are stamped and redacted on `enqueue`,
//! held in a bounded `EventQueue`, and delivered in batches by `flush`. When
//! a session store is attached the queue is mirrored under
//! `applypilot.telemetry_queue.<run_id>` so a page reload does not lose it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use applypilot_contracts::{
    error::PilotResult,
    telemetry::{ObservabilityEvent, Run, RunStatus, Severity},
};
use applypilot_core::{
    keys,
    traits::{SessionStore, TelemetrySink},
};

use crate::{config::TelemetryConfig, queue::EventQueue, redact::redact_event, transport::TelemetryTransport};

/// Counters for the open run and the lifetime of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetryStats {
    pub queued: usize,
    pub delivered: u64,
    /// Events dropped to the queue cap (the `queue_overflow` counter).
    pub queue_overflow: u64,
}

struct PipelineState {
    run: Option<Run>,
    queue: EventQueue,
    delivered: u64,
}

pub struct TelemetryPipeline {
    config: TelemetryConfig,
    transport: Box<dyn TelemetryTransport>,
    store: Option<Arc<dyn SessionStore>>,
    state: Mutex<PipelineState>,
}

impl TelemetryPipeline {
    /// Zero sizes are raised to one; only `TelemetryConfig::from_toml_str`
    /// rejects them outright.
    pub fn new(mut config: TelemetryConfig, transport: Box<dyn TelemetryTransport>) -> Self {
        config.queue_cap = config.queue_cap.max(1);
        config.batch_size = config.batch_size.max(1);
        let queue = EventQueue::new(config.queue_cap);
        Self {
            config,
            transport,
            store: None,
            state: Mutex::new(PipelineState {
                run: None,
                queue,
                delivered: 0,
            }),
        }
    }

    /// Mirror the queue into `store`. Ignored when `persist_queue` is off.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        if self.config.persist_queue {
            self.store = Some(store);
        }
        self
    }

    /// Re-open `run` in a fresh page context and restore its persisted queue.
    ///
    /// Any run already open here is replaced without being ended; the run
    /// belongs to whichever context resumed it last.
    pub fn resume_run(&self, run: Run) -> PilotResult<usize> {
        let restored: Vec<ObservabilityEvent> = match &self.store {
            Some(store) => keys::load(store.as_ref(), &keys::telemetry_queue(&run.run_id))?.unwrap_or_default(),
            None => Vec::new(),
        };

        let mut state = self.lock();
        let dropped = state.queue.restore(restored);
        if dropped > 0 {
            warn!(run_id = %run.run_id, dropped, "persisted telemetry queue exceeded cap");
        }
        let count = state.queue.len();
        info!(run_id = %run.run_id, restored = count, "telemetry run resumed");
        state.run = Some(run);
        Ok(count)
    }

    pub fn stats(&self) -> TelemetryStats {
        let state = self.lock();
        TelemetryStats {
            queued: state.queue.len(),
            delivered: state.delivered,
            queue_overflow: state.queue.dropped(),
        }
    }

    /// The open run, if any.
    pub fn current_run(&self) -> Option<Run> {
        self.lock().run.clone()
    }

    /// Snapshot of what is queued, oldest first.
    pub fn queued(&self) -> Vec<ObservabilityEvent> {
        self.lock().queue.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &PipelineState) {
        let (Some(store), Some(run)) = (&self.store, &state.run) else {
            return;
        };
        let events: Vec<&ObservabilityEvent> = state.queue.iter().collect();
        if let Err(e) = keys::save(store.as_ref(), &keys::telemetry_queue(&run.run_id), &events) {
            warn!(run_id = %run.run_id, error = %e, "could not persist telemetry queue");
        }
    }

    fn forget_persisted(&self, run_id: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(&keys::telemetry_queue(run_id)) {
                warn!(run_id = %run_id, error = %e, "could not remove persisted telemetry queue");
            }
        }
    }

    fn push(&self, state: &mut PipelineState, mut event: ObservabilityEvent) {
        event.timestamp = Utc::now();
        redact_event(&mut event);
        let name = event.event_name.clone();
        let dropped = state.queue.push(event);
        if dropped > 0 {
            warn!(
                event_name = %name,
                dropped,
                queue_overflow = state.queue.dropped(),
                cap = self.config.queue_cap,
                "telemetry queue full; dropped oldest events"
            );
        }
    }

    /// Send one batch while holding the lock.
    fn flush_locked(&self, state: &mut PipelineState) -> PilotResult<usize> {
        let Some(run_id) = state.run.as_ref().map(|r| r.run_id.clone()) else {
            return Ok(0);
        };
        let batch = state.queue.take_batch(self.config.batch_size);
        if batch.is_empty() {
            return Ok(0);
        }

        match self.transport.send_batch(&run_id, &batch) {
            Ok(()) => {
                let sent = batch.len();
                state.delivered += sent as u64;
                debug!(run_id = %run_id, sent, remaining = state.queue.len(), "telemetry batch delivered");
                self.persist(state);
                Ok(sent)
            }
            Err(e) => {
                let size = batch.len();
                let dropped = state.queue.requeue_front(batch);
                warn!(run_id = %run_id, error = %e, size, dropped, "telemetry batch failed; requeued");
                self.persist(state);
                Err(e)
            }
        }
    }

    /// Close the open run: `run_ended`, drain, beacon what is left.
    fn close_locked(&self, state: &mut PipelineState, status: RunStatus, reason: &str) -> PilotResult<()> {
        let Some(run) = state.run.clone() else {
            debug!(status = %status, "end_run without an open run");
            return Ok(());
        };

        let ended = ObservabilityEvent::new(
            "telemetry",
            Severity::Info,
            "run_ended",
            "",
            json!({ "status": status, "reason": reason }),
        );
        self.push(state, ended);

        let mut result = Ok(());
        while !state.queue.is_empty() {
            match self.flush_locked(state) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        if !state.queue.is_empty() {
            let rest = state.queue.drain_all();
            self.transport.send_beacon(&run.run_id, &rest);
        }

        info!(
            run_id = %run.run_id,
            task_id = %run.task_id,
            status = %status,
            reason = %reason,
            "telemetry run ended"
        );
        state.run = None;
        self.forget_persisted(&run.run_id);
        result
    }
}

impl TelemetrySink for TelemetryPipeline {
    fn start_run(&self, task_id: &str, job_id: &str) -> PilotResult<String> {
        let mut state = self.lock();
        if state.run.is_some() {
            // A new session always supersedes the old one.
            if let Err(e) = self.close_locked(&mut state, RunStatus::Abandoned, "superseded by a new run") {
                warn!(error = %e, "previous run ended with undelivered events");
            }
        }

        let run = Run::begin(task_id, job_id);
        if let Err(e) = self.transport.start_run(&run) {
            warn!(run_id = %run.run_id, error = %e, "collector did not acknowledge run start");
        }
        info!(run_id = %run.run_id, task_id = %task_id, job_id = %job_id, "telemetry run started");
        let run_id = run.run_id.clone();
        state.run = Some(run);
        Ok(run_id)
    }

    fn enqueue(&self, event: ObservabilityEvent) {
        let mut state = self.lock();
        if state.run.is_none() {
            debug!(event_name = %event.event_name, "no open run; event dropped");
            return;
        }
        self.push(&mut state, event);
        self.persist(&state);
    }

    fn flush(&self) -> PilotResult<usize> {
        let mut state = self.lock();
        self.flush_locked(&mut state)
    }

    fn end_run(&self, status: RunStatus, reason: &str) -> PilotResult<()> {
        let mut state = self.lock();
        self.close_locked(&mut state, status, reason)
    }

    fn teardown(&self) {
        let mut state = self.lock();
        let Some(run_id) = state.run.as_ref().map(|r| r.run_id.clone()) else {
            return;
        };
        let events = state.queue.drain_all();
        if !events.is_empty() {
            debug!(run_id = %run_id, count = events.len(), "beaconing queued telemetry");
            self.transport.send_beacon(&run_id, &events);
        }
        self.persist(&state);
    }

    fn current_run_id(&self) -> Option<String> {
        self.lock().run.as_ref().map(|r| r.run_id.clone())
    }
}
