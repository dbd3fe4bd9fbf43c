//! The wire seam for telemetry delivery.

use std::sync::{Arc, Mutex, PoisonError};

use applypilot_contracts::{
    error::{PilotError, PilotResult},
    telemetry::{ObservabilityEvent, Run},
};

/// Where batches go.
///
/// `send_batch` is acknowledged; a failure keeps the batch queued for the
/// next flush. `send_beacon` is fire-and-forget and may lose events.
pub trait TelemetryTransport: Send + Sync {
    fn start_run(&self, run: &Run) -> PilotResult<()>;
    fn send_batch(&self, run_id: &str, events: &[ObservabilityEvent]) -> PilotResult<()>;
    fn send_beacon(&self, run_id: &str, events: &[ObservabilityEvent]);
}

/// Everything an `InMemoryTransport` has been handed.
#[derive(Debug, Default)]
pub struct TransportLog {
    pub runs: Vec<Run>,
    /// `(run_id, batch)` per acknowledged `send_batch`.
    pub batches: Vec<(String, Vec<ObservabilityEvent>)>,
    pub beacons: Vec<(String, Vec<ObservabilityEvent>)>,
    /// Rejected `send_batch` attempts.
    pub failures: usize,
    failing: bool,
}

impl TransportLog {
    /// Every delivered event name, batches first then beacons.
    pub fn delivered_names(&self) -> Vec<String> {
        self.batches
            .iter()
            .chain(self.beacons.iter())
            .flat_map(|(_, events)| events.iter().map(|e| e.event_name.clone()))
            .collect()
    }
}

/// A transport that records instead of sending.
///
/// Clones share the same log, so a caller can keep one handle while the
/// pipeline owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    pub log: Arc<Mutex<TransportLog>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `send_batch` calls fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TransportLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TelemetryTransport for InMemoryTransport {
    fn start_run(&self, run: &Run) -> PilotResult<()> {
        self.lock().runs.push(run.clone());
        Ok(())
    }

    fn send_batch(&self, run_id: &str, events: &[ObservabilityEvent]) -> PilotResult<()> {
        let mut log = self.lock();
        if log.failing {
            log.failures += 1;
            return Err(PilotError::TransportFailed {
                reason: "collector unreachable".to_string(),
            });
        }
        log.batches.push((run_id.to_string(), events.to_vec()));
        Ok(())
    }

    fn send_beacon(&self, run_id: &str, events: &[ObservabilityEvent]) {
        self.lock().beacons.push((run_id.to_string(), events.to_vec()));
    }
}
