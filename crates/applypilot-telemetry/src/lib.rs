//! # applypilot-telemetry
//!
//! The redacted, bounded, batched observability channel.
//!
//! - `redact`: PII and credential scrubbing applied before anything is queued
//! - `queue`: the capped FIFO, oldest dropped first
//! - `transport`: the delivery seam plus an in-memory recorder
//! - `pipeline`: `TelemetryPipeline`, the engine's `TelemetrySink`
//!
//! ```rust,ignore
//! use applypilot_telemetry::{InMemoryTransport, TelemetryConfig, TelemetryPipeline};
//!
//! let pipeline = TelemetryPipeline::new(TelemetryConfig::default(), Box::new(InMemoryTransport::new()));
//! let run_id = pipeline.start_run("task-1", "job-1")?;
//! pipeline.enqueue(event);
//! pipeline.end_run(RunStatus::Success, "confirmed by user")?;
//! ```

pub mod config;
pub mod pipeline;
pub mod queue;
pub mod redact;
pub mod transport;

pub use config::TelemetryConfig;
pub use pipeline::{TelemetryPipeline, TelemetryStats};
pub use queue::EventQueue;
pub use redact::{redact_event, redact_url, redact_value};
pub use transport::{InMemoryTransport, TelemetryTransport, TransportLog};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};

    use applypilot_contracts::{
        error::{PilotError, PilotResult},
        telemetry::{ObservabilityEvent, RunStatus, Severity},
    };
    use applypilot_core::{
        keys,
        traits::{SessionStore, TelemetrySink},
    };

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn event(name: &str, payload: Value) -> ObservabilityEvent {
        ObservabilityEvent::new("test", Severity::Info, name, "https://jobs.lever.co/acme/123", payload)
    }

    fn pipeline(cap: usize, batch: usize) -> (TelemetryPipeline, InMemoryTransport) {
        let transport = InMemoryTransport::new();
        let config = TelemetryConfig {
            queue_cap: cap,
            batch_size: batch,
            persist_queue: true,
        };
        (TelemetryPipeline::new(config, Box::new(transport.clone())), transport)
    }

    #[derive(Default)]
    struct MapStore {
        map: Mutex<HashMap<String, Value>>,
    }

    impl SessionStore for MapStore {
        fn get(&self, key: &str) -> PilotResult<Option<Value>> {
            Ok(self.map.lock().unwrap().get(key).cloned())
        }
        fn put(&self, key: &str, value: Value) -> PilotResult<()> {
            self.map.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
        fn remove(&self, key: &str) -> PilotResult<()> {
            self.map.lock().unwrap().remove(key);
            Ok(())
        }
    }

    // ── Redaction ─────────────────────────────────────────────────────────────

    #[test]
    fn credential_keys_are_removed_at_any_depth() {
        let mut payload = json!({
            "password": "hunter2",
            "api_key": "abc",
            "form": {
                "sessionToken": "t",
                "Authorization": "Bearer x",
                "otp": "123456",
                "field_count": 6,
                "fields": [{ "passcode": "1", "label": "Email" }]
            }
        });
        redact_value(&mut payload);

        assert_eq!(
            payload,
            json!({ "form": { "field_count": 6, "fields": [{ "label": "Email" }] } })
        );
    }

    #[test]
    fn emails_are_masked_inside_any_string() {
        let mut payload = json!({
            "note": "contact jordan.doe@example.com or hr@acme.co.uk",
            "list": ["x@y.io"]
        });
        redact_value(&mut payload);

        assert_eq!(payload["note"], "contact jo***@example.com or hr***@acme.co.uk");
        assert_eq!(payload["list"][0], "x***@y.io");
    }

    #[test]
    fn phone_and_name_keys_are_masked() {
        let mut payload = json!({
            "phone": "+1 (415) 555-0199",
            "mobile_number": 4155550123u64,
            "first_name": "Jordan",
            "lastName": "Doe",
            "job_title": "Engineer"
        });
        redact_value(&mut payload);

        assert_eq!(payload["phone"], "***0199");
        assert_eq!(payload["mobile_number"], "***0123");
        assert_eq!(payload["first_name"], "J***");
        assert_eq!(payload["lastName"], "D***");
        assert_eq!(payload["job_title"], "Engineer");
    }

    #[test]
    fn signature_payload_field_survives() {
        let mut payload = json!({ "signature": "ab12" });
        redact_value(&mut payload);
        assert_eq!(payload["signature"], "ab12");
    }

    #[test]
    fn url_credentials_are_stripped() {
        assert_eq!(
            redact_url("https://acme.wd5.myworkdayjobs.com/login?token=abc&step=2&code=9911"),
            "https://acme.wd5.myworkdayjobs.com/login?step=2"
        );
        assert_eq!(
            redact_url("https://user:pw@boards.greenhouse.io/acme?sig=zz"),
            "https://boards.greenhouse.io/acme"
        );
        assert_eq!(redact_url("not a url, mail me@host.com"), "not a url, mail me***@host.com");
    }

    #[test]
    fn enqueued_events_are_redacted() {
        let (p, transport) = pipeline(10, 10);
        p.start_run("t1", "j1").unwrap();
        let mut e = event("autofill_completed", json!({ "email": "sam@example.com", "password": "x" }));
        e.url = "https://jobs.lever.co/acme/123/apply?auth=secret".to_string();
        p.enqueue(e);
        p.flush().unwrap();

        let log = transport.log.lock().unwrap();
        let sent = &log.batches[0].1[0];
        assert_eq!(sent.payload, json!({ "email": "sa***@example.com" }));
        assert_eq!(sent.url, "https://jobs.lever.co/acme/123/apply");
    }

    // ── Queue ─────────────────────────────────────────────────────────────────

    #[test]
    fn queue_drops_oldest_beyond_cap() {
        let mut q = EventQueue::new(3);
        for i in 0..5 {
            q.push(event(&format!("e{i}"), json!({})));
        }
        let names: Vec<_> = q.iter().map(|e| e.event_name.clone()).collect();
        assert_eq!(names, vec!["e2", "e3", "e4"]);
        assert_eq!(q.dropped(), 2);
    }

    #[test]
    fn requeue_keeps_original_order_and_cap() {
        let mut q = EventQueue::new(4);
        for i in 0..4 {
            q.push(event(&format!("e{i}"), json!({})));
        }
        let batch = q.take_batch(2);
        q.push(event("e4", json!({})));
        q.push(event("e5", json!({})));
        let dropped = q.requeue_front(batch);

        let names: Vec<_> = q.iter().map(|e| e.event_name.clone()).collect();
        assert_eq!(dropped, 2);
        assert_eq!(names, vec!["e2", "e3", "e4", "e5"]);
    }

    #[test]
    fn pipeline_queue_is_bounded_and_counts_overflow() {
        let (p, _) = pipeline(200, 50);
        p.start_run("t1", "j1").unwrap();
        for i in 0..250 {
            p.enqueue(event(&format!("e{i}"), json!({})));
        }
        let stats = p.stats();
        assert_eq!(stats.queued, 200);
        assert_eq!(stats.queue_overflow, 50);
        assert_eq!(p.queued()[0].event_name, "e50");
    }

    // ── Runs ──────────────────────────────────────────────────────────────────

    #[test]
    fn events_without_a_run_are_dropped() {
        let (p, _) = pipeline(10, 10);
        p.enqueue(event("orphan", json!({})));
        assert_eq!(p.stats().queued, 0);
        assert_eq!(p.flush().unwrap(), 0);
    }

    #[test]
    fn flush_sends_one_batch_under_the_run_id() {
        let (p, transport) = pipeline(10, 2);
        let run_id = p.start_run("t1", "j1").unwrap();
        for name in ["a", "b", "c"] {
            p.enqueue(event(name, json!({})));
        }

        assert_eq!(p.flush().unwrap(), 2);
        assert_eq!(p.stats().queued, 1);
        let log = transport.log.lock().unwrap();
        assert_eq!(log.runs.len(), 1);
        assert_eq!(log.batches[0].0, run_id);
    }

    #[test]
    fn failed_flush_requeues_in_order() {
        let (p, transport) = pipeline(10, 2);
        p.start_run("t1", "j1").unwrap();
        for name in ["a", "b", "c"] {
            p.enqueue(event(name, json!({})));
        }
        transport.set_failing(true);

        match p.flush() {
            Err(PilotError::TransportFailed { .. }) => {}
            other => panic!("expected TransportFailed, got {:?}", other),
        }
        let names: Vec<_> = p.queued().into_iter().map(|e| e.event_name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        transport.set_failing(false);
        assert_eq!(p.flush().unwrap(), 2);
    }

    #[test]
    fn end_run_records_outcome_and_drains() {
        let (p, transport) = pipeline(10, 2);
        p.start_run("t1", "j1").unwrap();
        for name in ["a", "b", "c"] {
            p.enqueue(event(name, json!({})));
        }
        p.end_run(RunStatus::Success, "confirmed").unwrap();

        assert!(p.current_run_id().is_none());
        let log = transport.log.lock().unwrap();
        assert_eq!(log.delivered_names(), vec!["a", "b", "c", "run_ended"]);
        let last = &log.batches.last().unwrap().1.last().unwrap().payload;
        assert_eq!(last["status"], "success");
        assert_eq!(last["reason"], "confirmed");
    }

    #[test]
    fn zero_batch_size_still_drains_on_end_run() {
        let (p, transport) = pipeline(10, 0);
        p.start_run("t1", "j1").unwrap();
        p.enqueue(event("a", json!({})));
        p.enqueue(event("b", json!({})));

        assert_eq!(p.flush().unwrap(), 1);
        p.end_run(RunStatus::Success, "confirmed").unwrap();

        let log = transport.log.lock().unwrap();
        assert_eq!(log.delivered_names(), vec!["a", "b", "run_ended"]);
        assert!(log.beacons.is_empty());
    }

    #[test]
    fn end_run_beacons_when_transport_is_down() {
        let (p, transport) = pipeline(10, 2);
        p.start_run("t1", "j1").unwrap();
        p.enqueue(event("a", json!({})));
        transport.set_failing(true);

        assert!(p.end_run(RunStatus::Failed, "gave up").is_err());
        let log = transport.log.lock().unwrap();
        assert!(log.batches.is_empty());
        assert_eq!(log.beacons.len(), 1);
        assert_eq!(log.beacons[0].1.len(), 2);
        assert_eq!(p.stats().queued, 0);
    }

    #[test]
    fn starting_a_run_abandons_the_previous_one() {
        let (p, transport) = pipeline(10, 10);
        let first = p.start_run("t1", "j1").unwrap();
        p.enqueue(event("a", json!({})));
        let second = p.start_run("t2", "j2").unwrap();

        assert_ne!(first, second);
        assert_eq!(p.current_run_id(), Some(second));
        let log = transport.log.lock().unwrap();
        let (run_id, batch) = &log.batches[0];
        assert_eq!(run_id, &first);
        assert_eq!(batch.last().unwrap().payload["status"], "abandoned");
    }

    #[test]
    fn teardown_beacons_everything_and_keeps_the_run() {
        let (p, transport) = pipeline(10, 2);
        let run_id = p.start_run("t1", "j1").unwrap();
        for name in ["a", "b", "c"] {
            p.enqueue(event(name, json!({})));
        }
        p.teardown();

        assert_eq!(p.current_run_id(), Some(run_id.clone()));
        assert_eq!(p.stats().queued, 0);
        let log = transport.log.lock().unwrap();
        assert!(log.batches.is_empty());
        assert_eq!(log.beacons[0].0, run_id);
        assert_eq!(log.beacons[0].1.len(), 3);
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    #[test]
    fn queue_survives_a_page_reload() {
        let store: Arc<MapStore> = Arc::new(MapStore::default());
        let (p, _) = pipeline(10, 10);
        let p = p.with_store(store.clone());
        let run_id = p.start_run("t1", "j1").unwrap();
        p.enqueue(event("a", json!({})));
        p.enqueue(event("b", json!({})));
        let run = p.current_run().unwrap();

        let persisted: Vec<ObservabilityEvent> =
            keys::load(store.as_ref(), &keys::telemetry_queue(&run_id)).unwrap().unwrap();
        assert_eq!(persisted.len(), 2);

        let (reloaded, transport) = pipeline(10, 10);
        let reloaded = reloaded.with_store(store.clone());
        assert_eq!(reloaded.resume_run(run).unwrap(), 2);
        assert_eq!(reloaded.flush().unwrap(), 2);
        assert_eq!(transport.log.lock().unwrap().batches[0].0, run_id);
    }

    #[test]
    fn end_run_removes_the_persisted_queue() {
        let store: Arc<MapStore> = Arc::new(MapStore::default());
        let (p, _) = pipeline(10, 10);
        let p = p.with_store(store.clone());
        let run_id = p.start_run("t1", "j1").unwrap();
        p.enqueue(event("a", json!({})));
        p.end_run(RunStatus::Canceled, "user canceled").unwrap();

        assert!(store.get(&keys::telemetry_queue(&run_id)).unwrap().is_none());
    }

    // ── Config ────────────────────────────────────────────────────────────────

    #[test]
    fn config_defaults_and_validation() {
        let config = TelemetryConfig::from_toml_str("batch_size = 20").unwrap();
        assert_eq!(config.queue_cap, 200);
        assert_eq!(config.batch_size, 20);

        match TelemetryConfig::from_toml_str("queue_cap = 10\nbatch_size = 50") {
            Err(PilotError::ConfigError { reason }) => assert!(reason.contains("batch_size"), "{reason}"),
            other => panic!("expected ConfigError, got {:?}", other),
        }
        assert!(TelemetryConfig::from_toml_str("queue_cap = 0").is_err());
    }
}
