//! # applypilot-contracts
//!
//! Shared types, schemas, and contracts for the applypilot detection engine.
//!
//! All crates in the workspace import from here. Beyond small accessors, no
//! business logic lives in this crate.

pub mod action;
pub mod error;
pub mod evidence;
pub mod guidance;
pub mod page;
pub mod platform;
pub mod prefs;
pub mod profile;
pub mod session;
pub mod snapshot;
pub mod stage;
pub mod task;
pub mod telemetry;

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;
    use action::ActionKind;
    use error::PilotError;
    use evidence::Evidence;
    use page::{ButtonKind, InputField, PageButton, PageSnapshot};
    use platform::{Confidence, PlatformKind};
    use prefs::{AutomationPreferences, SessionOverrides};
    use profile::FillReport;
    use session::ApplySession;
    use stage::Stage;
    use task::TaskStatus;

    // ── TaskStatus ───────────────────────────────────────────────────────────

    #[test]
    fn task_status_follows_claim_lifecycle() {
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::Queued.can_transition_to(TaskStatus::Success));

        for exit in [
            TaskStatus::Success,
            TaskStatus::NeedsUser,
            TaskStatus::Canceled,
            TaskStatus::Failed,
        ] {
            assert!(exit.is_terminal());
            assert!(TaskStatus::InProgress.can_transition_to(exit));
            // Exit states are final.
            assert!(!exit.can_transition_to(TaskStatus::InProgress));
        }

        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Queued));
    }

    // ── ApplySession ─────────────────────────────────────────────────────────

    #[test]
    fn session_recheck_keeps_known_platform() {
        let start = Utc::now();
        let mut session = ApplySession::open("task-1", "job-1", "https://a.example/apply", start);
        assert!(session.active);
        assert_eq!(session.platform_kind, None);

        let later = start + Duration::seconds(5);
        session.record_recheck("https://a.example/apply/2", PlatformKind::Lever, later);
        assert_eq!(session.platform_kind, Some(PlatformKind::Lever));
        assert_eq!(session.recheck_count, 1);
        assert_eq!(session.last_seen_at, later);

        // An unknown pass must not erase the vendor seen earlier.
        session.record_recheck("https://a.example/thanks", PlatformKind::Unknown, later);
        assert_eq!(session.platform_kind, Some(PlatformKind::Lever));
        assert_eq!(session.recheck_count, 2);
        assert_eq!(session.current_url, "https://a.example/thanks");
        assert_eq!(session.initial_url, "https://a.example/apply");
    }

    // ── Preferences ──────────────────────────────────────────────────────────

    #[test]
    fn session_override_only_applies_to_owning_task() {
        let mut prefs = AutomationPreferences::default();
        prefs.session = Some(SessionOverrides {
            task_id: "task-7".to_string(),
            autofill_enabled: Some(false),
        });

        assert!(!prefs.autofill_enabled_for("task-7"));
        assert!(prefs.autofill_enabled_for("task-8"));

        assert!(prefs.clear_session_overrides());
        assert!(prefs.autofill_enabled_for("task-7"));
        assert!(!prefs.clear_session_overrides());
    }

    // ── Page helpers ─────────────────────────────────────────────────────────

    #[test]
    fn page_snapshot_helpers_ignore_hidden_controls() {
        let mut hidden = InputField::visible("password", "pw");
        hidden.visible = false;

        let page = PageSnapshot {
            inputs: vec![
                InputField::visible("email", "email"),
                InputField::visible("checkbox", "consent"),
                hidden,
            ],
            buttons: vec![PageButton::visible("  Submit Application ", ButtonKind::Submit)],
            markers: vec!["#GRNHSE_APP".to_string()],
            ..Default::default()
        };

        assert_eq!(page.fillable_inputs().count(), 1);
        assert!(!page.has_password_field());
        assert!(page.has_submit_control());
        assert!(page.has_marker("#grnhse_app"));
        assert_eq!(page.button_texts().collect::<Vec<_>>(), vec!["submit application"]);
    }

    // ── FillReport ───────────────────────────────────────────────────────────

    #[test]
    fn fill_rate_handles_zero_attempts() {
        assert_eq!(FillReport::default().fill_rate(), 0.0);

        let report = FillReport {
            attempted: 8,
            filled: 6,
            skipped: vec!["salary".to_string(), "cover_letter".to_string()],
        };
        assert!((report.fill_rate() - 0.75).abs() < f64::EPSILON);
    }

    // ── Serde shapes ─────────────────────────────────────────────────────────

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(serde_json::to_value(Stage::ReadyToSubmit).unwrap(), json!("ready_to_submit"));
        assert_eq!(serde_json::to_value(ActionKind::PauseNeedsUser).unwrap(), json!("pause_needs_user"));
        assert_eq!(serde_json::to_value(Confidence::High).unwrap(), json!("high"));
        assert_eq!(serde_json::to_value(TaskStatus::NeedsUser).unwrap(), json!("needs_user"));
    }

    #[test]
    fn evidence_serializes_kind_as_type() {
        let ev = Evidence::new("host_suffix", "host matched myworkdayjobs.com")
            .with_data(json!({ "score": 2 }));
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["type"], json!("host_suffix"));
        assert_eq!(value["data"]["score"], json!(2));

        let wrapped = Evidence::new("field_count", "6 fields").with_data(json!(6));
        assert_eq!(wrapped.data.unwrap()["value"], json!(6));
    }

    #[test]
    fn confidence_orders_low_to_high() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }

    // ── PilotError display messages ──────────────────────────────────────────

    #[test]
    fn error_illegal_transition_display() {
        let err = PilotError::IllegalTransition {
            from: "success".to_string(),
            to: "in_progress".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("success"));
        assert!(msg.contains("in_progress"));
    }

    #[test]
    fn error_backend_unavailable_display() {
        let err = PilotError::BackendUnavailable {
            reason: "503 from next-task".to_string(),
        };
        assert!(err.to_string().contains("backend unavailable"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn error_session_mismatch_display() {
        let err = PilotError::SessionMismatch {
            expected: "task-1".to_string(),
            actual: "task-2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("task-1"));
        assert!(msg.contains("task-2"));
    }
}
