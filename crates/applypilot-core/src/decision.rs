//! The worker-action state machine.
//!
//! `decide` is a pure, total function over `(task, platform, stage)`. Calling
//! it twice with the same inputs yields the same `WorkerAction`, which is what
//! lets the controller skip a pass whose dedup signature did not change.
//!
//! Only `form_filling` and `ready_to_submit` authorize autofill. Every other
//! stage, including ones added later, pauses for the user; `submitted` waits
//! for an explicit human confirmation and never closes anything by itself.

use applypilot_contracts::{
    action::{ActionKind, WorkerAction},
    platform::PlatformResult,
    stage::{Stage, StageResult},
    task::Task,
};

/// Map one classification pass to a worker action.
pub fn decide(task: &Task, platform: &PlatformResult, stage: &StageResult) -> WorkerAction {
    // Evidence is carried over from the stage result so the action stays a
    // pure function of its inputs.
    let evidence = stage.evidence.clone();

    if task.status.is_terminal() {
        return WorkerAction {
            action: ActionKind::Noop,
            reason: format!("task '{}' is already {}", task.task_id, task.status),
            evidence,
        };
    }

    let (action, reason) = match stage.stage {
        Stage::LoginRequired => (
            ActionKind::PauseNeedsUser,
            format!("{} requires the user to sign in", platform.platform_kind.display_name()),
        ),
        Stage::VerificationRequired => (
            ActionKind::PauseNeedsUser,
            "a verification step (captcha or second factor) needs the user".to_string(),
        ),
        Stage::Blocked => (
            ActionKind::PauseNeedsUser,
            "the site is blocking automated access".to_string(),
        ),
        Stage::FormFilling => (
            ActionKind::Continue,
            "application form detected; autofill may proceed".to_string(),
        ),
        Stage::ReadyToSubmit => (
            ActionKind::Continue,
            "form looks complete; autofill may proceed, submission stays with the user".to_string(),
        ),
        Stage::Submitted => (
            ActionKind::Noop,
            "page looks submitted; waiting for the user to confirm".to_string(),
        ),
        Stage::Landing => (
            ActionKind::PauseNeedsUser,
            "landing page has no form yet; the user must start the application".to_string(),
        ),
        Stage::Unknown => (
            ActionKind::PauseNeedsUser,
            "page could not be classified; failing safe to the user".to_string(),
        ),
        _ => (
            ActionKind::PauseNeedsUser,
            format!("stage '{}' has no automation rule; failing safe", stage.stage),
        ),
    };

    WorkerAction {
        action,
        reason,
        evidence,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use applypilot_contracts::{
        action::ActionKind,
        evidence::Evidence,
        platform::{Confidence, PlatformKind, PlatformResult},
        stage::{Stage, StageResult},
        task::{Task, TaskStatus},
    };

    use super::decide;

    fn make_task(status: TaskStatus) -> Task {
        Task {
            task_id: "task-1".to_string(),
            job_id: "job-1".to_string(),
            destination_url: "https://jobs.lever.co/acme/123".to_string(),
            status,
            company: Some("Acme".to_string()),
            job_title: None,
        }
    }

    fn make_platform() -> PlatformResult {
        PlatformResult {
            platform_kind: PlatformKind::Lever,
            confidence: Confidence::High,
            evidence: vec![],
        }
    }

    fn make_stage(stage: Stage) -> StageResult {
        StageResult {
            stage,
            confidence: Confidence::High,
            evidence: vec![Evidence {
                kind: "test".to_string(),
                message: "fixed".to_string(),
                data: None,
                timestamp: Utc::now(),
            }],
        }
    }

    /// Same inputs, same action: the property dedup relies on.
    #[test]
    fn test_decide_is_deterministic() {
        let task = make_task(TaskStatus::InProgress);
        let platform = make_platform();
        for stage in Stage::ALL {
            let stage = make_stage(stage);
            assert_eq!(
                decide(&task, &platform, &stage),
                decide(&task, &platform, &stage),
                "decide must be pure for stage {:?}",
                stage.stage
            );
        }
    }

    /// No stage outside the form stages and `submitted` may ever authorize autofill.
    #[test]
    fn test_fail_safe_default() {
        let task = make_task(TaskStatus::InProgress);
        let platform = make_platform();
        for stage in Stage::ALL {
            let action = decide(&task, &platform, &make_stage(stage)).action;
            match stage {
                Stage::FormFilling | Stage::ReadyToSubmit => {
                    assert_eq!(action, ActionKind::Continue)
                }
                Stage::Submitted => assert_eq!(action, ActionKind::Noop),
                other => assert_eq!(
                    action,
                    ActionKind::PauseNeedsUser,
                    "stage {other:?} must pause"
                ),
            }
        }
    }

    #[test]
    fn test_submitted_never_continues() {
        let action = decide(
            &make_task(TaskStatus::InProgress),
            &make_platform(),
            &make_stage(Stage::Submitted),
        );
        assert_eq!(action.action, ActionKind::Noop);
        assert!(action.reason.contains("confirm"));
    }

    #[test]
    fn test_terminal_task_is_noop() {
        let action = decide(
            &make_task(TaskStatus::Canceled),
            &make_platform(),
            &make_stage(Stage::FormFilling),
        );
        assert_eq!(action.action, ActionKind::Noop);
        assert!(action.reason.contains("canceled"));
    }

    #[test]
    fn test_action_carries_stage_evidence() {
        let stage = make_stage(Stage::Blocked);
        let action = decide(&make_task(TaskStatus::InProgress), &make_platform(), &stage);
        assert_eq!(action.evidence, stage.evidence);
    }
}
