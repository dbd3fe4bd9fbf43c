//! Deterministic guidance and status-surface text.
//!
//! Every string here is a pure function of its inputs. Nothing is decided in
//! this module: the action was fixed by `decide` before any text is built.

use tracing::debug;

use applypilot_contracts::{
    guidance::{Guidance, Intent, StatusContent, StatusTone},
    platform::PlatformResult,
    session::ApplySession,
    stage::{Stage, StageResult},
};
use applypilot_core::traits::GuidanceProvider;

use crate::intent::intent_for;

/// The guidance and surface text used by the engine.
#[derive(Debug, Clone, Default)]
pub struct TemplateGuidance;

struct Template {
    title: String,
    what_happening: String,
    user_action: String,
    what_next: String,
}

impl TemplateGuidance {
    pub fn new() -> Self {
        Self
    }

    fn template(&self, intent: Intent, stage: Stage, site: &str) -> Template {
        if stage == Stage::Blocked {
            return Template {
                title: "The site paused automated access".to_string(),
                what_happening: format!("{site} is showing an access check or block page."),
                user_action: "Complete any check the page asks for, or wait a moment and reload.".to_string(),
                what_next: "Once the normal application page is back, I'll pick up where we left off.".to_string(),
            };
        }

        match intent {
            Intent::ClickToApply => Template {
                title: "Start the application".to_string(),
                what_happening: format!("This is the job posting on {site}; the form isn't open yet."),
                user_action: "Click the Apply button on the page.".to_string(),
                what_next: "When the form opens, I'll start filling it in.".to_string(),
            },
            Intent::ClickToContinue => Template {
                title: "Your turn for a moment".to_string(),
                what_happening: format!("{site} needs a quick step from you before the form continues."),
                user_action: "Complete the check on the page and continue.".to_string(),
                what_next: "I'll resume as soon as the next page loads.".to_string(),
            },
            Intent::Login => Template {
                title: format!("Sign in to {site}"),
                what_happening: format!("{site} wants you to sign in before applying."),
                user_action: "Sign in with your account. I never see or store your password.".to_string(),
                what_next: "After you sign in, I'll continue with the application.".to_string(),
            },
            Intent::Registration => Template {
                title: format!("Create your {site} account"),
                what_happening: format!("This employer uses {site}, which needs an account for each applicant."),
                user_action: "Create an account (or sign in if you already have one).".to_string(),
                what_next: "Once you're in, I'll take over the form.".to_string(),
            },
            Intent::EmailVerification => Template {
                title: "Check your email".to_string(),
                what_happening: format!("{site} sent a verification code or link."),
                user_action: "Open the email and enter the code or follow the link.".to_string(),
                what_next: "As soon as you're verified, I'll continue.".to_string(),
            },
            Intent::Unclassifiable => Template {
                title: "I'm not sure what this page needs".to_string(),
                what_happening: format!("I couldn't tell which step of the {site} application this is."),
                user_action: "Take the next step on the page yourself.".to_string(),
                what_next: "I'll keep checking and resume when I recognise the form.".to_string(),
            },
        }
    }
}

/// "Step 3 on Lever", counted from the session's executed rechecks.
fn progress(platform_name: &str, session: &ApplySession) -> String {
    let step = session.recheck_count.max(1);
    format!("Step {step} on {platform_name}")
}

fn site_name(platform: &PlatformResult) -> &'static str {
    platform.platform_kind.display_name()
}

fn session_site(session: &ApplySession) -> &'static str {
    session
        .platform_kind
        .map(|p| p.display_name())
        .unwrap_or("this site")
}

impl GuidanceProvider for TemplateGuidance {
    fn intent(&self, platform: &PlatformResult, stage: &StageResult) -> Intent {
        intent_for(platform, stage)
    }

    fn guidance(
        &self,
        intent: Intent,
        platform: &PlatformResult,
        stage: &StageResult,
        session: &ApplySession,
    ) -> Guidance {
        let t = self.template(intent, stage.stage, site_name(platform));
        debug!(task_id = %session.task_id, intent = %intent, stage = %stage.stage, "guidance built");
        Guidance {
            title: t.title,
            what_happening: format!("{} (step {})", t.what_happening, session.recheck_count.max(1)),
            user_action: t.user_action,
            what_next: t.what_next,
            intent,
            task_id: session.task_id.clone(),
            job_id: session.job_id.clone(),
        }
    }

    fn checking(&self, session: &ApplySession) -> StatusContent {
        StatusContent {
            title: "Checking this page".to_string(),
            progress: progress(session_site(session), session),
            instruction: "Hang tight while I look at the page.".to_string(),
            reassurance: "Nothing is submitted without you.".to_string(),
            what_next: "I'll tell you if I need anything.".to_string(),
            task_id: session.task_id.clone(),
            job_id: session.job_id.clone(),
            tone: StatusTone::Working,
        }
    }

    fn paused(&self, guidance: &Guidance, session: &ApplySession) -> StatusContent {
        StatusContent {
            title: guidance.title.clone(),
            progress: progress(session_site(session), session),
            instruction: guidance.user_action.clone(),
            reassurance: guidance.what_happening.clone(),
            what_next: guidance.what_next.clone(),
            task_id: session.task_id.clone(),
            job_id: session.job_id.clone(),
            tone: StatusTone::Paused,
        }
    }

    fn working(&self, platform: &PlatformResult, session: &ApplySession) -> StatusContent {
        StatusContent {
            title: "Filling in your application".to_string(),
            progress: progress(site_name(platform), session),
            instruction: "You can watch, or keep browsing in another tab.".to_string(),
            reassurance: "I only use the answers you approved.".to_string(),
            what_next: "Submitting stays with you.".to_string(),
            task_id: session.task_id.clone(),
            job_id: session.job_id.clone(),
            tone: StatusTone::Working,
        }
    }

    fn awaiting_confirmation(&self, platform: &PlatformResult, session: &ApplySession) -> StatusContent {
        StatusContent {
            title: "Did the application go through?".to_string(),
            progress: progress(site_name(platform), session),
            instruction: "If you submitted it, confirm below so I can mark it done.".to_string(),
            reassurance: "I won't mark anything as applied until you confirm.".to_string(),
            what_next: "After you confirm, I'll close this application.".to_string(),
            task_id: session.task_id.clone(),
            job_id: session.job_id.clone(),
            tone: StatusTone::Attention,
        }
    }

    fn fallback(&self, session: &ApplySession) -> StatusContent {
        StatusContent {
            title: "Continue manually".to_string(),
            progress: progress(session_site(session), session),
            instruction: "Something went wrong reading this page. Please continue the application yourself.".to_string(),
            reassurance: "I'm still tracking this application.".to_string(),
            what_next: "I'll pick up again on the next page.".to_string(),
            task_id: session.task_id.clone(),
            job_id: session.job_id.clone(),
            tone: StatusTone::Fallback,
        }
    }
}
