//! Application-funnel stage classification.
//!
//! Gates are tested in a fixed order and the first match wins:
//!
//! 1. blocked / anti-automation text          → `blocked`
//! 2. submission confirmation                 → `submitted`
//! 3. CAPTCHA marker or verification prompt   → `verification_required`
//! 4. password field plus sign-in affordance  → `login_required`
//! 5. vendor rules (field count, submit text) → `landing`, `form_filling`,
//!    `ready_to_submit`
//! 6. generic heuristic at `low` confidence, else `unknown`
//!
//! Blocking conditions come first so a login wall behind an anti-bot page is
//! reported as blocked, not as a login the worker could wait out.

use serde_json::json;
use tracing::debug;

use applypilot_contracts::{
    error::PilotResult,
    evidence::{kinds, Evidence},
    page::PageSnapshot,
    platform::{Confidence, PlatformKind},
    stage::{Stage, StageResult},
};
use applypilot_core::traits::StageDetector;

use crate::catalogue::{first_match, SignalCatalogue};

/// A `StageDetector` driven by a `SignalCatalogue`.
#[derive(Debug, Clone)]
pub struct RuleStageDetector {
    catalogue: SignalCatalogue,
}

struct PageView<'a> {
    page: &'a PageSnapshot,
    text: String,
    buttons: Vec<String>,
    fillable: usize,
}

impl<'a> PageView<'a> {
    fn new(page: &'a PageSnapshot) -> Self {
        Self {
            page,
            text: format!("{}\n{}", page.title, page.visible_text).to_lowercase(),
            buttons: page.button_texts().collect(),
            fillable: page.fillable_inputs().count(),
        }
    }

    /// The first button whose text contains one of `phrases`.
    fn button_matching(&self, phrases: &[String]) -> Option<&str> {
        self.buttons
            .iter()
            .find(|b| first_match(b, phrases).is_some())
            .map(String::as_str)
    }
}

impl RuleStageDetector {
    pub fn new(catalogue: SignalCatalogue) -> Self {
        Self { catalogue }
    }

    fn blocked(&self, view: &PageView) -> Option<StageResult> {
        let phrase = first_match(&view.text, &self.catalogue.phrases.blocked)?;
        Some(result(
            Stage::Blocked,
            Confidence::High,
            vec![Evidence::new("blocked_text", format!("page says '{}'", phrase))],
        ))
    }

    fn submitted(&self, view: &PageView) -> Option<StageResult> {
        let phrase = first_match(&view.text, &self.catalogue.phrases.submitted)?;
        Some(result(
            Stage::Submitted,
            Confidence::High,
            vec![Evidence::new("submitted_text", format!("page says '{}'", phrase))],
        ))
    }

    fn verification(&self, view: &PageView) -> Option<StageResult> {
        let captcha = view
            .page
            .markers
            .iter()
            .chain(view.page.frame_sources.iter())
            .find_map(|m| first_match(&m.to_lowercase(), &self.catalogue.phrases.captcha_markers).map(|_| m.clone()));
        if let Some(marker) = captcha {
            return Some(result(
                Stage::VerificationRequired,
                Confidence::High,
                vec![Evidence::new(kinds::CAPTCHA, format!("captcha present ('{}')", marker))],
            ));
        }

        let phrase = first_match(&view.text, &self.catalogue.phrases.verification)?;
        Some(result(
            Stage::VerificationRequired,
            Confidence::High,
            vec![Evidence::new(kinds::VERIFICATION_TEXT, format!("page says '{}'", phrase))],
        ))
    }

    fn login(&self, view: &PageView) -> Option<StageResult> {
        if !view.page.has_password_field() {
            return None;
        }
        let phrases = &self.catalogue.phrases;

        let mut evidence = vec![Evidence::new("password_field", "visible password field")];
        if let Some(text) = view.button_matching(&phrases.registration) {
            evidence.push(Evidence::new(kinds::REGISTRATION_CTA, text).with_data(json!({ "text": text })));
        }
        if let Some(text) = view.button_matching(&phrases.sign_in) {
            evidence.push(Evidence::new(kinds::SIGN_IN_CTA, text).with_data(json!({ "text": text })));
        }
        let form_action = view.page.forms.iter().find_map(|f| {
            let action = f.action.to_lowercase();
            first_match(&action, &phrases.login_form_actions).map(|_| f.action.clone())
        });
        if let Some(action) = form_action {
            evidence.push(Evidence::new("login_form", format!("form posts to '{}'", action)));
        }

        // The password field alone is not enough.
        if evidence.len() < 2 {
            return None;
        }
        Some(result(Stage::LoginRequired, Confidence::High, evidence))
    }

    fn vendor_rules(&self, view: &PageView, platform: PlatformKind) -> Option<StageResult> {
        let vendor = self.catalogue.vendor(platform)?;
        let apply = view.button_matching(&vendor.apply_texts);
        let submit = view.button_matching(&vendor.submit_texts);

        if view.fillable == 0 {
            if let Some(text) = apply {
                return Some(result(
                    Stage::Landing,
                    Confidence::High,
                    vec![Evidence::new("apply_cta", format!("'{}' button with no form", text))],
                ));
            }
            if view.page.inputs.is_empty() {
                return Some(result(
                    Stage::Landing,
                    Confidence::Medium,
                    vec![Evidence::new("no_fields", format!("{} page without form fields", platform))],
                ));
            }
            return None;
        }

        let fields = Evidence::new(
            "field_count",
            format!("{} fillable fields (vendor minimum {})", view.fillable, vendor.min_fields),
        )
        .with_data(json!({ "fillable": view.fillable, "min_fields": vendor.min_fields }));

        if view.fillable >= vendor.min_fields {
            if let Some(text) = submit {
                let submit_evidence = Evidence::new("submit_cta", format!("'{}' button", text));
                return Some(demote_on_errors(
                    view,
                    Confidence::High,
                    vec![fields, submit_evidence],
                ));
            }
            return Some(result(Stage::FormFilling, Confidence::High, vec![fields]));
        }

        Some(result(Stage::FormFilling, Confidence::Medium, vec![fields]))
    }

    fn generic(&self, view: &PageView) -> StageResult {
        let rules = &self.catalogue.generic;
        let submit = view.page.has_submit_control() || view.button_matching(&rules.submit_texts).is_some();

        if view.fillable >= rules.min_fields && submit {
            let evidence = vec![Evidence::new(
                "generic_form",
                format!("{} fillable fields and a submit control", view.fillable),
            )];
            return demote_on_errors(view, Confidence::Low, evidence);
        }
        if view.fillable > 0 {
            return result(
                Stage::FormFilling,
                Confidence::Low,
                vec![Evidence::new("generic_form", format!("{} fillable fields", view.fillable))],
            );
        }
        if let Some(text) = view.button_matching(&rules.apply_texts) {
            return result(
                Stage::Landing,
                Confidence::Low,
                vec![Evidence::new("apply_cta", format!("'{}' button with no form", text))],
            );
        }
        result(
            Stage::Unknown,
            Confidence::Low,
            vec![Evidence::new("no_match", "no stage rule matched")],
        )
    }
}

impl StageDetector for RuleStageDetector {
    fn classify(&self, page: &PageSnapshot, platform: PlatformKind) -> PilotResult<StageResult> {
        let view = PageView::new(page);

        let classified = self
            .blocked(&view)
            .or_else(|| self.submitted(&view))
            .or_else(|| self.verification(&view))
            .or_else(|| self.login(&view))
            .or_else(|| self.vendor_rules(&view, platform))
            .unwrap_or_else(|| self.generic(&view));

        debug!(
            url = %page.url,
            platform = %platform,
            stage = %classified.stage,
            confidence = ?classified.confidence,
            "stage classified"
        );
        Ok(classified)
    }
}

/// A complete-looking form with visible inline errors is still being filled.
fn demote_on_errors(view: &PageView, confidence: Confidence, mut evidence: Vec<Evidence>) -> StageResult {
    if view.page.error_markers > 0 {
        evidence.push(Evidence::new(
            "inline_errors",
            format!("{} inline validation errors", view.page.error_markers),
        ));
        return result(Stage::FormFilling, confidence, evidence);
    }
    result(Stage::ReadyToSubmit, confidence, evidence)
}

fn result(stage: Stage, confidence: Confidence, evidence: Vec<Evidence>) -> StageResult {
    StageResult {
        stage,
        confidence,
        evidence,
    }
}
