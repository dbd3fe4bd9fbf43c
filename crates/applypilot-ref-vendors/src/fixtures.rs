//! Fictional vendor pages, tasks and profile answers.
//!
//! Each page is the snapshot a host adapter would produce for a real screen
//! on that vendor. Nothing here is fetched; the data is hardcoded.

use std::collections::BTreeMap;

use applypilot_contracts::{
    page::{ButtonKind, InputField, PageButton, PageForm, PageSnapshot},
    profile::DerivedProfile,
    task::{Task, TaskStatus},
};

/// Every fixture name `fixture` understands, in display order.
pub const FIXTURE_NAMES: &[&str] = &[
    "workday-blocked",
    "workday-sign-in",
    "workday-application",
    "greenhouse-landing",
    "lever-form-errors",
    "lever-submitted",
    "ashby-ready",
    "careers-generic",
];

/// Look up a fixture page by name.
pub fn fixture(name: &str) -> Option<PageSnapshot> {
    let page = match name {
        "workday-blocked" => workday_blocked(),
        "workday-sign-in" => workday_sign_in(),
        "workday-application" => workday_application(),
        "greenhouse-landing" => greenhouse_landing(),
        "lever-form-errors" => lever_form_with_errors(),
        "lever-submitted" => lever_submitted(),
        "ashby-ready" => ashby_ready(),
        "careers-generic" => careers_generic(),
        _ => return None,
    };
    Some(page)
}

// ── Workday ───────────────────────────────────────────────────────────────────

pub const WORKDAY_APPLY_URL: &str =
    "https://acme.wd5.myworkdayjobs.com/en-US/careers/job/Remote-USA/Backend-Engineer_R1234/apply";

/// An anti-bot interstitial that still renders the sign-in form behind it.
pub fn workday_blocked() -> PageSnapshot {
    PageSnapshot {
        url: "https://acme.wd5.myworkdayjobs.com/en-US/careers/login".to_string(),
        title: "Acme Careers".to_string(),
        visible_text: "Access denied. We detected unusual traffic from your network. \
                       Email Address Password Sign In"
            .to_string(),
        inputs: vec![
            InputField::visible("email", "email"),
            InputField::visible("password", "password"),
        ],
        buttons: vec![
            PageButton::visible("Sign In", ButtonKind::Submit),
            PageButton::visible("Create Account", ButtonKind::Button),
        ],
        markers: vec!["data-automation-id".to_string()],
        ..Default::default()
    }
}

/// Workday's per-employer account wall.
pub fn workday_sign_in() -> PageSnapshot {
    PageSnapshot {
        url: WORKDAY_APPLY_URL.to_string(),
        title: "Sign In | Acme Careers".to_string(),
        visible_text: "Sign in to apply for Backend Engineer. New here? Create an account to get started."
            .to_string(),
        inputs: vec![
            InputField::visible("email", "email"),
            InputField::visible("password", "password"),
        ],
        buttons: vec![
            PageButton::visible("Sign In", ButtonKind::Submit),
            PageButton::visible("Create Account", ButtonKind::Button),
        ],
        markers: vec!["data-automation-id".to_string(), "wd-popup".to_string()],
        ..Default::default()
    }
}

/// The first step of the Workday form, after signing in.
pub fn workday_application() -> PageSnapshot {
    PageSnapshot {
        url: format!("{WORKDAY_APPLY_URL}/myInformation"),
        title: "My Information | Acme Careers".to_string(),
        visible_text: "My Information. Step 1 of 4. Legal name, address and phone.".to_string(),
        inputs: vec![
            InputField::visible("text", "first_name"),
            InputField::visible("text", "last_name"),
            InputField::visible("email", "email"),
            InputField::visible("tel", "phone"),
            InputField::visible("text", "address"),
        ],
        buttons: vec![PageButton::visible("Save and Continue", ButtonKind::Button)],
        markers: vec!["data-automation-id".to_string()],
        ..Default::default()
    }
}

// ── Greenhouse ────────────────────────────────────────────────────────────────

/// A hosted job board posting before the form is opened.
pub fn greenhouse_landing() -> PageSnapshot {
    PageSnapshot {
        url: "https://boards.greenhouse.io/globex/jobs/4012345".to_string(),
        title: "Job Application for Platform Engineer at Globex".to_string(),
        visible_text: "Platform Engineer. Remote. About the role: you will own our deployment tooling."
            .to_string(),
        buttons: vec![PageButton::visible("Apply for this job", ButtonKind::Button)],
        markers: vec!["#grnhse_app".to_string()],
        ..Default::default()
    }
}

// ── Lever ─────────────────────────────────────────────────────────────────────

pub const LEVER_APPLY_URL: &str = "https://jobs.lever.co/initech/5a1e-backend/apply";

/// Six inputs with two visible validation errors.
pub fn lever_form_with_errors() -> PageSnapshot {
    PageSnapshot {
        url: LEVER_APPLY_URL.to_string(),
        title: "Initech - Backend Engineer".to_string(),
        visible_text: "Submit your application. Full name is required. Email is invalid.".to_string(),
        inputs: vec![
            InputField::visible("text", "name"),
            InputField::visible("email", "email"),
            InputField::visible("tel", "phone"),
            InputField::visible("text", "org"),
            InputField::visible("url", "linkedin"),
            InputField::visible("textarea", "comments"),
        ],
        buttons: vec![PageButton::visible("Submit application", ButtonKind::Submit)],
        forms: vec![PageForm {
            action: "/initech/5a1e-backend/apply".to_string(),
            id: "application-form".to_string(),
        }],
        markers: vec!["lever-application-form".to_string()],
        error_markers: 2,
        ..Default::default()
    }
}

pub fn lever_submitted() -> PageSnapshot {
    PageSnapshot {
        url: "https://jobs.lever.co/initech/5a1e-backend/thanks".to_string(),
        title: "Initech".to_string(),
        visible_text: "Application submitted! Thanks for applying to Initech.".to_string(),
        ..Default::default()
    }
}

// ── Ashby ─────────────────────────────────────────────────────────────────────

/// A filled-out Ashby form with nothing left to fix.
pub fn ashby_ready() -> PageSnapshot {
    let mut inputs = vec![
        InputField::visible("text", "name"),
        InputField::visible("email", "email"),
        InputField::visible("tel", "phone"),
        InputField::visible("url", "linkedin"),
    ];
    for input in &mut inputs {
        input.has_value = true;
    }
    PageSnapshot {
        url: "https://jobs.ashbyhq.com/hooli/9f0c/application".to_string(),
        title: "Hooli - Data Engineer".to_string(),
        visible_text: "Data Engineer application. Resume attached.".to_string(),
        inputs,
        buttons: vec![PageButton::visible("Submit Application", ButtonKind::Submit)],
        markers: vec!["ashby-application-form".to_string()],
        ..Default::default()
    }
}

// ── Long tail ─────────────────────────────────────────────────────────────────

/// A company's own careers form with no vendor signals.
pub fn careers_generic() -> PageSnapshot {
    PageSnapshot {
        url: "https://careers.example.org/openings/42".to_string(),
        title: "Join Example Org".to_string(),
        visible_text: "Tell us about yourself.".to_string(),
        inputs: vec![
            InputField::visible("text", "name"),
            InputField::visible("email", "email"),
            InputField::visible("textarea", "motivation"),
        ],
        buttons: vec![PageButton::visible("Send application", ButtonKind::Submit)],
        ..Default::default()
    }
}

// ── Tasks and profile ─────────────────────────────────────────────────────────

/// A queued task pointing at `destination_url`.
pub fn queued_task(task_id: &str, destination_url: &str, company: &str, job_title: &str) -> Task {
    Task {
        task_id: task_id.to_string(),
        job_id: format!("job-{}", task_id.trim_start_matches("task-")),
        destination_url: destination_url.to_string(),
        status: TaskStatus::Queued,
        company: Some(company.to_string()),
        job_title: Some(job_title.to_string()),
    }
}

/// Approved answers keyed by field purpose.
pub fn sample_profile() -> DerivedProfile {
    let answers: BTreeMap<String, String> = [
        ("name", "Riley Chen"),
        ("first_name", "Riley"),
        ("last_name", "Chen"),
        ("email", "riley.chen@example.com"),
        ("phone", "+1 415 555 0142"),
        ("address", "500 Market St, San Francisco"),
        ("org", "Umbrella Labs"),
        ("linkedin", "https://www.linkedin.com/in/rileychen"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    DerivedProfile { answers }
}
