//! applypilot reference runtime demo CLI
//!
//! Runs the reference vendor scenarios, or classifies a single page.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- blocked-login
//!   cargo run -p demo -- classify lever-form-errors
//!   cargo run -p demo -- classify --file snapshot.json
//!   cargo run -p demo -- fixtures

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use applypilot_contracts::{
    error::{PilotError, PilotResult},
    page::PageSnapshot,
};
use applypilot_ref_vendors::{
    fixtures::{fixture, FIXTURE_NAMES},
    harness::classify_page,
    scenarios::{
        self, blocked_login, form_with_errors, resume_after_sign_in, session_exclusivity, unchanged_page,
        vendor_landing,
    },
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// applypilot: job-application page detection and orchestration demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "applypilot reference vendor demo",
    long_about = "Runs applypilot reference scenarios against fictional Workday, Greenhouse,\n\
                  Lever and Ashby pages, or prints one detection pass as JSON."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all six scenarios in sequence.
    RunAll,
    /// Scenario 1: anti-bot page over a login form.
    BlockedLogin,
    /// Scenario 2: vendor job posting before the form opens.
    VendorLanding,
    /// Scenario 3: six inputs with inline errors, through to submission.
    FormWithErrors,
    /// Scenario 4: three triggers on an unchanged page.
    UnchangedPage,
    /// Scenario 5: Workday account wall, then resume.
    ResumeAfterSignIn,
    /// Scenario 6: a second claim closes the first session.
    SessionExclusivity,
    /// Classify one page and print the detection pass as JSON.
    Classify {
        /// A built-in fixture name (see `fixtures`).
        fixture: Option<String>,
        /// A JSON page snapshot to classify instead of a fixture.
        #[arg(long, conflicts_with = "fixture")]
        file: Option<PathBuf>,
    },
    /// List the built-in fixture pages.
    Fixtures,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug to watch every pipeline step.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::RunAll => {
            print_banner();
            scenarios::run_all()
        }
        Command::BlockedLogin => blocked_login::run_scenario(),
        Command::VendorLanding => vendor_landing::run_scenario(),
        Command::FormWithErrors => form_with_errors::run_scenario(),
        Command::UnchangedPage => unchanged_page::run_scenario(),
        Command::ResumeAfterSignIn => resume_after_sign_in::run_scenario(),
        Command::SessionExclusivity => session_exclusivity::run_scenario(),
        Command::Classify { fixture, file } => classify(fixture, file),
        Command::Fixtures => {
            for name in FIXTURE_NAMES {
                println!("{}", name);
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Classify ──────────────────────────────────────────────────────────────────

fn classify(name: Option<String>, file: Option<PathBuf>) -> PilotResult<()> {
    let page = match (name, file) {
        (_, Some(path)) => load_snapshot(&path)?,
        (Some(name), None) => fixture(&name).ok_or_else(|| PilotError::ConfigError {
            reason: format!("unknown fixture '{}'; try one of: {}", name, FIXTURE_NAMES.join(", ")),
        })?,
        (None, None) => {
            return Err(PilotError::ConfigError {
                reason: "pass a fixture name or --file".to_string(),
            })
        }
    };
    debug!(url = %page.url, "classifying page");

    let report = classify_page(&page)?;
    let json = serde_json::to_string_pretty(&report).map_err(|e| PilotError::ConfigError {
        reason: format!("could not render report: {}", e),
    })?;
    println!("{}", json);
    Ok(())
}

fn load_snapshot(path: &Path) -> PilotResult<PageSnapshot> {
    let contents = std::fs::read_to_string(path).map_err(|e| PilotError::PageRead {
        reason: format!("failed to read '{}': {}", path.display(), e),
    })?;
    serde_json::from_str(&contents).map_err(|e| PilotError::PageRead {
        reason: format!("'{}' is not a page snapshot: {}", path.display(), e),
    })
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("applypilot: job-application detection and orchestration");
    println!("Reference Vendor Demo");
    println!("=======================================================");
    println!();
    println!("Pipeline per recheck:");
    println!("  [1] Trigger debounced; unchanged page signature short-circuits");
    println!("  [2] Platform scored from host, path, DOM markers and frames");
    println!("  [3] Stage gates: blocked, submitted, verification, login, vendor rules, generic");
    println!("  [4] Worker action decided: continue / pause_needs_user / noop");
    println!("  [5] Guidance or autofill, then a redacted telemetry event");
    println!();
}
