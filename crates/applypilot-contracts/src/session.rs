//! Apply sessions and recheck triggers.
//!
//! An `ApplySession` is the logical record of one application attempt. It
//! spans every navigation between claiming a task and the task reaching an
//! exit state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::PlatformKind;

/// The central long-lived entity shared by the background and page contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplySession {
    pub task_id: String,
    pub job_id: String,
    /// `None` until a pass identifies a vendor.
    pub platform_kind: Option<PlatformKind>,
    pub initial_url: String,
    pub current_url: String,
    pub started_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Number of executed (non-deduplicated) rechecks.
    pub recheck_count: u64,
    pub active: bool,
}

impl ApplySession {
    /// Open a new active session at `url`.
    pub fn open(
        task_id: impl Into<String>,
        job_id: impl Into<String>,
        url: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let url = url.into();
        Self {
            task_id: task_id.into(),
            job_id: job_id.into(),
            platform_kind: None,
            initial_url: url.clone(),
            current_url: url,
            started_at: now,
            last_seen_at: now,
            recheck_count: 0,
            active: true,
        }
    }

    /// Record one executed recheck.
    ///
    /// `platform_kind` is only ever upgraded from `None`; an `unknown` result
    /// never erases a vendor seen earlier in the session.
    pub fn record_recheck(&mut self, url: &str, platform: PlatformKind, now: DateTime<Utc>) {
        self.current_url = url.to_string();
        self.recheck_count += 1;
        self.last_seen_at = now;
        if platform != PlatformKind::Unknown {
            self.platform_kind = Some(platform);
        }
    }
}

/// Why a recheck was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCategory {
    /// Full load or any history navigation (push, replace, pop).
    Navigation,
    /// The page became foreground.
    Visibility,
    /// A burst of content mutations.
    Mutation,
    /// The user asked for a recheck from the control surface.
    Manual,
    /// The resume monitor's scheduled poll while paused.
    Poll,
}

impl fmt::Display for TriggerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerCategory::Navigation => "navigation",
            TriggerCategory::Visibility => "visibility",
            TriggerCategory::Mutation => "mutation",
            TriggerCategory::Manual => "manual",
            TriggerCategory::Poll => "poll",
        })
    }
}

/// A timestamped recheck request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecheckTrigger {
    pub category: TriggerCategory,
    pub at: DateTime<Utc>,
}
