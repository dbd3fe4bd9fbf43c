//! Timestamped, typed observations collected during a detection pass.
//!
//! Evidence exists for explainability and audit. Worker decisions never
//! branch on it: they are carried by the enums in `platform`, `stage` and
//! `action`. Guidance wording is the one consumer allowed to look at the
//! kinds listed in `kinds`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Evidence kinds shared between the stage classifier and guidance.
pub mod kinds {
    /// A sign-in call to action on a login page.
    pub const SIGN_IN_CTA: &str = "sign_in_cta";
    /// An account-creation call to action.
    pub const REGISTRATION_CTA: &str = "registration_cta";
    /// A CAPTCHA widget on the page.
    pub const CAPTCHA: &str = "captcha";
    /// A verification or second-factor prompt in the page text.
    pub const VERIFICATION_TEXT: &str = "verification_text";
}

/// A single observation supporting a classification decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Discriminant string (e.g. "host_suffix", "blocked_text", "field_count").
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable explanation.
    pub message: String,
    /// Optional structured detail (matched pattern, counts, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Wall-clock time the observation was made (UTC).
    pub timestamp: DateTime<Utc>,
}

impl Evidence {
    /// Record an observation stamped with the current time.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// True if this observation is of `kind`.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Attach structured detail. Non-object values are stored under `"value"`.
    pub fn with_data(mut self, data: Value) -> Self {
        let map = match data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        self.data = Some(map);
        self
    }
}
