//! The signal catalogue: vendor fingerprints and stage phrase lists.
//!
//! A `SignalCatalogue` is deserialized from TOML. The built-in catalogue is
//! embedded at compile time; hosts can ship their own with `from_file`.
//!
//! Example:
//! ```toml
//! [phrases]
//! blocked = ["access denied"]
//! submitted = ["thank you for applying"]
//!
//! [generic]
//! min_fields = 2
//!
//! [[platforms]]
//! kind = "lever"
//! host_suffixes = ["lever.co"]
//! markers = ["lever-application-form"]
//! min_fields = 3
//! submit_texts = ["submit application"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use applypilot_contracts::{
    error::{PilotError, PilotResult},
    platform::PlatformKind,
};

const BUILTIN: &str = include_str!("../signals/default.toml");

/// Phrase lists consumed by the stage gates. All lowercase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseLists {
    /// Anti-automation or access-denied wording.
    pub blocked: Vec<String>,
    /// Submission confirmations.
    pub submitted: Vec<String>,
    /// Email verification and second-factor prompts.
    pub verification: Vec<String>,
    /// Substrings of markers or frame sources that indicate a CAPTCHA.
    pub captcha_markers: Vec<String>,
    pub sign_in: Vec<String>,
    pub registration: Vec<String>,
    /// Substrings of a form `action` that indicate a sign-in endpoint.
    pub login_form_actions: Vec<String>,
}

/// Heuristics for pages no vendor rule claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericRules {
    pub min_fields: usize,
    pub apply_texts: Vec<String>,
    pub submit_texts: Vec<String>,
}

impl Default for GenericRules {
    fn default() -> Self {
        Self {
            min_fields: 2,
            apply_texts: Vec::new(),
            submit_texts: Vec::new(),
        }
    }
}

/// Fingerprint and form conventions of one vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorSignals {
    pub kind: PlatformKind,

    /// Hosts owned by the vendor. Strong signal (+2).
    #[serde(default)]
    pub host_suffixes: Vec<String>,

    /// URL path fragments typical for the vendor. Weak signal (+1 each).
    #[serde(default)]
    pub path_contains: Vec<String>,

    /// DOM markers the host reports. Weak structural signal (+1 each).
    #[serde(default)]
    pub markers: Vec<String>,

    /// Hosts of embedded vendor frames on a company career page.
    /// Strong structural signal (+2).
    #[serde(default)]
    pub frame_sources: Vec<String>,

    /// Fillable fields needed before a vendor form counts as complete.
    pub min_fields: usize,

    #[serde(default)]
    pub apply_texts: Vec<String>,

    #[serde(default)]
    pub submit_texts: Vec<String>,
}

/// The top-level document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalCatalogue {
    #[serde(default)]
    pub phrases: PhraseLists,
    #[serde(default)]
    pub generic: GenericRules,
    #[serde(default)]
    pub platforms: Vec<VendorSignals>,
}

impl SignalCatalogue {
    /// The catalogue compiled into this crate.
    pub fn builtin() -> PilotResult<Self> {
        Self::from_toml_str(BUILTIN)
    }

    /// Parse `s` as TOML.
    ///
    /// Returns `PilotError::ConfigError` if the TOML is malformed, lists a
    /// vendor twice, or declares a rule for `unknown`.
    pub fn from_toml_str(s: &str) -> PilotResult<Self> {
        let mut catalogue: SignalCatalogue = toml::from_str(s).map_err(|e| PilotError::ConfigError {
            reason: format!("failed to parse signal catalogue TOML: {}", e),
        })?;

        let mut seen = HashSet::new();
        for vendor in &catalogue.platforms {
            if vendor.kind == PlatformKind::Unknown {
                return Err(PilotError::ConfigError {
                    reason: "signal catalogue declares rules for platform 'unknown'".to_string(),
                });
            }
            if !seen.insert(vendor.kind) {
                return Err(PilotError::ConfigError {
                    reason: format!("platform '{}' is declared more than once", vendor.kind),
                });
            }
        }

        catalogue.normalize();
        Ok(catalogue)
    }

    /// Read the file at `path` and parse it as a signal catalogue.
    pub fn from_file(path: &Path) -> PilotResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| PilotError::ConfigError {
            reason: format!("failed to read signal catalogue '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn vendor(&self, kind: PlatformKind) -> Option<&VendorSignals> {
        self.platforms.iter().find(|v| v.kind == kind)
    }

    fn normalize(&mut self) {
        let p = &mut self.phrases;
        for list in [
            &mut p.blocked,
            &mut p.submitted,
            &mut p.verification,
            &mut p.captcha_markers,
            &mut p.sign_in,
            &mut p.registration,
            &mut p.login_form_actions,
            &mut self.generic.apply_texts,
            &mut self.generic.submit_texts,
        ] {
            lowercase_all(list);
        }
        for vendor in &mut self.platforms {
            for list in [
                &mut vendor.host_suffixes,
                &mut vendor.path_contains,
                &mut vendor.markers,
                &mut vendor.frame_sources,
                &mut vendor.apply_texts,
                &mut vendor.submit_texts,
            ] {
                lowercase_all(list);
            }
        }
    }
}

fn lowercase_all(list: &mut [String]) {
    for item in list.iter_mut() {
        *item = item.trim().to_lowercase();
    }
}

/// The first phrase of `phrases` contained in `haystack` (already lowercase).
pub(crate) fn first_match<'a>(haystack: &str, phrases: &'a [String]) -> Option<&'a str> {
    phrases
        .iter()
        .map(String::as_str)
        .find(|p| !p.is_empty() && haystack.contains(p))
}
