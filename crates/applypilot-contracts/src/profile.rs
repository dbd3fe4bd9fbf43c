//! Autofill inputs and outputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// ATS-ready answers derived by the backend.
///
/// The only acceptable autofill data source: raw profile data is never
/// handed to the filler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedProfile {
    /// Answers keyed by field purpose ("email", "first_name", "work_authorization", ...).
    pub answers: BTreeMap<String, String>,
}

/// What one autofill invocation achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillReport {
    pub attempted: u32,
    pub filled: u32,
    /// Names of fields that were attempted but left empty.
    pub skipped: Vec<String>,
}

impl FillReport {
    /// Proportion of attempted fields that were populated; 0.0 when nothing was attempted.
    pub fn fill_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            f64::from(self.filled) / f64::from(self.attempted)
        }
    }
}
