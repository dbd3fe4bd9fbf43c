//! Vendor platform classification results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;

/// The application-tracking system that owns the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    Workday,
    Greenhouse,
    Lever,
    Ashby,
    /// Long-tail sites, or no vendor scored strictly highest.
    Unknown,
}

impl PlatformKind {
    /// The four vendor families, in catalogue order.
    pub const VENDORS: [PlatformKind; 4] = [
        PlatformKind::Workday,
        PlatformKind::Greenhouse,
        PlatformKind::Lever,
        PlatformKind::Ashby,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Workday => "workday",
            PlatformKind::Greenhouse => "greenhouse",
            PlatformKind::Lever => "lever",
            PlatformKind::Ashby => "ashby",
            PlatformKind::Unknown => "unknown",
        }
    }

    /// Name shown to the user in guidance text.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformKind::Workday => "Workday",
            PlatformKind::Greenhouse => "Greenhouse",
            PlatformKind::Lever => "Lever",
            PlatformKind::Ashby => "Ashby",
            PlatformKind::Unknown => "this site",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strongly the collected evidence supports a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// The output of one platform classification pass.
///
/// Computed fresh every pass. It is persisted only as part of a
/// `DetectionSnapshot`, never as authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformResult {
    pub platform_kind: PlatformKind,
    pub confidence: Confidence,
    pub evidence: Vec<Evidence>,
}

impl PlatformResult {
    /// An `unknown` result with low confidence.
    pub fn unknown(evidence: Vec<Evidence>) -> Self {
        Self {
            platform_kind: PlatformKind::Unknown,
            confidence: Confidence::Low,
            evidence,
        }
    }
}
