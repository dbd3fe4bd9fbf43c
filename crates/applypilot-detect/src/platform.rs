//! Vendor platform scoring.
//!
//! Each vendor in the catalogue accumulates an integer score from the
//! snapshot:
//!
//! | signal          | weight | structural |
//! |-----------------|--------|------------|
//! | host suffix     | +2     | no         |
//! | frame source    | +2     | with host  |
//! | path fragment   | +1     | no         |
//! | DOM marker      | +1     | yes        |
//!
//! The strictly highest score wins. A tie for first place, or no score at
//! all, yields `unknown` with `low` confidence.

use serde_json::json;
use tracing::debug;
use url::Url;

use applypilot_contracts::{
    error::PilotResult,
    evidence::Evidence,
    page::PageSnapshot,
    platform::{Confidence, PlatformKind, PlatformResult},
};
use applypilot_core::traits::PlatformDetector;

use crate::catalogue::{SignalCatalogue, VendorSignals};

const STRONG: u32 = 2;
const WEAK: u32 = 1;

/// Evidence count at which a vendor is trusted even without a host match.
const CORROBORATED_EVIDENCE: usize = 3;

#[derive(Debug, Default)]
struct Score {
    points: u32,
    strong: bool,
    structural: usize,
    evidence: Vec<Evidence>,
}

/// A `PlatformDetector` driven by a `SignalCatalogue`.
#[derive(Debug, Clone)]
pub struct SignalPlatformDetector {
    catalogue: SignalCatalogue,
}

impl SignalPlatformDetector {
    pub fn new(catalogue: SignalCatalogue) -> Self {
        Self { catalogue }
    }

    fn score(&self, vendor: &VendorSignals, host: &str, path: &str, page: &PageSnapshot) -> Score {
        let mut score = Score::default();

        if let Some(suffix) = vendor.host_suffixes.iter().find(|s| host_matches(host, s)) {
            score.points += STRONG;
            score.strong = true;
            score
                .evidence
                .push(Evidence::new("host_match", format!("host '{}' belongs to {}", host, vendor.kind))
                    .with_data(json!({ "suffix": suffix })));
        }

        for fragment in vendor.path_contains.iter().filter(|f| path.contains(f.as_str())) {
            score.points += WEAK;
            score
                .evidence
                .push(Evidence::new("path_match", format!("path contains '{}'", fragment)));
        }

        for marker in vendor.markers.iter().filter(|m| page.has_marker(m)) {
            score.points += WEAK;
            score.structural += 1;
            score
                .evidence
                .push(Evidence::new("dom_marker", format!("page carries marker '{}'", marker)));
        }

        let frame = page.frame_sources.iter().find(|src| {
            let frame_host = host_of(src).unwrap_or_default();
            vendor.frame_sources.iter().any(|s| host_matches(&frame_host, s))
        });
        if let Some(src) = frame {
            score.points += STRONG;
            // An embedded frame stands in for the host on company career
            // pages; it only corroborates when the host matched as well.
            if score.strong {
                score.structural += 1;
            }
            score.strong = true;
            score
                .evidence
                .push(Evidence::new("frame_source", format!("embedded {} frame", vendor.kind))
                    .with_data(json!({ "src": src })));
        }

        score
    }
}

impl PlatformDetector for SignalPlatformDetector {
    fn classify(&self, page: &PageSnapshot) -> PilotResult<PlatformResult> {
        let parsed = Url::parse(&page.url).ok();
        let host = parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let path = parsed
            .as_ref()
            .map(|u| u.path().to_lowercase())
            .unwrap_or_default();

        let mut scored: Vec<(PlatformKind, Score)> = self
            .catalogue
            .platforms
            .iter()
            .map(|vendor| (vendor.kind, self.score(vendor, &host, &path, page)))
            .filter(|(_, score)| score.points > 0)
            .collect();
        scored.sort_by(|a, b| b.1.points.cmp(&a.1.points));

        let mut candidates = scored.into_iter();
        let Some((kind, best)) = candidates.next() else {
            debug!(url = %page.url, "no vendor signals on page");
            return Ok(PlatformResult::unknown(vec![Evidence::new(
                "no_signals",
                "no vendor signal matched",
            )]));
        };

        if let Some((runner_up, tied)) = candidates.next().filter(|(_, s)| s.points == best.points) {
            debug!(
                url = %page.url,
                first = %kind,
                second = %runner_up,
                points = best.points,
                "vendor scores tied"
            );
            let mut evidence = best.evidence;
            evidence.extend(tied.evidence);
            evidence.push(
                Evidence::new("score_tie", format!("{} and {} scored equally", kind, runner_up))
                    .with_data(json!({ "points": best.points })),
            );
            return Ok(PlatformResult::unknown(evidence));
        }

        let confidence = if (best.strong && best.structural > 0)
            || best.evidence.len() >= CORROBORATED_EVIDENCE
        {
            Confidence::High
        } else if best.strong {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        debug!(
            url = %page.url,
            platform = %kind,
            points = best.points,
            confidence = ?confidence,
            "platform classified"
        );

        Ok(PlatformResult {
            platform_kind: kind,
            confidence,
            evidence: best.evidence,
        })
    }
}

fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

/// `host` equals `suffix` or is a subdomain of it.
fn host_matches(host: &str, suffix: &str) -> bool {
    !suffix.is_empty()
        && (host == suffix
            || host
                .strip_suffix(suffix)
                .is_some_and(|rest| rest.ends_with('.')))
}
