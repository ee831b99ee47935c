// Probe services for the link checker
// Each probe is independently fallible; the orchestrator isolates and aggregates them

pub mod behavior;
pub mod certificate;
pub mod orchestrator;
pub mod reachability;
pub mod rendering;
pub mod threat_intel;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Warning, WarningKind};
use crate::utils::url_validator::TargetUrl;

// Re-export commonly used services
pub use behavior::{AdDensityHeuristic, BehavioralProber, PageHeuristic, RedirectHeuristic};
pub use certificate::{classify_certificate, CertificateFacts, CertificateInspector};
pub use orchestrator::CheckOrchestrator;
pub use reachability::ReachabilityProber;
pub use rendering::{RenderError, RenderingEngine, RenderingPool, RenderSession, WebDriverEngine};
pub use threat_intel::{SafeBrowsingClient, ThreatIntelError};

// =============================================================================
// PROBE RESULTS
// =============================================================================

/// Why a probe could not produce a result. Always counted as "no issue".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Rendering failed: {0}")]
    Rendering(String),

    #[error("Rendering capacity exhausted")]
    Backpressure,

    #[error("Probe cancelled")]
    Cancelled,

    #[error("Probe panicked: {0}")]
    Panicked(String),
}

/// Outcome of one probe slot.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckReport {
    Clear,
    Finding(Warning),
    Failed(ProbeError),
}

impl CheckReport {
    pub fn from_outcome(kind: WarningKind, outcome: Result<Option<String>, ProbeError>) -> Self {
        match outcome {
            Ok(None) => CheckReport::Clear,
            Ok(Some(reason)) => CheckReport::Finding(Warning::new(kind, reason)),
            Err(e) => CheckReport::Failed(e),
        }
    }

    pub fn warning(&self) -> Option<&Warning> {
        match self {
            CheckReport::Finding(w) => Some(w),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CheckReport::Failed(_))
    }
}

// =============================================================================
// PROBE INTERFACES
// =============================================================================

/// A check that needs nothing but the URL. Fills exactly one slot.
#[async_trait]
pub trait UrlProbe: Send + Sync {
    fn kind(&self) -> WarningKind;

    /// `Ok(Some(reason))` is a finding, `Ok(None)` means no issue.
    async fn probe(&self, target: &TargetUrl) -> Result<Option<String>, ProbeError>;
}

/// Results of the checks that share one rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub ad_density: CheckReport,
    pub redirect: CheckReport,
}

impl PageReport {
    pub fn failed(error: ProbeError) -> Self {
        Self {
            ad_density: CheckReport::Failed(error.clone()),
            redirect: CheckReport::Failed(error),
        }
    }
}

/// A check that drives a rendering session. Fills the ad density and redirect slots.
#[async_trait]
pub trait PageProbe: Send + Sync {
    async fn probe_page(&self, target: &TargetUrl) -> PageReport;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_outcome() {
        assert_eq!(
            CheckReport::from_outcome(WarningKind::BrokenLink, Ok(None)),
            CheckReport::Clear
        );

        let finding = CheckReport::from_outcome(
            WarningKind::BrokenLink,
            Ok(Some("HTTP error: 500".to_string())),
        );
        assert_eq!(
            finding.warning(),
            Some(&Warning::new(WarningKind::BrokenLink, "HTTP error: 500"))
        );

        let failed = CheckReport::from_outcome(WarningKind::Unsafe, Err(ProbeError::Cancelled));
        assert!(failed.is_failed());
        assert!(failed.warning().is_none());
    }
}
