// Assessment data model: warnings, verdicts and the check-link wire types

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// WARNINGS
// =============================================================================

/// Kind of finding a probe can report. The declaration order is the order
/// warnings appear in an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    #[serde(rename = "SSL Issue")]
    SslIssue,
    #[serde(rename = "Unsafe")]
    Unsafe,
    #[serde(rename = "Ad-Heavy")]
    AdHeavy,
    #[serde(rename = "Redirect-Heavy")]
    RedirectHeavy,
    #[serde(rename = "Broken Link")]
    BrokenLink,
}

impl WarningKind {
    /// All kinds in report order.
    pub const ALL: [WarningKind; 5] = [
        WarningKind::SslIssue,
        WarningKind::Unsafe,
        WarningKind::AdHeavy,
        WarningKind::RedirectHeavy,
        WarningKind::BrokenLink,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WarningKind::SslIssue => "SSL Issue",
            WarningKind::Unsafe => "Unsafe",
            WarningKind::AdHeavy => "Ad-Heavy",
            WarningKind::RedirectHeavy => "Redirect-Heavy",
            WarningKind::BrokenLink => "Broken Link",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A user-facing finding about a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub reason: String,
}

impl Warning {
    pub fn new(kind: WarningKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// VERDICT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    Working,
    Warning,
    Broken,
}

/// Aggregated outcome of one assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentResult {
    pub status: AssessmentStatus,
    pub warnings: Vec<Warning>,
    /// Probe slots that failed to complete and were counted as "no issue".
    pub incomplete: Vec<WarningKind>,
}

impl AssessmentResult {
    /// Build a result from warnings already in report order.
    pub fn from_warnings(warnings: Vec<Warning>, incomplete: Vec<WarningKind>) -> Self {
        let status = if warnings.is_empty() {
            AssessmentStatus::Working
        } else {
            AssessmentStatus::Warning
        };

        Self {
            status,
            warnings,
            incomplete,
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Query string for GET /check-link
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckLinkQuery {
    pub url: Option<String>,
}

/// JSON body for POST /check-link
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckLinkRequest {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckLinkResponse {
    pub status: AssessmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Warning>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckLinkResponse {
    pub fn broken(error: impl Into<String>) -> Self {
        Self {
            status: AssessmentStatus::Broken,
            warnings: None,
            error: Some(error.into()),
        }
    }
}

impl From<AssessmentResult> for CheckLinkResponse {
    fn from(result: AssessmentResult) -> Self {
        Self {
            status: result.status,
            warnings: Some(result.warnings),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verdict_follows_warning_list() {
        let clean = AssessmentResult::from_warnings(vec![], vec![WarningKind::Unsafe]);
        assert_eq!(clean.status, AssessmentStatus::Working);
        assert!(clean.warnings.is_empty());

        let flagged = AssessmentResult::from_warnings(
            vec![Warning::new(WarningKind::BrokenLink, "HTTP error: 404")],
            vec![],
        );
        assert_eq!(flagged.status, AssessmentStatus::Warning);
    }

    #[test]
    fn test_response_uses_original_labels() {
        let result = AssessmentResult::from_warnings(
            vec![
                Warning::new(WarningKind::SslIssue, "Expired SSL certificate."),
                Warning::new(WarningKind::RedirectHeavy, "Redirects to https://b.example/"),
            ],
            vec![],
        );

        let body = serde_json::to_value(CheckLinkResponse::from(result)).unwrap();
        assert_eq!(
            body,
            json!({
                "status": "warning",
                "warnings": [
                    {"type": "SSL Issue", "reason": "Expired SSL certificate."},
                    {"type": "Redirect-Heavy", "reason": "Redirects to https://b.example/"}
                ]
            })
        );
    }

    #[test]
    fn test_broken_response_has_no_warnings_field() {
        let body = serde_json::to_value(CheckLinkResponse::broken("Invalid URL format")).unwrap();
        assert_eq!(body, json!({"status": "broken", "error": "Invalid URL format"}));
    }

    #[test]
    fn test_kind_order_matches_report_order() {
        let mut kinds = WarningKind::ALL.to_vec();
        kinds.sort();
        assert_eq!(kinds, WarningKind::ALL.to_vec());
    }
}
