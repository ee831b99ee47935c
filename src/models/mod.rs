pub mod assessment;

// Re-export common types
pub use assessment::{
    AssessmentResult, AssessmentStatus, CheckLinkQuery, CheckLinkRequest, CheckLinkResponse,
    Warning, WarningKind,
};
