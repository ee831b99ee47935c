// Page heuristics evaluated against a loaded rendering session

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{Warning, WarningKind};
use crate::services::rendering::{RenderError, RenderSession};
use crate::utils::url_validator::TargetUrl;

/// Elements that look like ad slots: frames, or any id/class containing "ad".
pub const AD_SIGNAL_SELECTOR: &str = "iframe, [id*='ad'], [class*='ad']";

pub const EXCESSIVE_ADS: &str = "Excessive ads/pop-ups detected.";

/// URLs a fresh browser tab reports before any real navigation.
const ENGINE_DEFAULT_PAGES: [&str; 2] = ["about:blank", "data:,"];

#[async_trait]
pub trait PageHeuristic: Send + Sync {
    fn kind(&self) -> WarningKind;

    /// Inspect a page that has already been navigated to `target`.
    async fn detect(
        &self,
        page: &dyn RenderSession,
        target: &TargetUrl,
    ) -> Result<Option<Warning>, RenderError>;
}

// =============================================================================
// AD DENSITY
// =============================================================================

pub struct AdDensityHeuristic {
    selector: String,
    threshold: usize,
}

impl AdDensityHeuristic {
    pub fn new(threshold: usize) -> Self {
        Self {
            selector: AD_SIGNAL_SELECTOR.to_string(),
            threshold,
        }
    }
}

#[async_trait]
impl PageHeuristic for AdDensityHeuristic {
    fn kind(&self) -> WarningKind {
        WarningKind::AdHeavy
    }

    async fn detect(
        &self,
        page: &dyn RenderSession,
        _target: &TargetUrl,
    ) -> Result<Option<Warning>, RenderError> {
        let count = page.count_elements(&self.selector).await?;
        tracing::debug!("Ad-like elements: {} (threshold {})", count, self.threshold);

        Ok((count > self.threshold).then(|| Warning::new(self.kind(), EXCESSIVE_ADS)))
    }
}

// =============================================================================
// REDIRECT CHAIN
// =============================================================================

pub struct RedirectHeuristic {
    navigation_wait: Duration,
}

impl RedirectHeuristic {
    pub fn new(navigation_wait: Duration) -> Self {
        Self { navigation_wait }
    }
}

/// `None` when the settled URL is the target itself or an engine default page.
pub fn redirect_reason(target: &str, settled: &str) -> Option<String> {
    if settled == target || ENGINE_DEFAULT_PAGES.contains(&settled) {
        return None;
    }
    Some(format!("Redirects to {}", settled))
}

#[async_trait]
impl PageHeuristic for RedirectHeuristic {
    fn kind(&self) -> WarningKind {
        WarningKind::RedirectHeavy
    }

    async fn detect(
        &self,
        page: &dyn RenderSession,
        target: &TargetUrl,
    ) -> Result<Option<Warning>, RenderError> {
        let landed = page.current_url().await?;
        let settled = page
            .wait_for_navigation(&landed, self.navigation_wait)
            .await?
            .unwrap_or(landed);

        Ok(redirect_reason(target.as_str(), &settled).map(|reason| Warning::new(self.kind(), reason)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_reason() {
        assert_eq!(redirect_reason("https://a.example/", "https://a.example/"), None);
        assert_eq!(redirect_reason("https://a.example/", "about:blank"), None);
        assert_eq!(redirect_reason("https://a.example/", "data:,"), None);
        assert_eq!(
            redirect_reason("https://a.example/", "https://b.example/landing"),
            Some("Redirects to https://b.example/landing".to_string())
        );
        // Case-sensitive comparison
        assert!(redirect_reason("https://a.example/Path", "https://a.example/path").is_some());
    }
}
