// HTTP reachability probe: one HEAD request, redirects followed

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{ProbeError, UrlProbe};
use crate::models::WarningKind;
use crate::utils::url_validator::TargetUrl;

pub const UNREACHABLE: &str = "Site is unreachable.";

pub struct ReachabilityProber {
    http_client: reqwest::Client,
}

impl ReachabilityProber {
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("link-checker/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { http_client }
    }

    /// `None` for a 2xx/3xx terminal status, otherwise the reason.
    pub async fn check(&self, url: &str) -> Option<String> {
        match self.http_client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    None
                } else {
                    Some(format!("HTTP error: {}", status.as_u16()))
                }
            },
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                Some(UNREACHABLE.to_string())
            },
        }
    }
}

#[async_trait]
impl UrlProbe for ReachabilityProber {
    fn kind(&self) -> WarningKind {
        WarningKind::BrokenLink
    }

    async fn probe(&self, target: &TargetUrl) -> Result<Option<String>, ProbeError> {
        Ok(self.check(target.as_str()).await)
    }
}
