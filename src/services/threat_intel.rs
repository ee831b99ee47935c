// Threat intelligence lookups against a Safe Browsing v4 compatible endpoint
// Fail-open: an unreachable service never flags a URL

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{ProbeError, UrlProbe};
use crate::app_config::ThreatIntelConfig;
use crate::models::WarningKind;
use crate::utils::retry::{
    classify_http_status, classify_reqwest_error, run_with_retry, ErrorKind, RetryPolicy,
};
use crate::utils::url_validator::TargetUrl;

const THREAT_TYPES: [&str; 3] = ["MALWARE", "SOCIAL_ENGINEERING", "UNWANTED_SOFTWARE"];

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum ThreatIntelError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Threat service returned HTTP {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

impl ThreatIntelError {
    fn retry_kind(&self) -> ErrorKind {
        match self {
            ThreatIntelError::Network(e) => classify_reqwest_error(e),
            ThreatIntelError::Status(code) => classify_http_status(*code),
            ThreatIntelError::Parse(_) => ErrorKind::Other,
            ThreatIntelError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

impl From<ThreatIntelError> for ProbeError {
    fn from(error: ThreatIntelError) -> Self {
        match error {
            ThreatIntelError::Timeout(d) => ProbeError::Timeout(d),
            ThreatIntelError::Parse(msg) => ProbeError::Parse(msg),
            other => ProbeError::Transport(other.to_string()),
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatMatchRequest<'a> {
    client: ClientInfo<'a>,
    threat_info: ThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_id: &'a str,
    client_version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo<'a> {
    threat_types: &'a [&'a str],
    platform_types: [&'a str; 1],
    threat_entry_types: [&'a str; 1],
    threat_entries: [ThreatEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ThreatEntry<'a> {
    url: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThreatMatchResponse {
    #[serde(default)]
    pub matches: Vec<ThreatMatch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatMatch {
    pub threat_type: String,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct SafeBrowsingClient {
    http_client: reqwest::Client,
    config: ThreatIntelConfig,
    retry: RetryPolicy,
}

impl SafeBrowsingClient {
    pub fn new(config: ThreatIntelConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("link-checker/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        if config.api_key.is_none() {
            info!("SAFE_BROWSING_API_KEY not set, threat intelligence lookups are disabled");
        }

        let retry = RetryPolicy::new(config.max_attempts, config.retry_base_delay);

        Self {
            http_client,
            config,
            retry,
        }
    }

    /// First matching threat type, if any. Retries transient failures
    /// within the configured timeout.
    pub async fn find_threat_match(&self, url: &str) -> Result<Option<String>, ThreatIntelError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Ok(None);
        };

        let body = ThreatMatchRequest {
            client: ClientInfo {
                client_id: &self.config.client_id,
                client_version: &self.config.client_version,
            },
            threat_info: ThreatInfo {
                threat_types: &THREAT_TYPES,
                platform_types: ["ANY_PLATFORM"],
                threat_entry_types: ["URL"],
                threat_entries: [ThreatEntry { url }],
            },
        };

        let lookup = run_with_retry(&self.retry, ThreatIntelError::retry_kind, |attempt| {
            debug!("Threat lookup attempt {} for {}", attempt, url);
            self.lookup_once(api_key, &body)
        });

        let response = tokio::time::timeout(self.config.timeout, lookup)
            .await
            .map_err(|_| ThreatIntelError::Timeout(self.config.timeout))??;

        Ok(response.matches.into_iter().next().map(|m| m.threat_type))
    }

    async fn lookup_once(
        &self,
        api_key: &str,
        body: &ThreatMatchRequest<'_>,
    ) -> Result<ThreatMatchResponse, ThreatIntelError> {
        let response = self
            .http_client
            .post(&self.config.api_url)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ThreatIntelError::Status(status.as_u16()));
        }

        response
            .json::<ThreatMatchResponse>()
            .await
            .map_err(|e| ThreatIntelError::Parse(e.to_string()))
    }
}

#[async_trait]
impl UrlProbe for SafeBrowsingClient {
    fn kind(&self) -> WarningKind {
        WarningKind::Unsafe
    }

    async fn probe(&self, target: &TargetUrl) -> Result<Option<String>, ProbeError> {
        self.find_threat_match(target.as_str()).await.map_err(|e| {
            warn!("Threat intelligence lookup failed for {}: {}", target, e);
            ProbeError::from(e)
        })
    }
}
