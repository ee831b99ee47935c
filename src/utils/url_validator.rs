// URL validation and normalization for incoming check requests
// Every probe receives a TargetUrl, never the raw user input

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

// =============================================================================
// STATIC REGEX PATTERNS
// =============================================================================

lazy_static! {
    /// Input that already names a hierarchical scheme, e.g. `http://` or `ftp://`
    static ref EXPLICIT_SCHEME: Regex =
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://").expect("Invalid scheme pattern regex");

    /// Opaque schemes that must not be mistaken for a bare host
    static ref OPAQUE_SCHEME: Regex =
        Regex::new(r"(?i)^(javascript|data|mailto|file|about|blob|vbscript|tel):")
            .expect("Invalid opaque scheme pattern regex");
}

const MAX_URL_LENGTH: usize = 8192;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("No URL provided")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported scheme: {0}. Only HTTP and HTTPS are supported")]
    UnsupportedScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL too long (max {max}, current {current})")]
    TooLong { max: usize, current: usize },

    #[error("URL contains suspicious characters")]
    SuspiciousCharacters,
}

// =============================================================================
// TARGET URL
// =============================================================================

/// A normalized, scheme-qualified URL with a non-empty host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    url: Url,
}

impl TargetUrl {
    /// Normalize raw user input. Input without a scheme is treated as HTTPS.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }

        if trimmed.len() > MAX_URL_LENGTH {
            return Err(ValidationError::TooLong {
                max: MAX_URL_LENGTH,
                current: trimmed.len(),
            });
        }

        if trimmed.chars().any(|c| c.is_control()) {
            return Err(ValidationError::SuspiciousCharacters);
        }

        let candidate = if EXPLICIT_SCHEME.is_match(trimmed) {
            trimmed.to_string()
        } else if let Some(caps) = OPAQUE_SCHEME.captures(trimmed) {
            return Err(ValidationError::UnsupportedScheme(caps[1].to_lowercase()));
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&candidate)
            .map_err(|e| ValidationError::InvalidFormat(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {},
            other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
        }

        match url.host_str() {
            Some(host) if !host.is_empty() => {},
            _ => return Err(ValidationError::MissingHost),
        }

        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host without brackets, suitable for TLS server name indication
    pub fn host(&self) -> &str {
        let host = self.url.host_str().unwrap_or_default();
        host.trim_start_matches('[').trim_end_matches(']')
    }

    /// Port to use for the TLS handshake: the explicit port of an https URL,
    /// otherwise 443.
    pub fn tls_port(&self) -> u16 {
        match (self.scheme(), self.url.port()) {
            ("https", Some(port)) => port,
            _ => 443,
        }
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================
