// TLS certificate inspection
// Verification is disabled at the transport layer and done here, so each
// failure mode gets its own reason

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use super::{ProbeError, UrlProbe};
use crate::models::WarningKind;
use crate::utils::url_validator::TargetUrl;

pub const NO_CERTIFICATE: &str = "No valid SSL certificate.";
pub const EXPIRED_CERTIFICATE: &str = "Expired SSL certificate.";
pub const UNTRUSTED_CERTIFICATE: &str = "Self-signed or untrusted SSL certificate.";
pub const MISCONFIGURED_CERTIFICATE: &str = "Fake or misconfigured SSL certificate.";

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("Connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[from] native_tls::Error),

    #[error("Handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unparseable certificate: {0}")]
    Parse(String),
}

// =============================================================================
// CERTIFICATE FACTS
// =============================================================================

/// The peer certificate fields the classifier looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateFacts {
    pub not_after: DateTime<Utc>,
    pub issuer_organization: Option<String>,
}

impl CertificateFacts {
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| CertificateError::Parse(e.to_string()))?;

        let not_after_ts = cert.validity().not_after.timestamp();
        let not_after = DateTime::<Utc>::from_timestamp(not_after_ts, 0).ok_or_else(|| {
            CertificateError::Parse(format!("notAfter out of range: {}", not_after_ts))
        })?;

        let issuer_organization = cert
            .issuer()
            .iter_organization()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .map(|s| s.to_string());

        Ok(Self {
            not_after,
            issuer_organization,
        })
    }
}

/// First matching rule wins. Returns `None` when the certificate looks fine.
pub fn classify_certificate(
    facts: Option<&CertificateFacts>,
    now: DateTime<Utc>,
) -> Option<&'static str> {
    let Some(facts) = facts else {
        return Some(NO_CERTIFICATE);
    };

    if facts.not_after < now {
        return Some(EXPIRED_CERTIFICATE);
    }

    match facts.issuer_organization.as_deref() {
        Some(org) if !org.trim().is_empty() => None,
        _ => Some(UNTRUSTED_CERTIFICATE),
    }
}

// =============================================================================
// INSPECTOR
// =============================================================================

#[derive(Debug, Clone)]
pub struct CertificateInspector {
    connect_timeout: Duration,
}

impl CertificateInspector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Connect and read the peer certificate, if any.
    pub async fn inspect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Option<CertificateFacts>, CertificateError> {
        match tokio::time::timeout(self.connect_timeout, self.fetch_peer_der(host, port)).await {
            Ok(Ok(Some(der))) => CertificateFacts::from_der(&der).map(Some),
            Ok(Ok(None)) => Ok(None),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CertificateError::Timeout(self.connect_timeout)),
        }
    }

    /// Never fails: transport problems are themselves a finding.
    #[instrument(skip(self))]
    pub async fn check(&self, host: &str, port: u16) -> Option<&'static str> {
        match self.inspect(host, port).await {
            Ok(facts) => classify_certificate(facts.as_ref(), Utc::now()),
            Err(e) => {
                debug!("Certificate inspection failed for {}:{}: {}", host, port, e);
                Some(MISCONFIGURED_CERTIFICATE)
            },
        }
    }

    async fn fetch_peer_der(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Option<Vec<u8>>, CertificateError> {
        let mut builder = native_tls::TlsConnector::builder();
        builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
        if host.parse::<IpAddr>().is_ok() {
            builder.use_sni(false);
        }
        let connector = tokio_native_tls::TlsConnector::from(builder.build()?);

        let stream = TcpStream::connect((host, port)).await?;
        let tls = connector.connect(host, stream).await?;

        let der = match tls.get_ref().peer_certificate()? {
            Some(cert) => Some(cert.to_der()?),
            None => None,
        };
        Ok(der)
    }
}

#[async_trait]
impl UrlProbe for CertificateInspector {
    fn kind(&self) -> WarningKind {
        WarningKind::SslIssue
    }

    async fn probe(&self, target: &TargetUrl) -> Result<Option<String>, ProbeError> {
        Ok(self
            .check(target.host(), target.tls_port())
            .await
            .map(String::from))
    }
}
