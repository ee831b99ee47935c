// Check orchestration: run every probe in its own task, isolate failures,
// aggregate into a deterministic verdict

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::behavior::BehavioralProber;
use super::certificate::CertificateInspector;
use super::reachability::ReachabilityProber;
use super::rendering::RenderingPool;
use super::threat_intel::SafeBrowsingClient;
use super::{CheckReport, PageProbe, PageReport, ProbeError, UrlProbe};
use crate::app_config::AppConfig;
use crate::models::{AssessmentResult, WarningKind};
use crate::utils::url_validator::TargetUrl;

pub struct CheckOrchestrator {
    certificate: Arc<dyn UrlProbe>,
    threat_intel: Arc<dyn UrlProbe>,
    reachability: Arc<dyn UrlProbe>,
    behavior: Option<Arc<dyn PageProbe>>,
    request_timeout: Option<Duration>,
}

impl CheckOrchestrator {
    pub fn new(
        certificate: Arc<dyn UrlProbe>,
        threat_intel: Arc<dyn UrlProbe>,
        reachability: Arc<dyn UrlProbe>,
        behavior: Option<Arc<dyn PageProbe>>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            certificate,
            threat_intel,
            reachability,
            behavior,
            request_timeout,
        }
    }

    /// Production probes. Page checks are skipped when no rendering pool is given.
    pub fn from_config(config: &AppConfig, rendering: Option<Arc<RenderingPool>>) -> Self {
        let behavior = rendering.map(|pool| {
            Arc::new(BehavioralProber::new(pool, &config.rendering)) as Arc<dyn PageProbe>
        });

        Self::new(
            Arc::new(CertificateInspector::new(config.probes.tls_connect_timeout)),
            Arc::new(SafeBrowsingClient::new(config.threat_intel.clone())),
            Arc::new(ReachabilityProber::new(config.probes.reachability_timeout)),
            behavior,
            config.probes.request_timeout,
        )
    }

    /// Run every probe against `target` and wait for all of them to settle.
    /// Cancelling `cancel` (or hitting the request timeout) records the
    /// unfinished probes as failed; finished ones keep their results.
    #[instrument(skip(self, target, cancel), fields(url = %target))]
    pub async fn assess(&self, target: TargetUrl, cancel: CancellationToken) -> AssessmentResult {
        let started = Instant::now();
        let target = Arc::new(target);

        // Cancelled when the assessment ends, which also stops the watchdog
        let scope = cancel.child_token();
        let _scope_guard = scope.clone().drop_guard();

        if let Some(limit) = self.request_timeout {
            let watchdog = scope.clone();
            let url = target.to_string();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(limit) => {
                        warn!("Assessment of {} exceeded {:?}, cancelling unfinished probes", url, limit);
                        watchdog.cancel();
                    }
                    _ = watchdog.cancelled() => {}
                }
            });
        }

        let certificate = spawn_url_probe(self.certificate.clone(), target.clone(), scope.clone());
        let threat_intel = spawn_url_probe(self.threat_intel.clone(), target.clone(), scope.clone());
        let reachability = spawn_url_probe(self.reachability.clone(), target.clone(), scope.clone());
        let behavior = self
            .behavior
            .clone()
            .map(|probe| spawn_page_probe(probe, target.clone(), scope.clone()));

        let page = async move {
            match behavior {
                Some(handle) => settle_page(handle.await),
                None => PageReport {
                    ad_density: CheckReport::Clear,
                    redirect: CheckReport::Clear,
                },
            }
        };

        let (certificate, threat_intel, reachability, page) =
            tokio::join!(certificate, threat_intel, reachability, page);

        let slots = [
            (WarningKind::SslIssue, settle(certificate)),
            (WarningKind::Unsafe, settle(threat_intel)),
            (WarningKind::AdHeavy, page.ad_density),
            (WarningKind::RedirectHeavy, page.redirect),
            (WarningKind::BrokenLink, settle(reachability)),
        ];

        if cancel.is_cancelled() {
            info!("Client went away during assessment of {}", target);
        }

        let result = aggregate(&slots);
        info!(
            "Assessed {} as {:?} with {} warning(s) in {:?}",
            target,
            result.status,
            result.warnings.len(),
            started.elapsed()
        );
        result
    }
}

/// Build the result from slots already in report order.
pub fn aggregate(slots: &[(WarningKind, CheckReport)]) -> AssessmentResult {
    let mut warnings = Vec::new();
    let mut incomplete = Vec::new();

    for (kind, report) in slots {
        match report {
            CheckReport::Clear => debug!("{}: no issue", kind),
            CheckReport::Finding(warning) => {
                debug!("{}: {}", kind, warning.reason);
                warnings.push(warning.clone());
            },
            CheckReport::Failed(e) => {
                debug!("{}: probe failed, counted as no issue: {}", kind, e);
                incomplete.push(*kind);
            },
        }
    }

    AssessmentResult::from_warnings(warnings, incomplete)
}

// =============================================================================
// TASK PLUMBING
// =============================================================================

async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

fn spawn_url_probe(
    probe: Arc<dyn UrlProbe>,
    target: Arc<TargetUrl>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<CheckReport> {
    tokio::spawn(async move {
        let kind = probe.kind();
        match until_cancelled(&cancel, probe.probe(&target)).await {
            Some(outcome) => CheckReport::from_outcome(kind, outcome),
            None => CheckReport::Failed(ProbeError::Cancelled),
        }
    })
}

fn spawn_page_probe(
    probe: Arc<dyn PageProbe>,
    target: Arc<TargetUrl>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<PageReport> {
    tokio::spawn(async move {
        until_cancelled(&cancel, probe.probe_page(&target))
            .await
            .unwrap_or_else(|| PageReport::failed(ProbeError::Cancelled))
    })
}

fn settle(joined: Result<CheckReport, JoinError>) -> CheckReport {
    joined.unwrap_or_else(|e| CheckReport::Failed(join_failure(e)))
}

fn settle_page(joined: Result<PageReport, JoinError>) -> PageReport {
    joined.unwrap_or_else(|e| PageReport::failed(join_failure(e)))
}

fn join_failure(error: JoinError) -> ProbeError {
    if error.is_panic() {
        let message = panic_message(error.into_panic());
        warn!("Probe task panicked: {}", message);
        ProbeError::Panicked(message)
    } else {
        ProbeError::Cancelled
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
