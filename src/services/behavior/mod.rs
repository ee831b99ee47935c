// Behavioral probing: ad density and redirect detection on one rendered page

pub mod heuristics;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::rendering::{RenderError, RenderSession, RenderingPool};
use super::{CheckReport, PageProbe, PageReport, ProbeError};
use crate::app_config::RenderingConfig;
use crate::utils::url_validator::TargetUrl;

pub use heuristics::{AdDensityHeuristic, PageHeuristic, RedirectHeuristic};

pub struct BehavioralProber {
    pool: Arc<RenderingPool>,
    page_load_timeout: Duration,
    ad_density: Box<dyn PageHeuristic>,
    redirect: Box<dyn PageHeuristic>,
}

impl BehavioralProber {
    pub fn new(pool: Arc<RenderingPool>, config: &RenderingConfig) -> Self {
        Self::with_heuristics(
            pool,
            config.page_load_timeout,
            Box::new(AdDensityHeuristic::new(config.ad_element_threshold)),
            Box::new(RedirectHeuristic::new(config.navigation_wait)),
        )
    }

    pub fn with_heuristics(
        pool: Arc<RenderingPool>,
        page_load_timeout: Duration,
        ad_density: Box<dyn PageHeuristic>,
        redirect: Box<dyn PageHeuristic>,
    ) -> Self {
        Self {
            pool,
            page_load_timeout,
            ad_density,
            redirect,
        }
    }

    async fn evaluate(
        heuristic: &dyn PageHeuristic,
        page: &dyn RenderSession,
        target: &TargetUrl,
    ) -> CheckReport {
        match heuristic.detect(page, target).await {
            Ok(Some(warning)) => CheckReport::Finding(warning),
            Ok(None) => CheckReport::Clear,
            Err(e) => {
                debug!("{} heuristic failed for {}: {}", heuristic.kind(), target, e);
                CheckReport::Failed(e.into())
            },
        }
    }
}

#[async_trait]
impl PageProbe for BehavioralProber {
    #[instrument(skip(self, target), fields(url = %target))]
    async fn probe_page(&self, target: &TargetUrl) -> PageReport {
        let session = match self.pool.acquire().await {
            Ok(session) => session,
            Err(e @ RenderError::Backpressure(_)) => {
                warn!("Skipping page checks for {}: {}", target, e);
                return PageReport::failed(ProbeError::Backpressure);
            },
            Err(e) => {
                warn!("Could not open rendering session for {}: {}", target, e);
                return PageReport::failed(e.into());
            },
        };

        if let Err(e) = session
            .session()
            .navigate(target.as_str(), self.page_load_timeout)
            .await
        {
            debug!("Navigation to {} failed: {}", target, e);
            if let Err(close_err) = session.close().await {
                warn!("Failed to close rendering session: {}", close_err);
            }
            return PageReport::failed(e.into());
        }

        let ad_density = Self::evaluate(self.ad_density.as_ref(), session.session(), target).await;
        let redirect = Self::evaluate(self.redirect.as_ref(), session.session(), target).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close rendering session: {}", e);
        }

        PageReport {
            ad_density,
            redirect,
        }
    }
}
