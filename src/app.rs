// Application state shared across handlers
use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    services::{CheckOrchestrator, RenderingPool},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub orchestrator: Arc<CheckOrchestrator>,
    /// None when rendering is disabled
    pub rendering: Option<Arc<RenderingPool>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        orchestrator: CheckOrchestrator,
        rendering: Option<Arc<RenderingPool>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            rendering,
        }
    }

    /// Wire the production probes from configuration.
    pub fn from_config(config: AppConfig) -> Self {
        let rendering = config
            .rendering
            .enabled
            .then(|| Arc::new(RenderingPool::from_config(&config.rendering)));
        let orchestrator = CheckOrchestrator::from_config(&config, rendering.clone());

        Self::new(config, orchestrator, rendering)
    }
}
