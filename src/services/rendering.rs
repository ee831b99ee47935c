// Headless page rendering behind a bounded session pool
// The rest of the crate only sees RenderingEngine / RenderSession

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::ProbeError;
use crate::app_config::RenderingConfig;

const NAVIGATION_POLL_INTERVAL: Duration = Duration::from_millis(250);
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("WebDriver session could not be opened: {0}")]
    Connect(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Page load timed out after {0:?}")]
    Timeout(Duration),

    #[error("WebDriver command failed: {0}")]
    Command(String),

    #[error("No rendering session available within {0:?}")]
    Backpressure(Duration),
}

impl From<RenderError> for ProbeError {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::Backpressure(_) => ProbeError::Backpressure,
            RenderError::Timeout(d) => ProbeError::Timeout(d),
            other => ProbeError::Rendering(other.to_string()),
        }
    }
}

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// One browser tab driven by a probe.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Navigate and wait for the load event, at most `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    async fn count_elements(&self, css_selector: &str) -> Result<usize, RenderError>;

    async fn current_url(&self) -> Result<String, RenderError>;

    /// Wait for the page to leave `from`. `Ok(None)` if nothing happened within `timeout`.
    async fn wait_for_navigation(
        &self,
        from: &str,
        timeout: Duration,
    ) -> Result<Option<String>, RenderError>;

    async fn close(&self) -> Result<(), RenderError>;
}

#[async_trait]
pub trait RenderingEngine: Send + Sync {
    async fn open_session(&self) -> Result<Arc<dyn RenderSession>, RenderError>;
}

// =============================================================================
// SESSION POOL
// =============================================================================

/// Caps concurrent rendering sessions. Exhaustion is reported as backpressure
/// instead of queueing without limit.
pub struct RenderingPool {
    engine: Arc<dyn RenderingEngine>,
    permits: Arc<Semaphore>,
    max_sessions: usize,
    acquire_timeout: Duration,
}

impl RenderingPool {
    pub fn new(
        engine: Arc<dyn RenderingEngine>,
        max_sessions: usize,
        acquire_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            permits: Arc::new(Semaphore::new(max_sessions)),
            max_sessions,
            acquire_timeout,
        }
    }

    /// Pool backed by a WebDriver server.
    pub fn from_config(config: &RenderingConfig) -> Self {
        let engine = WebDriverEngine::new(config.webdriver_url.clone(), config.page_load_timeout);
        Self::new(Arc::new(engine), config.max_sessions, config.acquire_timeout)
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn available_sessions(&self) -> usize {
        self.permits.available_permits()
    }

    /// Take a permit, then open a session. The permit is held until the
    /// session is closed. Both steps are bounded by `acquire_timeout`.
    pub async fn acquire(&self) -> Result<PooledSession, RenderError> {
        let permit = timeout(self.acquire_timeout, self.permits.clone().acquire_owned())
            .await
            .map_err(|_| RenderError::Backpressure(self.acquire_timeout))?
            .map_err(|_| RenderError::Connect("rendering pool is closed".to_string()))?;

        let session = timeout(self.acquire_timeout, self.engine.open_session())
            .await
            .map_err(|_| {
                RenderError::Connect(format!(
                    "rendering engine did not answer within {:?}",
                    self.acquire_timeout
                ))
            })??;
        debug!(
            "Rendering session opened ({} of {} free)",
            self.permits.available_permits(),
            self.max_sessions
        );

        Ok(PooledSession {
            session,
            permit: Some(permit),
            closed: false,
        })
    }

    /// Open and close one session to prove the engine is usable.
    pub async fn self_test(&self) -> Result<(), RenderError> {
        let session = self.acquire().await?;
        session.close().await
    }
}

/// A session on loan from the pool. Dropping it without `close` closes it
/// in the background.
pub struct PooledSession {
    session: Arc<dyn RenderSession>,
    permit: Option<OwnedSemaphorePermit>,
    closed: bool,
}

impl PooledSession {
    pub fn session(&self) -> &dyn RenderSession {
        self.session.as_ref()
    }

    pub async fn close(mut self) -> Result<(), RenderError> {
        let result = self.session.close().await;
        self.closed = true;
        result
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let session = self.session.clone();
        let permit = self.permit.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!("Failed to close abandoned rendering session: {}", e);
                    }
                    drop(permit);
                });
            },
            Err(_) => warn!("Rendering session dropped outside a runtime; not closed"),
        }
    }
}

// =============================================================================
// WEBDRIVER ENGINE
// =============================================================================

/// Headless Chrome over WebDriver (chromedriver, Selenium, ...).
///
/// The page-load limit is handed to the driver as well. WebDriver commands on
/// one session run in order, so a navigation abandoned only on our side would
/// keep the session busy until the driver's own limit.
pub struct WebDriverEngine {
    webdriver_url: String,
    page_load_timeout: Duration,
    command_timeout: Duration,
}

impl WebDriverEngine {
    pub fn new(webdriver_url: impl Into<String>, page_load_timeout: Duration) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            page_load_timeout,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Bound for opening and closing sessions.
    pub fn with_command_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    fn capabilities(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("pageLoadStrategy".to_string(), json!("normal"));
        caps.insert(
            "timeouts".to_string(),
            json!({ "pageLoad": self.page_load_timeout.as_millis() as u64 }),
        );
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": [
                    "--headless=new",
                    "--no-sandbox",
                    "--disable-gpu",
                    "--disable-dev-shm-usage"
                ]
            }),
        );
        caps
    }
}

#[async_trait]
impl RenderingEngine for WebDriverEngine {
    async fn open_session(&self) -> Result<Arc<dyn RenderSession>, RenderError> {
        let client = timeout(
            self.command_timeout,
            ClientBuilder::native()
                .capabilities(self.capabilities())
                .connect(&self.webdriver_url),
        )
        .await
        .map_err(|_| {
            RenderError::Connect(format!(
                "{} did not answer within {:?}",
                self.webdriver_url, self.command_timeout
            ))
        })?
        .map_err(|e| RenderError::Connect(e.to_string()))?;

        Ok(Arc::new(WebDriverSession {
            client,
            command_timeout: self.command_timeout,
        }))
    }
}

struct WebDriverSession {
    client: Client,
    command_timeout: Duration,
}

#[async_trait]
impl RenderSession for WebDriverSession {
    async fn navigate(&self, url: &str, load_timeout: Duration) -> Result<(), RenderError> {
        match timeout(load_timeout, self.client.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Navigation(e.to_string())),
            Err(_) => Err(RenderError::Timeout(load_timeout)),
        }
    }

    async fn count_elements(&self, css_selector: &str) -> Result<usize, RenderError> {
        self.client
            .find_all(Locator::Css(css_selector))
            .await
            .map(|elements| elements.len())
            .map_err(|e| RenderError::Command(e.to_string()))
    }

    async fn current_url(&self) -> Result<String, RenderError> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(|e| RenderError::Command(e.to_string()))
    }

    async fn wait_for_navigation(
        &self,
        from: &str,
        wait: Duration,
    ) -> Result<Option<String>, RenderError> {
        let deadline = Instant::now() + wait;
        while Instant::now() < deadline {
            tokio::time::sleep(NAVIGATION_POLL_INTERVAL).await;
            let current = self.current_url().await?;
            if current != from {
                return Ok(Some(current));
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), RenderError> {
        match timeout(self.command_timeout, self.client.clone().close()).await {
            Ok(result) => result.map_err(|e| RenderError::Command(e.to_string())),
            Err(_) => Err(RenderError::Timeout(self.command_timeout)),
        }
    }
}

/// Log the outcome of a startup self-test. Never fatal.
pub async fn run_self_test(pool: Arc<RenderingPool>) {
    match pool.self_test().await {
        Ok(()) => info!("Rendering self-test passed"),
        Err(e) => warn!("Rendering self-test failed, page checks will be skipped: {}", e),
    }
}

// =============================================================================
// TEST DOUBLES
// =============================================================================
