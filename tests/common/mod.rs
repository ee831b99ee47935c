// Common test utilities and helper structs
// Shared across all test files to avoid duplication

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use link_checker::{
    app::AppState, build_router, AppConfig, CheckOrchestrator, CheckReport, PageProbe,
    PageReport, ProbeError, TargetUrl, UrlProbe, Warning, WarningKind,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

/// URLs each fake probe was asked to check
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Canned probe answers for one test app
#[derive(Debug, Clone, Default)]
pub struct ProbeScript {
    pub ssl: Option<&'static str>,
    pub threat: Option<&'static str>,
    pub ads: Option<&'static str>,
    pub redirect: Option<&'static str>,
    pub broken: Option<&'static str>,
}

struct ScriptedProbe {
    kind: WarningKind,
    reason: Option<&'static str>,
    calls: CallLog,
}

#[async_trait]
impl UrlProbe for ScriptedProbe {
    fn kind(&self) -> WarningKind {
        self.kind
    }

    async fn probe(&self, target: &TargetUrl) -> Result<Option<String>, ProbeError> {
        self.calls.lock().unwrap().push(target.to_string());
        Ok(self.reason.map(String::from))
    }
}

struct ScriptedPage {
    ads: Option<&'static str>,
    redirect: Option<&'static str>,
    calls: CallLog,
}

fn scripted_report(kind: WarningKind, reason: Option<&'static str>) -> CheckReport {
    match reason {
        Some(reason) => CheckReport::Finding(Warning::new(kind, reason)),
        None => CheckReport::Clear,
    }
}

#[async_trait]
impl PageProbe for ScriptedPage {
    async fn probe_page(&self, target: &TargetUrl) -> PageReport {
        self.calls.lock().unwrap().push(target.to_string());
        PageReport {
            ad_density: scripted_report(WarningKind::AdHeavy, self.ads),
            redirect: scripted_report(WarningKind::RedirectHeavy, self.redirect),
        }
    }
}

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub calls: CallLog,
}

impl TestApp {
    /// Send a POST request
    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }

    /// Send a GET request
    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    /// Send a CORS preflight request
    pub fn options(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "OPTIONS", uri)
    }

    /// URLs probed so far, one entry per probe invocation
    pub fn probed_urls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    request: Request<Body>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &str, uri: &str) -> Self {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        Self { app, request }
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        let body_bytes = serde_json::to_vec(body).unwrap();
        let (mut parts, _) = self.request.into_parts();
        parts
            .headers
            .insert("content-type", "application/json".parse().unwrap());
        self.request = Request::from_parts(parts, Body::from(body_bytes));
        self
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.request
            .headers_mut()
            .insert(name, value.parse().unwrap());
        self
    }

    /// Send the request
    pub async fn send(self) -> TestResponse {
        let response = self.app.app.clone().oneshot(self.request).await.unwrap();
        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    /// Get status code
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Get response body as text
    pub async fn text(self) -> String {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

/// Test app whose probes answer from `script` and record every call
pub fn setup_test_app(script: ProbeScript) -> TestApp {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));

    let url_probe = |kind: WarningKind, reason: Option<&'static str>| -> Arc<dyn UrlProbe> {
        Arc::new(ScriptedProbe {
            kind,
            reason,
            calls: calls.clone(),
        })
    };

    let orchestrator = CheckOrchestrator::new(
        url_probe(WarningKind::SslIssue, script.ssl),
        url_probe(WarningKind::Unsafe, script.threat),
        url_probe(WarningKind::BrokenLink, script.broken),
        Some(Arc::new(ScriptedPage {
            ads: script.ads,
            redirect: script.redirect,
            calls: calls.clone(),
        })),
        None,
    );

    let state = AppState::new(AppConfig::default(), orchestrator, None);

    TestApp {
        app: build_router(state),
        calls,
    }
}

/// Test app wired with the production probes, rendering disabled
pub fn setup_real_app(config: AppConfig) -> TestApp {
    TestApp {
        app: build_router(AppState::from_config(config)),
        calls: Arc::new(Mutex::new(Vec::new())),
    }
}

/// Serve `router` on an ephemeral local port
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
