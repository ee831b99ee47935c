// Library exports for the link checker
// This file exposes modules and the router builder for the binary and tests

pub mod app;
pub mod app_config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, ConfigError};
pub use models::{AssessmentResult, AssessmentStatus, CheckLinkResponse, Warning, WarningKind};
pub use services::{CheckOrchestrator, CheckReport, PageProbe, PageReport, ProbeError, UrlProbe};
pub use utils::{ServiceError, TargetUrl};

use axum::{middleware::from_fn_with_state, response::IntoResponse, routing::get, Router};
use tower_http::trace::TraceLayer;

/// Full HTTP surface: liveness, health, check-link, CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(handlers::check_link_routes())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::dynamic_cors_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Liveness
pub async fn root() -> &'static str {
    "Link checker is running."
}

// Health check handler
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let timestamp = chrono::Utc::now().to_rfc3339();

    let rendering_health = match &state.rendering {
        Some(pool) => serde_json::json!({
            "status": "enabled",
            "available_sessions": pool.available_sessions(),
            "max_sessions": pool.max_sessions()
        }),
        None => serde_json::json!({
            "status": "disabled",
            "available_sessions": 0,
            "max_sessions": 0
        }),
    };

    let threat_intel_status = if state.config.threat_intel.api_key.is_some() {
        "enabled"
    } else {
        "disabled"
    };

    let response = serde_json::json!({
        "status": "healthy",
        "service": "link-checker",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.server.environment.to_string(),
        "timestamp": timestamp,
        "components": {
            "rendering": rendering_health,
            "threat_intel": { "status": threat_intel_status }
        }
    });

    (StatusCode::OK, Json(response))
}
