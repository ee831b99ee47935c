// Integration tests for the check-link endpoint
mod common;

use axum::{http::StatusCode, routing::get, Router};
use common::{setup_real_app, setup_test_app, spawn_server, ProbeScript};
use link_checker::AppConfig;
use serde_json::{json, Value};

#[tokio::test]
async fn test_missing_url_is_rejected_without_probing() {
    let app = setup_test_app(ProbeScript::default());

    let response = app.get("/check-link").send().await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await;
    assert_eq!(body, json!({"error": "No URL provided"}));

    let response = app.get("/check-link?url=").send().await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.post("/check-link").json(&json!({})).send().await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await;
    assert_eq!(body["error"], "No URL provided");

    assert!(app.probed_urls().is_empty());
}

#[tokio::test]
async fn test_scheme_less_url_is_probed_as_https() {
    let app = setup_test_app(ProbeScript::default());

    let response = app.get("/check-link?url=example.com").send().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await;
    assert_eq!(body, json!({"status": "working", "warnings": []}));

    let probed = app.probed_urls();
    assert_eq!(probed.len(), 4);
    assert!(probed.iter().all(|url| url == "https://example.com/"));
}

#[tokio::test]
async fn test_single_broken_link_warning() {
    let app = setup_test_app(ProbeScript {
        broken: Some("HTTP error: 404"),
        ..ProbeScript::default()
    });

    let response = app
        .post("/check-link")
        .json(&json!({"url": "https://example.com/gone"}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await;
    assert_eq!(
        body,
        json!({
            "status": "warning",
            "warnings": [{"type": "Broken Link", "reason": "HTTP error: 404"}]
        })
    );
}

#[tokio::test]
async fn test_warnings_keep_report_order() {
    let app = setup_test_app(ProbeScript {
        ssl: Some("Expired SSL certificate."),
        threat: Some("MALWARE"),
        redirect: Some("Redirects to https://elsewhere.example/"),
        ..ProbeScript::default()
    });

    let body: Value = app
        .get("/check-link?url=https%3A%2F%2Fexpired.example")
        .send()
        .await
        .json()
        .await;

    let types: Vec<&str> = body["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["SSL Issue", "Unsafe", "Redirect-Heavy"]);
    assert_eq!(body["status"], "warning");
}

#[tokio::test]
async fn test_malformed_url_is_broken() {
    let app = setup_test_app(ProbeScript::default());

    let response = app
        .get("/check-link?url=ftp%3A%2F%2Fexample.com")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await;
    assert_eq!(body["status"], "broken");
    assert!(body["error"].as_str().unwrap().contains("ftp"));
    assert!(body.get("warnings").is_none());

    let response = app
        .post("/check-link")
        .json(&json!({"url": "http://exa mple.com"}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.probed_urls().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let app = setup_test_app(ProbeScript::default());

    let response = app
        .post("/check-link")
        .header("content-type", "application/json")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await;
    assert!(body["error"].as_str().unwrap().starts_with("Malformed request body"));
}

#[tokio::test]
async fn test_liveness_and_health() {
    let app = setup_test_app(ProbeScript::default());

    let response = app.get("/").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await, "Link checker is running.");

    let response = app.get("/health").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["service"], "link-checker");
    assert_eq!(body["components"]["rendering"]["status"], "disabled");
    assert_eq!(body["components"]["threat_intel"]["status"], "disabled");
}

#[tokio::test]
async fn test_cors_reflects_origin_outside_production() {
    let app = setup_test_app(ProbeScript::default());

    let response = app
        .get("/check-link?url=example.com")
        .header("origin", "chrome-extension://abcdef")
        .send()
        .await;
    assert_eq!(
        response.header("access-control-allow-origin").as_deref(),
        Some("chrome-extension://abcdef")
    );

    let preflight = app
        .options("/check-link")
        .header("origin", "https://site.example")
        .send()
        .await;
    assert_eq!(preflight.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        preflight.header("access-control-allow-origin").as_deref(),
        Some("https://site.example")
    );
    assert!(preflight
        .header("access-control-allow-methods")
        .unwrap()
        .contains("POST"));
    assert_eq!(app.probed_urls().len(), 4);
}

#[tokio::test]
async fn test_real_probes_against_local_server() {
    let target = spawn_server(
        Router::new()
            .route("/", get(|| async { "home" }))
            .route("/gone", get(|| async { StatusCode::NOT_FOUND })),
    )
    .await;

    let mut config = AppConfig::default();
    config.rendering.enabled = false;
    let app = setup_real_app(config);

    let body: Value = app
        .post("/check-link")
        .json(&json!({"url": format!("http://{}/gone", target)}))
        .send()
        .await
        .json()
        .await;

    assert_eq!(body["status"], "warning");
    let warnings = body["warnings"].as_array().unwrap();
    // Nothing serves TLS on 127.0.0.1:443, so the certificate check flags it too
    assert_eq!(
        warnings.last().unwrap(),
        &json!({"type": "Broken Link", "reason": "HTTP error: 404"})
    );
    assert!(warnings
        .iter()
        .all(|w| w["type"] == "SSL Issue" || w["type"] == "Broken Link"));
}
