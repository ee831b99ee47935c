use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderValue},
        Method, Request, Response, StatusCode,
    },
    middleware::Next,
};
use tracing::debug;

use crate::app::AppState;

/// Dynamic CORS middleware. Outside production a `*` entry reflects any
/// origin; otherwise only whitelisted origins are echoed back.
pub async fn dynamic_cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let config = &state.config;

    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let has_wildcard = config.server.cors_allowed_origins.iter().any(|o| o == "*");

    let allowed_origin = if has_wildcard && !config.is_production() {
        debug!("CORS: Reflecting origin: {:?}", origin);
        origin
    } else {
        origin.filter(|req_origin| {
            let allowed = config.server.cors_allowed_origins.contains(req_origin);
            debug!("CORS: Origin {} allowed: {}", req_origin, allowed);
            allowed
        })
    };
    let allowed_origin = allowed_origin.and_then(|o| HeaderValue::from_str(&o).ok());

    // Preflight
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());

        if let Some(allowed) = allowed_origin {
            let headers = response.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type, accept, origin, x-requested-with"),
            );
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("3600"));
        }

        *response.status_mut() = StatusCode::NO_CONTENT;
        return response;
    }

    let mut response = next.run(req).await;

    if let Some(allowed) = allowed_origin {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
        response
            .headers_mut()
            .insert(header::VARY, HeaderValue::from_static("Origin"));
    }

    response
}
