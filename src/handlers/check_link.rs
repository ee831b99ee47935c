// Check-link endpoint: validate input, run the assessment, serialize the verdict

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    app::AppState,
    models::{CheckLinkQuery, CheckLinkRequest, CheckLinkResponse},
    utils::{url_validator::TargetUrl, ServiceError},
};

/// GET /check-link?url=<url>
pub async fn check_link_get(
    State(state): State<AppState>,
    Query(query): Query<CheckLinkQuery>,
) -> Result<Json<CheckLinkResponse>, ServiceError> {
    check_link(&state, query.url).await
}

/// POST /check-link with `{"url": "<url>"}`
pub async fn check_link_post(
    State(state): State<AppState>,
    payload: Result<Json<CheckLinkRequest>, JsonRejection>,
) -> Result<Json<CheckLinkResponse>, ServiceError> {
    let url = match payload {
        Ok(Json(request)) => request.url,
        Err(rejection) => {
            debug!("Rejected check-link body: {}", rejection.body_text());
            return Err(ServiceError::MalformedBody(rejection.body_text()));
        },
    };
    check_link(&state, url).await
}

async fn check_link(
    state: &AppState,
    raw_url: Option<String>,
) -> Result<Json<CheckLinkResponse>, ServiceError> {
    let raw_url = raw_url
        .filter(|u| !u.trim().is_empty())
        .ok_or(ServiceError::MissingUrl)?;

    let target = TargetUrl::parse(&raw_url).map_err(|e| {
        debug!("Rejected URL {:?}: {}", raw_url, e);
        ServiceError::from(e)
    })?;

    info!("Checking {}", target);

    // Dropped with this future when the client disconnects
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    let result = state.orchestrator.assess(target, cancel).await;
    Ok(Json(CheckLinkResponse::from(result)))
}
