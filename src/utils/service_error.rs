// Request-level errors for the check-link endpoint
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::CheckLinkResponse;
use crate::utils::url_validator::ValidationError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No URL provided")]
    MissingUrl,

    #[error("{0}")]
    InvalidUrl(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::MissingUrl => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "No URL provided" })),
            )
                .into_response(),
            ServiceError::InvalidUrl(msg) => {
                (StatusCode::BAD_REQUEST, Json(CheckLinkResponse::broken(msg))).into_response()
            },
            ServiceError::MalformedBody(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Malformed request body: {}", msg) })),
            )
                .into_response(),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::Empty => ServiceError::MissingUrl,
            other => ServiceError::InvalidUrl(other.to_string()),
        }
    }
}
