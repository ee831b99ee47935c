pub mod check_link;

use crate::app::AppState;
use axum::{routing::get, Router};

// Link check routes
pub fn check_link_routes() -> Router<AppState> {
    Router::new().route(
        "/check-link",
        get(check_link::check_link_get).post(check_link::check_link_post),
    )
}
