//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Bodies up to this many times the letter limit reach the size check, so
/// moderately oversized files get the "too big" page rather than a bare 413.
const BODY_LIMIT_FACTOR: usize = 4;

pub fn setup_routes(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_letter_size_bytes * BODY_LIMIT_FACTOR;

    Router::new()
        .route(
            "/services/{service_id}/upload-letter",
            post(handlers::upload::upload_letter),
        )
        .route(
            "/services/{service_id}/preview-letter/{file_id}",
            get(handlers::preview::preview_letter),
        )
        .route(
            "/services/{service_id}/preview-letter-image/{file_id}",
            get(handlers::preview::preview_letter_image),
        )
        .route(
            "/services/{service_id}/send-letter",
            post(handlers::send::send_letter),
        )
        .route("/_status", get(handlers::status::status))
        .route("/health", get(handlers::status::health))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
