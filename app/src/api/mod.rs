//! HTTP API.

mod health;
mod sessions;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route(
            "/api/scraper/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/api/scraper/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/scraper/sessions/{id}/stop", post(sessions::stop_session))
        .route(
            "/api/scraper/sessions/{id}/businesses",
            get(sessions::list_businesses),
        )
        .route(
            "/api/scraper/sessions/{id}/retries",
            post(sessions::process_retries),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
