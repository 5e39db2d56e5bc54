//! Scraper session endpoints.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use leadscout_core::SessionStatus;
use leadscout_db::businesses::{self, ScrapedBusiness};
use leadscout_db::sessions::{self, ScrapingSession};
use leadscout_scraper::{RetryReport, SessionRequest};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub status: String,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let Json(request) = payload?;
    let id = state.orchestrator.start_session(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            id,
            status: SessionStatus::Running.to_string(),
        }),
    ))
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ScrapingSession>>, ApiError> {
    Ok(Json(sessions::list_sessions(state.database().pool()).await?))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScrapingSession>, ApiError> {
    let session = find_session(&state, &id).await?;
    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.orchestrator.delete_session(&id).await? {
        tracing::info!("Deleted session {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::session_not_found(&id))
    }
}

pub async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    if state.orchestrator.stop_session(&id) {
        return Ok((
            StatusCode::ACCEPTED,
            Json(SessionResponse {
                id,
                status: "stopping".to_string(),
            }),
        ));
    }

    let session = find_session(&state, &id).await?;
    Err(ApiError::Conflict(format!(
        "Session '{}' is not running ({})",
        session.id, session.status
    )))
}

pub async fn list_businesses(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ScrapedBusiness>>, ApiError> {
    find_session(&state, &id).await?;
    Ok(Json(
        businesses::get_by_session(state.database().pool(), &id).await?,
    ))
}

pub async fn process_retries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RetryReport>, ApiError> {
    Ok(Json(state.orchestrator.process_retry_queue(&id).await?))
}

async fn find_session(state: &AppState, id: &str) -> Result<ScrapingSession, ApiError> {
    sessions::get_by_id(state.database().pool(), id)
        .await?
        .ok_or_else(|| ApiError::session_not_found(id))
}
