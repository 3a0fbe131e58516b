//! HTTP request handlers

use super::types::{CreateSessionRequest, ErrorResponse, SessionResponse, TimelineResponse};
use super::AppState;
use crate::engine::TurnOutcome;
use crate::error::EngineError;
use crate::event::InboundEvent;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/events", post(post_event))
        .route("/api/sessions/:id/timeline", get(get_timeline))
        .route("/api/sessions/:id/replay", get(get_replay))
        .with_state(state)
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    if req.main_objective.is_empty() {
        return Err(AppError::from(EngineError::Validation(
            "main_objective must not be empty".to_string(),
        )));
    }
    let session = state
        .engine
        .create_session(&req.entry_id, &req.domain, &req.main_objective);
    Ok(Json(SessionResponse { session }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.engine.snapshot(&id)?;
    Ok(Json(SessionResponse { session }))
}

async fn post_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(inbound): Json<InboundEvent>,
) -> Result<Json<TurnOutcome>, AppError> {
    let outcome = state.engine.on_event(&id, inbound).await?;
    Ok(Json(outcome))
}

async fn get_timeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TimelineResponse>, AppError> {
    // Confirm the session exists so an unknown id is 404, not an
    // empty timeline
    state.engine.snapshot(&id)?;
    Ok(Json(TimelineResponse {
        events: state.engine.timeline(&id),
    }))
}

/// Audit endpoint: the snapshot rebuilt from scratch off the timeline
async fn get_replay(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.engine.rebuild_snapshot(&id)?;
    Ok(Json(SessionResponse { session }))
}

/// Transport-level error wrapper
struct AppError(EngineError);

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::External(_) => StatusCode::BAD_GATEWAY,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
