//! Session lifecycle and connection status
//!
//! A session connects to the remote model once when it starts. A failed
//! attempt leaves it disconnected until the page asks for a reconnect.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use nscan_common::events::NeuroScanEvent;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::find_session;
use crate::presentation::ConnectionView;
use crate::{ApiError, ApiResult, AppState};

/// Started session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub connection: ConnectionView,
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", axum::routing::delete(end_session))
        .route("/api/sessions/:id/connection", get(connection_status))
        .route("/api/sessions/:id/reconnect", post(reconnect))
        .route("/api/sessions/:id/events", get(super::sse::session_event_stream))
}

/// POST /api/sessions
///
/// Starts a session and attempts the classifier connection. Always 201; a
/// failed connection is reported in the body, not as an error.
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.sessions.create(state.connector.as_ref()).await;
    let session = session.lock().await;

    info!(session_id = %session.id, connected = session.is_connected(), "Session started");

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.id,
            started_at: session.started_at,
            connection: ConnectionView::from(&session.connection),
        }),
    )
}

/// DELETE /api/sessions/:id
///
/// Ends the session; its history is discarded.
pub async fn end_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session {}", id)))
    }
}

/// GET /api/sessions/:id/connection
pub async fn connection_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ConnectionView>> {
    let session = find_session(&state, id).await?;
    let session = session.lock().await;
    Ok(Json(ConnectionView::from(&session.connection)))
}

/// POST /api/sessions/:id/reconnect
///
/// Replaces the session's connection with a fresh attempt.
pub async fn reconnect(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ConnectionView>> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;

    let connected = session.reconnect(state.connector.as_ref()).await.is_connected();
    state.event_bus.emit_lossy(NeuroScanEvent::ConnectionChanged {
        session_id: id,
        connected,
        timestamp: Utc::now(),
    });

    Ok(Json(ConnectionView::from(&session.connection)))
}
