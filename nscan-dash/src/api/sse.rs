//! Server-Sent Events (SSE) for analysis progress

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use uuid::Uuid;

use super::find_session;
use crate::{ApiResult, AppState};

/// GET /api/sessions/:id/events
///
/// Streams the session's AnalysisStarted, AnalysisCompleted,
/// AnalysisFailed and ConnectionChanged events. Closes after the
/// SessionEnded event once the session is deleted or expires.
pub async fn session_event_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    find_session(&state, id).await?;
    Ok(nscan_common::sse::create_session_sse_stream(&state.event_bus, id))
}
