//! History and statistics endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::find_session;
use crate::history::HISTORY_CAPACITY;
use crate::presentation::{history_entries, HistoryEntryView, StatisticsView};
use crate::{ApiResult, AppState};

/// Query parameters for history listing
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Number of entries (most recent first)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    3
}

/// Build history routes
pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions/:id/history", get(get_history))
        .route("/api/sessions/:id/statistics", get(get_statistics))
}

/// GET /api/sessions/:id/history?limit=n
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<HistoryEntryView>>> {
    let session = find_session(&state, id).await?;
    let session = session.lock().await;

    let limit = query.limit.min(HISTORY_CAPACITY);
    Ok(Json(history_entries(&session.history, limit)))
}

/// GET /api/sessions/:id/statistics
pub async fn get_statistics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatisticsView>> {
    let session = find_session(&state, id).await?;
    let session = session.lock().await;
    Ok(Json(StatisticsView::from(&session.history)))
}
