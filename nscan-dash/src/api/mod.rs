//! HTTP API handlers for nscan-dash
//!
//! Sessions are explicit: the page starts one with `POST /api/sessions` and
//! addresses every later request to `/api/sessions/:id/...`.

pub mod analysis;
pub mod health;
pub mod history;
pub mod sessions;
pub mod sse;
pub mod ui;

pub use analysis::analysis_routes;
pub use health::health_routes;
pub use history::history_routes;
pub use sessions::session_routes;
pub use ui::ui_routes;

use crate::session::Session;
use crate::{ApiError, ApiResult, AppState};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Look up a live session or fail with 404
pub(crate) async fn find_session(state: &AppState, id: Uuid) -> ApiResult<Arc<Mutex<Session>>> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))
}
