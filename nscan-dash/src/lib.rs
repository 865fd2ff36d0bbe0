//! nscan-dash library - brain MRI classification dashboard
//!
//! Uploads go through the [`pipeline`] to a remote model reached via
//! [`classifier`]; results land in per-session [`history`] and are shaped for
//! the page by [`presentation`].

pub mod api;
pub mod classifier;
pub mod confidence;
pub mod config;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod presentation;
pub mod session;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use classifier::Connector;
use nscan_common::events::EventBus;
use pipeline::AnalysisPipeline;
use session::SessionRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Event bus capacity per subscriber
const EVENT_CAPACITY: usize = 100;

/// Bounds on how often idle sessions are swept
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Live dashboard sessions
    pub sessions: SessionRegistry,
    /// Produces connections for new sessions and reconnects
    pub connector: Arc<dyn Connector>,
    /// Analysis pipeline (transient storage + classification)
    pub pipeline: AnalysisPipeline,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Largest accepted upload body
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(connector: Arc<dyn Connector>, temp_dir: PathBuf, max_upload_bytes: usize) -> Self {
        let event_bus = EventBus::new(EVENT_CAPACITY);
        Self {
            sessions: SessionRegistry::new(event_bus.clone()),
            connector,
            pipeline: AnalysisPipeline::new(temp_dir, event_bus.clone()),
            event_bus,
            max_upload_bytes,
            startup_time: Utc::now(),
        }
    }

    /// Start expiring sessions unseen for `idle_ttl`
    ///
    /// Sweeps at a quarter of the TTL, kept between 1 s and 60 s.
    pub fn spawn_session_reaper(&self, idle_ttl: Duration) -> JoinHandle<()> {
        let sweep_interval = (idle_ttl / 4).clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);
        self.sessions.spawn_reaper(idle_ttl, sweep_interval)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .merge(api::ui_routes())
        .merge(api::session_routes())
        .merge(api::analysis_routes())
        .merge(api::history_routes())
        .merge(api::health_routes())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
