//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE implementation for NeuroScan services.

use crate::events::EventBus;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Heartbeat interval for all SSE streams
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Create an SSE stream forwarding one session's events
///
/// Sends an initial `ConnectionStatus` event, then every event on `event_bus`
/// whose session matches `session_id`, with a heartbeat comment every 15
/// seconds. The stream ends after forwarding the session's `SessionEnded`
/// event.
pub fn create_session_sse_stream(
    event_bus: &EventBus,
    session_id: Uuid,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(%session_id, "New SSE client connected");

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        let mut open = true;
        while open {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        // Other sessions' events are dropped
                        Ok(event) if event.session_id() == session_id => {
                            let event_type = event.event_type();
                            match serde_json::to_string(&event) {
                                Ok(event_json) => {
                                    debug!("SSE: Broadcasting event: {}", event_type);
                                    yield Ok(Event::default()
                                        .event(event_type)
                                        .data(event_json));
                                }
                                Err(e) => {
                                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                                }
                            }
                            open = !event.ends_session();
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(%session_id, skipped, "SSE: Client lagged, events dropped");
                        }
                        Err(RecvError::Closed) => {
                            open = false;
                        }
                    }
                }
            }
        }

        info!(%session_id, "SSE stream closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
