//! Event types for the NeuroScan event system
//!
//! Provides the shared event enum and the EventBus used to drive the
//! dashboard's live status over SSE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// NeuroScan event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// Every event belongs to exactly one dashboard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NeuroScanEvent {
    /// Image accepted; remote classification is starting
    AnalysisStarted {
        session_id: Uuid,
        image_name: String,
        timestamp: DateTime<Utc>,
    },

    /// Remote classification returned a prediction
    AnalysisCompleted {
        session_id: Uuid,
        image_name: String,
        label: String,
        confidence_percent: f64,
        timestamp: DateTime<Utc>,
    },

    /// Remote classification failed; nothing was recorded
    AnalysisFailed {
        session_id: Uuid,
        image_name: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Session connection state changed (start or reconnect)
    ConnectionChanged {
        session_id: Uuid,
        connected: bool,
        timestamp: DateTime<Utc>,
    },

    /// Session left the registry ("closed" or "expired"); its stream ends here
    SessionEnded {
        session_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl NeuroScanEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            NeuroScanEvent::AnalysisStarted { .. } => "AnalysisStarted",
            NeuroScanEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            NeuroScanEvent::AnalysisFailed { .. } => "AnalysisFailed",
            NeuroScanEvent::ConnectionChanged { .. } => "ConnectionChanged",
            NeuroScanEvent::SessionEnded { .. } => "SessionEnded",
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            NeuroScanEvent::AnalysisStarted { session_id, .. }
            | NeuroScanEvent::AnalysisCompleted { session_id, .. }
            | NeuroScanEvent::AnalysisFailed { session_id, .. }
            | NeuroScanEvent::ConnectionChanged { session_id, .. }
            | NeuroScanEvent::SessionEnded { session_id, .. } => *session_id,
        }
    }

    /// Whether this is the last event of its session
    pub fn ends_session(&self) -> bool {
        matches!(self, NeuroScanEvent::SessionEnded { .. })
    }
}

/// Broadcast bus for NeuroScan events
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NeuroScanEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<NeuroScanEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: NeuroScanEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let session_id = Uuid::new_v4();
        let event = NeuroScanEvent::AnalysisCompleted {
            session_id,
            image_name: "scan.png".to_string(),
            label: "Glioma".to_string(),
            confidence_percent: 92.0,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AnalysisCompleted");
        assert_eq!(json["label"], "Glioma");
        assert_eq!(event.event_type(), "AnalysisCompleted");
        assert_eq!(event.session_id(), session_id);
    }

    #[test]
    fn test_session_ended_is_terminal() {
        let event = NeuroScanEvent::SessionEnded {
            session_id: Uuid::new_v4(),
            reason: "expired".to_string(),
            timestamp: Utc::now(),
        };
        assert!(event.ends_session());
        assert_eq!(event.event_type(), "SessionEnded");

        let event = NeuroScanEvent::ConnectionChanged {
            session_id: Uuid::new_v4(),
            connected: true,
            timestamp: Utc::now(),
        };
        assert!(!event.ends_session());
    }

    #[test]
    fn test_emit_lossy_without_subscribers() {
        let bus = EventBus::new(8);
        bus.emit_lossy(NeuroScanEvent::ConnectionChanged {
            session_id: Uuid::new_v4(),
            connected: true,
            timestamp: Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let session_id = Uuid::new_v4();
        bus.emit_lossy(NeuroScanEvent::AnalysisStarted {
            session_id,
            image_name: "scan.png".to_string(),
            timestamp: Utc::now(),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "AnalysisStarted");
        assert_eq!(received.session_id(), session_id);
    }
}
