//! Dashboard sessions
//!
//! A [`Session`] is one user's independent context: its connection to the
//! remote model and its analysis history. Sessions share no mutable state.
//! The [`SessionRegistry`] puts each session behind its own mutex, so
//! requests within a session run one at a time.
//!
//! A session ends on an explicit delete or after going unseen for the idle
//! TTL; either way a `SessionEnded` event closes its event stream.

use crate::classifier::{ConnectionState, Connector};
use crate::history::HistoryStore;
use chrono::{DateTime, Utc};
use nscan_common::events::{EventBus, NeuroScanEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One user's dashboard context
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub connection: ConnectionState,
    pub history: HistoryStore,
}

impl Session {
    /// Start a session: connect once, empty history
    pub async fn start(id: Uuid, connector: &dyn Connector) -> Self {
        let connection = connector.connect().await;
        log_connection(id, &connection);

        Self {
            id,
            started_at: Utc::now(),
            connection,
            history: HistoryStore::new(),
        }
    }

    /// Replace the connection with a fresh attempt
    ///
    /// History is kept.
    pub async fn reconnect(&mut self, connector: &dyn Connector) -> &ConnectionState {
        self.connection = connector.connect().await;
        log_connection(self.id, &self.connection);
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}

fn log_connection(session_id: Uuid, connection: &ConnectionState) {
    match connection.failure_reason() {
        None => info!(%session_id, "Session connected to remote classifier"),
        Some(reason) => warn!(%session_id, reason, "Session has no classifier connection"),
    }
}

/// Why a session left the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// Ended by the page (`DELETE /api/sessions/:id`)
    Closed,
    /// Unseen for longer than the idle TTL
    Expired,
}

impl SessionEndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEndReason::Closed => "closed",
            SessionEndReason::Expired => "expired",
        }
    }
}

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// Live sessions keyed by id
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    event_bus: EventBus,
}

impl SessionRegistry {
    /// Empty registry announcing session ends on `event_bus`
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            event_bus,
        }
    }

    /// Start and register a new session
    pub async fn create(&self, connector: &dyn Connector) -> Arc<Mutex<Session>> {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::start(id, connector).await));
        self.sessions.write().await.insert(
            id,
            SessionEntry {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
        session
    }

    /// Look up a live session and mark it as seen
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// End a session; returns false if it did not exist
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            self.announce_end(id, SessionEndReason::Closed);
        }
        removed
    }

    /// Drop every session unseen for at least `idle_ttl`
    ///
    /// A session with a request in flight is kept regardless of age.
    /// Returns the ids that were dropped.
    pub async fn expire_idle(&self, idle_ttl: Duration) -> Vec<Uuid> {
        let now = Instant::now();
        let mut expired = Vec::new();

        self.sessions.write().await.retain(|id, entry| {
            let idle = now.duration_since(entry.last_seen) >= idle_ttl;
            let in_use = Arc::strong_count(&entry.session) > 1;
            if idle && !in_use {
                expired.push(*id);
                false
            } else {
                true
            }
        });

        for id in &expired {
            self.announce_end(*id, SessionEndReason::Expired);
        }
        expired
    }

    /// Spawn the background task expiring idle sessions every `sweep_interval`
    pub fn spawn_reaper(&self, idle_ttl: Duration, sweep_interval: Duration) -> JoinHandle<()> {
        info!(
            "Starting session reaper (idle TTL: {}s, sweep: {}ms)",
            idle_ttl.as_secs(),
            sweep_interval.as_millis()
        );

        let registry = self.clone();
        tokio::spawn(async move {
            let mut timer = interval(sweep_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;
                let expired = registry.expire_idle(idle_ttl).await;
                if !expired.is_empty() {
                    debug!(count = expired.len(), "Idle sessions expired");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn announce_end(&self, session_id: Uuid, reason: SessionEndReason) {
        info!(%session_id, reason = reason.as_str(), "Session ended");
        self.event_bus.emit_lossy(NeuroScanEvent::SessionEnded {
            session_id,
            reason: reason.as_str().to_string(),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassificationResult, Classifier, Prediction};
    use crate::history::AnalysisRecord;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullClassifier;

    #[async_trait]
    impl Classifier for NullClassifier {
        fn endpoint(&self) -> &str {
            "null"
        }

        async fn classify(&self, _image_path: &Path) -> ClassificationResult {
            Ok(Prediction {
                label: "No Tumor".to_string(),
                confidence_percent: 99.0,
            })
        }
    }

    /// Fails the first `failures` attempts, then connects
    struct FlakyConnector {
        failures: usize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        async fn connect(&self) -> ConnectionState {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                ConnectionState::disconnected("unreachable")
            } else {
                ConnectionState::Connected(Arc::new(NullClassifier))
            }
        }
    }

    #[tokio::test]
    async fn test_reconnect_recovers_and_keeps_history() {
        let connector = FlakyConnector {
            failures: 1,
            attempts: AtomicUsize::new(0),
        };

        let mut session = Session::start(Uuid::new_v4(), &connector).await;
        assert!(!session.is_connected());
        assert_eq!(session.connection.failure_reason(), Some("unreachable"));

        session.history.append(AnalysisRecord::new("a.png", "Glioma", 90.0));

        let state = session.reconnect(&connector).await;
        assert!(state.is_connected());
        assert_eq!(session.history.len(), 1);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_registry_sessions_are_independent() {
        let connector = FlakyConnector {
            failures: 0,
            attempts: AtomicUsize::new(0),
        };
        let registry = SessionRegistry::new(EventBus::new(8));

        let first = registry.create(&connector).await;
        let second = registry.create(&connector).await;
        assert_eq!(registry.len().await, 2);

        let first_id = {
            let mut session = first.lock().await;
            session.history.append(AnalysisRecord::new("a.png", "Glioma", 90.0));
            session.id
        };
        let second_id = second.lock().await.id;
        assert_ne!(first_id, second_id);
        assert!(second.lock().await.history.is_empty());

        assert!(registry.get(first_id).await.is_some());
        assert!(registry.remove(first_id).await);
        assert!(!registry.remove(first_id).await);
        assert!(registry.get(first_id).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_announces_end() {
        let connector = FlakyConnector {
            failures: 0,
            attempts: AtomicUsize::new(0),
        };
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let registry = SessionRegistry::new(bus);

        let id = registry.create(&connector).await.lock().await.id;
        assert!(registry.remove(id).await);

        match events.recv().await.unwrap() {
            NeuroScanEvent::SessionEnded {
                session_id, reason, ..
            } => {
                assert_eq!(session_id, id);
                assert_eq!(reason, "closed");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_expire_idle_drops_unseen_sessions() {
        let connector = FlakyConnector {
            failures: 0,
            attempts: AtomicUsize::new(0),
        };
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let registry = SessionRegistry::new(bus);

        let id = registry.create(&connector).await.lock().await.id;

        assert!(registry.expire_idle(Duration::from_secs(3600)).await.is_empty());
        assert_eq!(registry.len().await, 1);

        assert_eq!(registry.expire_idle(Duration::ZERO).await, vec![id]);
        assert!(registry.is_empty().await);
        assert!(registry.get(id).await.is_none());

        let event = events.recv().await.unwrap();
        assert_eq!(event.event_type(), "SessionEnded");
        assert_eq!(event.session_id(), id);
    }

    #[tokio::test]
    async fn test_session_in_use_is_not_expired() {
        let connector = FlakyConnector {
            failures: 0,
            attempts: AtomicUsize::new(0),
        };
        let registry = SessionRegistry::new(EventBus::new(8));

        let held = registry.create(&connector).await;
        assert!(registry.expire_idle(Duration::ZERO).await.is_empty());
        assert_eq!(registry.len().await, 1);

        drop(held);
        assert_eq!(registry.expire_idle(Duration::ZERO).await.len(), 1);
    }

    #[tokio::test]
    async fn test_reaper_reclaims_abandoned_sessions() {
        let connector = FlakyConnector {
            failures: 0,
            attempts: AtomicUsize::new(0),
        };
        let registry = SessionRegistry::new(EventBus::new(256));

        for _ in 0..200 {
            registry.create(&connector).await;
        }
        assert_eq!(registry.len().await, 200);

        let reaper = registry.spawn_reaper(Duration::ZERO, Duration::from_millis(10));
        for _ in 0..100 {
            if registry.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        reaper.abort();

        assert!(registry.is_empty().await);
    }
}
