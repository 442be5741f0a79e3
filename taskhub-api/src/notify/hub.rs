/// In-process WebSocket session hub
///
/// Tracks every live session by user id and implements [`Notifier`] on top
/// of two delivery paths:
///
/// - per-user: an unbounded mpsc sender per session, registered under the
///   authenticated user's id at connection time
/// - global: a tokio broadcast channel every session subscribes to
///
/// The hub is single-process by design; scaling fan-out across instances is
/// an open question tracked in DESIGN.md.
///
/// ```text
/// TaskService ──emit_to_user/emit_global──> EventHub
///                                             │
///                 ┌───────────────────────────┤
///                 ▼                           ▼
///          mpsc (per session)          broadcast (all)
///                 │                           │
///                 └──────> WebSocket task ────┘
/// ```

use super::{Notifier, WsEvent};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Capacity of the global broadcast channel
///
/// Sessions that lag behind this many events start losing broadcasts;
/// delivery is best-effort.
const BROADCAST_CAPACITY: usize = 256;

/// Receiving side of one registered session
pub struct SessionReceiver {
    /// Per-user (targeted) events
    pub direct: mpsc::UnboundedReceiver<WsEvent>,

    /// Global broadcasts
    pub global: broadcast::Receiver<WsEvent>,
}

/// Session hub and [`Notifier`] implementation
pub struct EventHub {
    sessions: RwLock<HashMap<i64, Vec<mpsc::UnboundedSender<WsEvent>>>>,
    broadcast: broadcast::Sender<WsEvent>,
}

impl EventHub {
    /// Creates an empty hub
    pub fn new() -> Self {
        let (broadcast, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            sessions: RwLock::new(HashMap::new()),
            broadcast,
        }
    }

    /// Registers a session for a user
    ///
    /// The session is auto-subscribed to its own per-user address and to
    /// global broadcasts. Dropping the returned receiver is how a session
    /// unregisters; the dead sender is pruned on the next targeted emit.
    pub async fn register(&self, user_id: i64) -> SessionReceiver {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut sessions = self.sessions.write().await;
        sessions.entry(user_id).or_default().push(tx);

        tracing::debug!(user_id, "WebSocket session registered");

        SessionReceiver {
            direct: rx,
            global: self.broadcast.subscribe(),
        }
    }

    /// Number of live sessions registered for a user
    ///
    /// Counts senders whose receiving side is still alive.
    pub async fn session_count(&self, user_id: i64) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .get(&user_id)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for EventHub {
    async fn emit_to_user(&self, user_id: i64, event: &str, payload: JsonValue) {
        let frame = WsEvent::new(event, payload);

        let mut sessions = self.sessions.write().await;
        let Some(senders) = sessions.get_mut(&user_id) else {
            // No live session for this user: drop silently
            tracing::debug!(user_id, event, "No sessions, event dropped");
            return;
        };

        // Deliver and prune senders whose session is gone
        senders.retain(|tx| tx.send(frame.clone()).is_ok());
        if senders.is_empty() {
            sessions.remove(&user_id);
        }
    }

    async fn emit_global(&self, event: &str, payload: JsonValue) {
        let frame = WsEvent::new(event, payload);

        // Err means zero subscribers, which is fine for a broadcast
        let delivered = self.broadcast.send(frame).unwrap_or(0);
        tracing::debug!(event, delivered, "Global event broadcast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{TASK_CREATED, TASK_UPDATED};
    use serde_json::json;

    #[tokio::test]
    async fn test_emit_to_user_delivers_to_registered_session() {
        let hub = EventHub::new();
        let mut session = hub.register(1).await;

        hub.emit_to_user(1, TASK_CREATED, json!({"id": 5})).await;

        let frame = session.direct.recv().await.unwrap();
        assert_eq!(frame.event, "taskCreated");
        assert_eq!(frame.data["id"], 5);
    }

    #[tokio::test]
    async fn test_emit_to_user_skips_other_users() {
        let hub = EventHub::new();
        let mut mine = hub.register(1).await;
        let mut theirs = hub.register(2).await;

        hub.emit_to_user(1, TASK_CREATED, json!({})).await;

        assert!(mine.direct.recv().await.is_some());
        assert!(theirs.direct.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_to_user_without_sessions_is_silent() {
        let hub = EventHub::new();
        // Must not panic or block
        hub.emit_to_user(99, TASK_CREATED, json!({})).await;
    }

    #[tokio::test]
    async fn test_global_reaches_every_session() {
        let hub = EventHub::new();
        let mut a = hub.register(1).await;
        let mut b = hub.register(2).await;

        hub.emit_global(TASK_UPDATED, json!({"id": 3})).await;

        assert_eq!(a.global.recv().await.unwrap().event, "taskUpdated");
        assert_eq!(b.global.recv().await.unwrap().event, "taskUpdated");
    }

    #[tokio::test]
    async fn test_dead_sessions_are_pruned() {
        let hub = EventHub::new();
        let session = hub.register(1).await;
        drop(session);

        hub.emit_to_user(1, TASK_CREATED, json!({})).await;

        assert_eq!(hub.session_count(1).await, 0);
    }

    #[tokio::test]
    async fn test_multiple_sessions_per_user() {
        let hub = EventHub::new();
        let mut first = hub.register(1).await;
        let mut second = hub.register(1).await;

        hub.emit_to_user(1, TASK_CREATED, json!({"id": 1})).await;

        assert!(first.direct.recv().await.is_some());
        assert!(second.direct.recv().await.is_some());
    }
}
