/// Real-time notification channel
///
/// The task pipeline never touches a socket directly: it talks to the
/// [`Notifier`] trait, and the WebSocket [`hub::EventHub`] is the production
/// implementation. Tests inject a recording implementation instead.
///
/// Delivery is fire-and-forget on both primitives: a user with no live
/// sessions is silently skipped (no queuing, no retry), and a slow or gone
/// client never blocks the mutation path.

pub mod hub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Event emitted when a task is created (targeted)
pub const TASK_CREATED: &str = "taskCreated";

/// Event emitted to a task's new assignee (targeted)
pub const TASK_ASSIGNED: &str = "taskAssigned";

/// Event emitted when a task changes (global broadcast)
pub const TASK_UPDATED: &str = "taskUpdated";

/// Event emitted when a task is deleted (global broadcast)
pub const TASK_DELETED: &str = "taskDeleted";

/// Connection acknowledgement sent after successful authentication
pub const CONNECTED: &str = "connected";

/// Connection-time error event sent before closing
pub const ERROR: &str = "error";

/// One event frame as delivered to a client
///
/// Serialized as JSON text: `{"event": "...", "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEvent {
    /// Event name
    pub event: String,

    /// Event payload
    pub data: JsonValue,
}

impl WsEvent {
    /// Creates an event frame
    pub fn new(event: &str, data: JsonValue) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }
}

/// Capability to push events to connected clients
///
/// Injected into the task mutation service so the core can be exercised
/// without a live transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers an event to every live session of one user
    ///
    /// Silently drops the event if the user has no connected sessions.
    async fn emit_to_user(&self, user_id: i64, event: &str, payload: JsonValue);

    /// Delivers an event to every connected session regardless of identity
    async fn emit_global(&self, event: &str, payload: JsonValue);
}
