/// Append-only audit sink for task lifecycle events
///
/// Every task mutation appends an [`AuditEntry`] describing what happened.
/// The sink is purely observational: entries are never read back by the
/// pipeline, and a failed append must never fail or roll back the mutation
/// that produced it; callers log the error and move on.
///
/// The production sink writes entries to a Redis stream via XADD, one
/// stream for the whole log.
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::audit::{AuditEntry, AuditSink, RedisAuditSink};
/// use taskhub_shared::redis::client::{RedisClient, RedisConfig};
/// use serde_json::json;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = RedisClient::new(RedisConfig::from_env()?).await?;
/// let sink = RedisAuditSink::new(client);
///
/// sink.append(AuditEntry::new(
///     "task.created",
///     17,
///     Some(1),
///     json!({"title": "Deploy"}),
/// ))
/// .await?;
/// # Ok(())
/// # }
/// ```

use crate::redis::client::{RedisClient, RedisClientError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Audit event name for task creation
pub const TASK_CREATED: &str = "task.created";

/// Audit event name for task updates
pub const TASK_UPDATED: &str = "task.updated";

/// Audit event name for task deletion
pub const TASK_DELETED: &str = "task.deleted";

/// Redis stream key holding the audit log
const AUDIT_STREAM_KEY: &str = "audit:log";

/// Audit sink errors
#[derive(Error, Debug)]
pub enum AuditError {
    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] RedisClientError),

    /// Raw Redis command error
    #[error("Redis command error: {0}")]
    RedisCommand(#[from] redis::RedisError),

    /// Payload serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One audit log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Event name (e.g., "task.created")
    pub event: String,

    /// Task the event concerns
    pub task_id: i64,

    /// User who triggered the event, if attributable
    pub user_id: Option<i64>,

    /// Event-specific payload
    pub payload: JsonValue,

    /// When the event occurred
    pub ts: DateTime<Utc>,
}

impl AuditEntry {
    /// Creates an entry timestamped now
    pub fn new(
        event: &str,
        task_id: i64,
        user_id: Option<i64>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event: event.to_string(),
            task_id,
            user_id,
            payload,
            ts: Utc::now(),
        }
    }
}

/// Destination for audit entries
///
/// Injected into the task service as a trait object so tests can record
/// appends without a live backend.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one entry to the log
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

/// Audit sink backed by a Redis stream
#[derive(Clone)]
pub struct RedisAuditSink {
    client: RedisClient,
}

impl RedisAuditSink {
    /// Creates a sink on top of an existing Redis client
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuditSink for RedisAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let payload = serde_json::to_string(&entry.payload)?;

        let fields: Vec<(&str, String)> = vec![
            ("event", entry.event.clone()),
            ("task_id", entry.task_id.to_string()),
            (
                "user_id",
                entry.user_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            ("payload", payload),
            ("ts", entry.ts.to_rfc3339()),
        ];

        let mut conn = self.client.get_connection();
        let stream_id: String = conn.xadd(AUDIT_STREAM_KEY, "*", &fields).await?;

        tracing::debug!(
            event = %entry.event,
            task_id = entry.task_id,
            stream_id = %stream_id,
            "Audit entry appended"
        );

        Ok(())
    }
}
