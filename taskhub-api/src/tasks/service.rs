/// Task mutation service
///
/// Orchestrates every task operation: authorize → persist → audit → notify
/// → evict the actor's cache entry. Persistence failures are fatal and
/// surface to the caller; audit and notification run only after persistence
/// succeeds and are fire-and-forget (logged, never propagated). A cache
/// backend failure degrades reads to storage and is never an error.
///
/// Concurrency: concurrent updates to the same task are not serialized
/// here; the storage layer's column-level last-write-wins applies, and
/// exactly-once notification per logical change is not guaranteed under
/// concurrent writers.

use crate::error::{ApiError, ApiResult};
use crate::notify::Notifier;
use crate::tasks::policy::{self, Emit};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use std::sync::Arc;
use taskhub_shared::audit::{self, AuditEntry, AuditSink};
use taskhub_shared::auth::Actor;
use taskhub_shared::cache::ListingCache;
use taskhub_shared::models::task::{CreateTask, Task, TaskStatus, TaskWithUsers, UpdateTask};
use taskhub_shared::models::user::User;

/// Input for creating a task, after request validation
#[derive(Debug, Clone)]
pub struct CreateTaskInput {
    /// Title (non-empty, enforced at the boundary)
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Initial status (defaults to pending)
    pub status: Option<TaskStatus>,

    /// Requested assignee; honored only for admin actors
    pub assigned_to_id: Option<i64>,
}

/// The task mutation service
///
/// Cheap to construct per request; the notifier and audit sink are injected
/// as trait objects so tests can swap in recording implementations.
#[derive(Clone)]
pub struct TaskService {
    db: PgPool,
    cache: ListingCache,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditSink>,
}

impl TaskService {
    /// Creates a service over the given collaborators
    pub fn new(
        db: PgPool,
        cache: ListingCache,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db,
            cache,
            notifier,
            audit,
        }
    }

    /// Creates a task
    ///
    /// Assignment policy: an admin-supplied assignee is honored, everyone
    /// else self-assigns ([`policy::resolve_assignee`]). The creator is
    /// always the actor.
    ///
    /// Side effects, in order after persistence: audit `task.created`,
    /// notification fan-out per [`policy::create_fanout`], eviction of the
    /// actor's listing cache entry.
    ///
    /// # Errors
    ///
    /// - `InternalError` if persistence fails or the task vanishes between
    ///   insert and re-read
    pub async fn create(&self, input: CreateTaskInput, actor: Actor) -> ApiResult<TaskWithUsers> {
        let assigned_to_id = policy::resolve_assignee(actor, input.assigned_to_id);

        let task = Task::create(
            &self.db,
            CreateTask {
                title: input.title,
                description: input.description,
                status: input.status.unwrap_or_default(),
                created_by_id: actor.user_id,
                assigned_to_id: Some(assigned_to_id),
            },
        )
        .await?;

        let saved = Task::find_with_users(&self.db, task.id)
            .await?
            .ok_or_else(|| {
                ApiError::InternalError("Task vanished between insert and re-read".to_string())
            })?;

        let payload = serde_json::to_value(&saved)
            .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;

        self.record_audit(AuditEntry::new(
            audit::TASK_CREATED,
            saved.task.id,
            Some(actor.user_id),
            payload.clone(),
        ))
        .await;

        let admin_ids = User::list_admin_ids(&self.db).await?;
        let plan = policy::create_fanout(actor, saved.task.assigned_to_id, &admin_ids);
        self.dispatch(plan, &payload).await;

        self.cache.evict(actor.user_id, actor.role).await;

        Ok(saved)
    }

    /// Lists tasks visible to the actor, newest-created first
    ///
    /// Admins see every task; regular users only tasks they created or are
    /// assigned to. The listing cache is consulted first under the actor's
    /// `(user_id, role)` key; misses are computed from storage and cached
    /// with the role-dependent TTL.
    pub async fn find_all(&self, actor: Actor) -> ApiResult<Vec<TaskWithUsers>> {
        if let Some(cached) = self.cache.get(actor.user_id, actor.role).await {
            return Ok(cached);
        }

        let listing = if actor.is_admin() {
            Task::list_all_with_users(&self.db).await?
        } else {
            Task::list_owned_with_users(&self.db, actor.user_id).await?
        };

        self.cache.put(actor.user_id, actor.role, &listing).await;

        Ok(listing)
    }

    /// Fetches one task with resolved relations
    ///
    /// No authorization happens here; task-scoped routes enforce ownership
    /// via [`TaskService::authorize_access`] before calling in.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no task with that id exists
    pub async fn find_one(&self, id: i64) -> ApiResult<TaskWithUsers> {
        Task::find_with_users(&self.db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
    }

    /// Ownership check backing the task-scoped routes
    ///
    /// Grants access iff the actor is an admin, the task's creator, or its
    /// current assignee: the same rule `update` enforces internally.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task doesn't exist
    /// - `Forbidden` if the actor has no claim on the task
    pub async fn authorize_access(&self, id: i64, actor: Actor) -> ApiResult<()> {
        let task = Task::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

        if policy::can_modify(actor, &task) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "You can only modify your own tasks".to_string(),
            ))
        }
    }

    /// Applies a patch to a task
    ///
    /// Authorization: admin, creator, or current assignee; anyone else gets
    /// `Forbidden` before any state changes.
    ///
    /// Side effects, in order after persistence: `taskAssigned` to a new
    /// non-null assignee when the patch changed the assignment, one global
    /// `taskUpdated` broadcast, eviction of the actor's cache entry, audit
    /// `task.updated` carrying the old and new assignee.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task doesn't exist
    /// - `Forbidden` if the actor may not modify it
    pub async fn update(
        &self,
        id: i64,
        patch: UpdateTask,
        actor: Actor,
    ) -> ApiResult<TaskWithUsers> {
        let current = Task::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

        if !policy::can_modify(actor, &current) {
            return Err(ApiError::Forbidden(
                "You can only modify your own tasks".to_string(),
            ));
        }

        let old_assignee = current.assigned_to_id;
        let patched_assignee = patch.assigned_to_id;

        Task::update(&self.db, id, patch).await?.ok_or_else(|| {
            ApiError::InternalError("Task vanished during update".to_string())
        })?;

        let updated = Task::find_with_users(&self.db, id).await?.ok_or_else(|| {
            ApiError::InternalError("Task vanished between update and re-read".to_string())
        })?;

        let payload = serde_json::to_value(&updated)
            .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;

        let plan = policy::update_fanout(old_assignee, patched_assignee);
        self.dispatch(plan, &payload).await;

        self.cache.evict(actor.user_id, actor.role).await;

        self.record_audit(AuditEntry::new(
            audit::TASK_UPDATED,
            id,
            Some(actor.user_id),
            json!({
                "oldAssignedToId": old_assignee,
                "newAssignedToId": updated.task.assigned_to_id,
                "task": payload,
            }),
        ))
        .await;

        Ok(updated)
    }

    /// Deletes a task (physical removal)
    ///
    /// Ownership is enforced by the route-level check; this operation adds
    /// no further authorization. Side effects after the delete: audit
    /// `task.deleted`, global `taskDeleted` broadcast carrying `{id}`,
    /// eviction of the actor's cache entry.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task doesn't exist; nothing is audited,
    ///   broadcast, or evicted in that case
    pub async fn remove(&self, id: i64, actor: Actor) -> ApiResult<()> {
        let deleted = Task::delete(&self.db, id).await?;
        if !deleted {
            return Err(ApiError::NotFound("Task not found".to_string()));
        }

        self.record_audit(AuditEntry::new(
            audit::TASK_DELETED,
            id,
            Some(actor.user_id),
            json!({ "id": id }),
        ))
        .await;

        let payload = json!({ "id": id });
        self.dispatch(policy::delete_fanout(), &payload).await;

        self.cache.evict(actor.user_id, actor.role).await;

        Ok(())
    }

    /// Executes a notification plan with the given payload
    ///
    /// Delivery is fire-and-forget; the notifier never errors and never
    /// blocks on slow clients.
    async fn dispatch(&self, plan: Vec<Emit>, payload: &JsonValue) {
        for emit in plan {
            match emit {
                Emit::ToUser { user_id, event } => {
                    self.notifier
                        .emit_to_user(user_id, event, payload.clone())
                        .await;
                }
                Emit::Global { event } => {
                    self.notifier.emit_global(event, payload.clone()).await;
                }
            }
        }
    }

    /// Appends an audit entry, swallowing failures
    ///
    /// The mutation is the source of truth; a broken audit backend must not
    /// fail or roll it back.
    async fn record_audit(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.append(entry).await {
            tracing::warn!("Audit append failed (ignored): {}", e);
        }
    }
}
