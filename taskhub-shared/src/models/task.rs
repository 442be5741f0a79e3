/// Task model and database operations
///
/// Tasks are the mutable work items of the system. Every task has exactly
/// one creator (immutable after insert) and at most one assignee. Removal
/// is a physical delete, there is no soft-delete.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
///
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'pending',
///     created_by_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     assigned_to_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::models::task::{Task, CreateTask, TaskStatus};
/// use taskhub_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     title: "Deploy to production".to_string(),
///     description: Some("Final deployment".to_string()),
///     status: TaskStatus::Pending,
///     created_by_id: 1,
///     assigned_to_id: Some(1),
/// }).await?;
///
/// let with_users = Task::find_with_users(&pool, task.id).await?;
/// # Ok(())
/// # }
/// ```

use crate::models::user::{PublicUser, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet (the default)
    Pending,

    /// Being worked on
    InProgress,

    /// Done
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

/// Task row as stored
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task id
    pub id: i64,

    /// Title (required, non-empty)
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Current status
    pub status: TaskStatus,

    /// Creator user id (immutable)
    pub created_by_id: i64,

    /// Assignee user id (nullable, mutable)
    pub assigned_to_id: Option<i64>,

    /// When the task was created (immutable)
    pub created_at: DateTime<Utc>,

    /// When the task was last mutated
    pub updated_at: DateTime<Utc>,
}

/// Task with its creator and assignee resolved
///
/// This is the canonical API representation of a task: every read and every
/// real-time event payload carries the resolved user records alongside the
/// raw foreign keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithUsers {
    /// The task columns
    #[serde(flatten)]
    pub task: Task,

    /// Resolved creator record
    pub created_by: PublicUser,

    /// Resolved assignee record (None when unassigned)
    pub assigned_to: Option<PublicUser>,
}

/// Input for creating a new task
///
/// Assignment policy (who may set `assigned_to_id`) is decided by the task
/// service before this struct is built; the model layer persists what it is
/// given.
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Initial status
    pub status: TaskStatus,

    /// Creator user id
    pub created_by_id: i64,

    /// Assignee user id
    pub assigned_to_id: Option<i64>,
}

/// Patch for updating a task
///
/// Only non-None fields are written. `assigned_to_id` is doubly optional:
/// `None` leaves the assignee untouched, `Some(None)` clears it,
/// `Some(Some(id))` reassigns.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New assignee (`Some(None)` unassigns)
    pub assigned_to_id: Option<Option<i64>>,
}

impl UpdateTask {
    /// Whether the patch contains nothing to write
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assigned_to_id.is_none()
    }
}

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, status, created_by_id, assigned_to_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, status, created_by_id, assigned_to_id,
                      created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.created_by_id)
        .bind(data.assigned_to_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by id (raw row, relations unresolved)
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, created_by_id, assigned_to_id,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by id with creator/assignee resolved
    pub async fn find_with_users(
        pool: &PgPool,
        id: i64,
    ) -> Result<Option<TaskWithUsers>, sqlx::Error> {
        let Some(task) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let mut resolved = attach_users(pool, vec![task]).await?;
        Ok(resolved.pop())
    }

    /// Lists every task, newest-created first, with relations resolved
    ///
    /// Admin listing: includes tasks the caller neither created nor holds.
    pub async fn list_all_with_users(pool: &PgPool) -> Result<Vec<TaskWithUsers>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, created_by_id, assigned_to_id,
                   created_at, updated_at
            FROM tasks
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        attach_users(pool, tasks).await
    }

    /// Lists tasks the given user created or is assigned to, newest first
    pub async fn list_owned_with_users(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Vec<TaskWithUsers>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, created_by_id, assigned_to_id,
                   created_at, updated_at
            FROM tasks
            WHERE created_by_id = $1 OR assigned_to_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        attach_users(pool, tasks).await
    }

    /// Applies a patch to a task
    ///
    /// Only non-None fields are written; `updated_at` is always refreshed.
    /// Returns None if the task doesn't exist. An empty patch still bumps
    /// `updated_at`, matching the storage semantics of a blind update.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.assigned_to_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assigned_to_id = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, title, description, status, created_by_id, \
             assigned_to_id, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(assignee) = data.assigned_to_id {
            // Binds NULL when unassigning
            q = q.bind(assignee);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task by id (physical removal)
    ///
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Resolves creator/assignee records for a batch of tasks in one query
///
/// # Errors
///
/// Returns `RowNotFound` if a task references a creator that no longer
/// exists; the schema's FK makes that an invariant violation.
async fn attach_users(pool: &PgPool, tasks: Vec<Task>) -> Result<Vec<TaskWithUsers>, sqlx::Error> {
    let mut ids: Vec<i64> = Vec::new();
    for task in &tasks {
        ids.push(task.created_by_id);
        if let Some(assignee) = task.assigned_to_id {
            ids.push(assignee);
        }
    }
    ids.sort_unstable();
    ids.dedup();

    let users = User::find_by_ids(pool, &ids).await?;
    let by_id: HashMap<i64, PublicUser> = users
        .into_iter()
        .map(|u| (u.id, PublicUser::from(u)))
        .collect();

    let mut resolved = Vec::with_capacity(tasks.len());
    for task in tasks {
        let created_by = by_id
            .get(&task.created_by_id)
            .cloned()
            .ok_or(sqlx::Error::RowNotFound)?;
        let assigned_to = task.assigned_to_id.and_then(|id| by_id.get(&id).cloned());

        resolved.push(TaskWithUsers {
            task,
            created_by,
            assigned_to,
        });
    }

    Ok(resolved)
}
