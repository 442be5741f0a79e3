/// Task endpoints
///
/// Thin HTTP adapters over [`crate::tasks::TaskService`]: they validate the
/// request shape, pull the authenticated [`Actor`] out of request
/// extensions, and delegate. All policy (who may assign, who may modify,
/// who gets notified) lives in the service and its policy module.
///
/// # Endpoints
///
/// - `POST   /tasks` - Create a task
/// - `GET    /tasks` - List tasks visible to the caller (cache-backed)
/// - `GET    /tasks/:id` - Fetch one task (admin, creator, or assignee)
/// - `PATCH  /tasks/:id` - Update a task (admin, creator, or assignee)
/// - `DELETE /tasks/:id` - Delete a task (admin, creator, or assignee)

use crate::{
    app::AppState,
    error::ApiResult,
    tasks::CreateTaskInput,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Deserializer};
use taskhub_shared::auth::Actor;
use taskhub_shared::models::task::{TaskStatus, TaskWithUsers, UpdateTask};
use validator::Validate;

/// Distinguishes an absent JSON field from an explicit null
///
/// Plain `Option<T>` collapses both to `None`. Wrapping the result in
/// another `Some` at deserialization time (combined with `#[serde(default)]`
/// for the absent case) preserves the difference: absent stays `None`,
/// `null` becomes `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Initial status (defaults to pending)
    pub status: Option<TaskStatus>,

    /// Requested assignee; silently ignored for non-admin callers
    pub assigned_to_id: Option<i64>,
}

/// Update task request
///
/// Every field is optional; `assignedToId: null` unassigns the task while
/// omitting the field leaves the assignment untouched.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    /// New title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New assignee (null to unassign, omitted to leave unchanged)
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to_id: Option<Option<i64>>,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            assigned_to_id: req.assigned_to_id,
        }
    }
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /tasks
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// {
///   "title": "Deploy to production",
///   "description": "Final deployment",
///   "assignedToId": 9
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskWithUsers>)> {
    req.validate()?;

    let task = state
        .task_service()
        .create(
            CreateTaskInput {
                title: req.title,
                description: req.description,
                status: req.status,
                assigned_to_id: req.assigned_to_id,
            },
            actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// List tasks visible to the caller, newest-created first
///
/// Admins see every task; regular users only what they created or hold.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<TaskWithUsers>>> {
    let listing = state.task_service().find_all(actor).await?;
    Ok(Json(listing))
}

/// Fetch one task
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither admin, creator, nor assignee
/// - `404 Not Found`: No such task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TaskWithUsers>> {
    let service = state.task_service();
    service.authorize_access(id, actor).await?;

    let task = service.find_one(id).await?;
    Ok(Json(task))
}

/// Update a task
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither admin, creator, nor assignee
/// - `404 Not Found`: No such task
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskWithUsers>> {
    req.validate()?;

    let task = state.task_service().update(id, req.into(), actor).await?;
    Ok(Json(task))
}

/// Delete a task
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither admin, creator, nor assignee
/// - `404 Not Found`: No such task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let service = state.task_service();
    service.authorize_access(id, actor).await?;
    service.remove(id, actor).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let absent: UpdateTaskRequest = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(absent.assigned_to_id, None);

        let null: UpdateTaskRequest =
            serde_json::from_str(r#"{"assignedToId": null}"#).unwrap();
        assert_eq!(null.assigned_to_id, Some(None));

        let set: UpdateTaskRequest = serde_json::from_str(r#"{"assignedToId": 9}"#).unwrap();
        assert_eq!(set.assigned_to_id, Some(Some(9)));
    }

    #[test]
    fn test_create_request_is_camel_case() {
        let req: CreateTaskRequest =
            serde_json::from_str(r#"{"title": "Deploy", "assignedToId": 3}"#).unwrap();
        assert_eq!(req.assigned_to_id, Some(3));
        assert_eq!(req.status, None);
    }
}
