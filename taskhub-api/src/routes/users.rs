/// User management endpoints
///
/// Two surfaces share this module:
///
/// - Profile routes (`/users/profile`): any authenticated user reads and
///   updates their own record.
/// - Admin routes (the rest): full user CRUD, admin role required. Role
///   changes happen only here, so a regular user can never promote
///   themself.
///
/// # Endpoints
///
/// - `GET    /users/profile` - Own record
/// - `PATCH  /users/profile` - Update own name/email/password
/// - `GET    /users` - List all users (admin)
/// - `POST   /users` - Create a user with an explicit role (admin)
/// - `GET    /users/:id` - Fetch one user (admin)
/// - `PATCH  /users/:id` - Update any user, including role (admin)
/// - `DELETE /users/:id` - Delete a user (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskhub_shared::{
    auth::{password, Actor},
    models::user::{CreateUser, PublicUser, UpdateUser, User, UserRole},
};
use validator::Validate;

/// Rejects non-admin actors
fn require_admin(actor: Actor) -> ApiResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin role required".to_string()))
    }
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    /// New password (validated for strength)
    pub password: Option<String>,
}

/// Admin create-user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (validated for strength)
    pub password: String,

    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Role (defaults to `user`)
    pub role: Option<UserRole>,
}

/// Admin update-user request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    /// New password (validated for strength)
    pub password: Option<String>,

    /// New role
    pub role: Option<UserRole>,
}

/// Hashes an optional plaintext password after a strength check
fn hash_if_present(password: Option<String>) -> ApiResult<Option<String>> {
    let Some(plain) = password else {
        return Ok(None);
    };

    password::validate_password_strength(&plain).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    Ok(Some(password::hash_password(&plain)?))
}

/// Returns the caller's own record
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, actor.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Updates the caller's own record
///
/// Role is deliberately not accepted here.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<PublicUser>> {
    req.validate()?;

    let password_hash = hash_if_present(req.password)?;

    let user = User::update(
        &state.db,
        actor.user_id,
        UpdateUser {
            email: req.email,
            name: req.name,
            password_hash,
            role: None,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Lists every user (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    require_admin(actor)?;

    let users = User::list_all(&state.db).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

/// Creates a user with an explicit role (admin only)
///
/// This is the only way to create an admin account through the API.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    require_admin(actor)?;
    req.validate()?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;
    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
            role: req.role.unwrap_or_default(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Fetches one user (admin only)
pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PublicUser>> {
    require_admin(actor)?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Updates any user, including their role (admin only)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<PublicUser>> {
    require_admin(actor)?;
    req.validate()?;

    let password_hash = hash_if_present(req.password)?;

    let user = User::update(
        &state.db,
        id,
        UpdateUser {
            email: req.email,
            name: req.name,
            password_hash,
            role: req.role,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Deletes a user (admin only)
///
/// Tasks assigned to the user are unassigned by the schema; tasks they
/// created are removed with them.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    require_admin(actor)?;

    if actor.user_id == id {
        return Err(ApiError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    let deleted = User::delete(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
