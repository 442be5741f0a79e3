/// Integration tests for the Taskhub API
///
/// These tests exercise the full pipeline end-to-end against live PostgreSQL
/// and Redis instances (hence the `#[ignore]` markers; run them with
/// `cargo test -- --ignored` and DATABASE_URL/REDIS_URL/JWT_SECRET set):
/// - Authentication and authorization on every surface
/// - Task lifecycle (create, list, update, delete)
/// - Assignment policy (self-assignment for regular users)
/// - Real-time notification fan-out through the hub
/// - Role-scoped listing visibility

mod common;

use axum::http::StatusCode;
use common::{bare_request, body_json, json_request, TestContext};
use serde_json::json;

/// Requests without a token are rejected before reaching any handler
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_authentication_required() {
    let ctx = TestContext::new().await.unwrap();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/tasks")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = ctx.call(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

/// A regular user's task is always self-assigned, whatever the client sent
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_regular_user_cannot_assign_to_others() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.user_token,
            json!({
                "title": "Self-assignment check",
                "assignedToId": ctx.admin.id
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let task = body_json(response).await;

    assert_eq!(task["createdById"], ctx.user.id);
    assert_eq!(task["assignedToId"], ctx.user.id);
    assert_eq!(task["assignedTo"]["id"], ctx.user.id);

    ctx.cleanup().await.unwrap();
}

/// An admin may assign to anyone; the new assignee is notified individually
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_admin_assignment_notifies_assignee() {
    let ctx = TestContext::new().await.unwrap();

    // Connect the assignee and the admin to the hub before the mutation
    let mut assignee_session = ctx.hub.register(ctx.user.id).await;
    let mut admin_session = ctx.hub.register(ctx.admin.id).await;

    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.admin_token,
            json!({
                "title": "Assigned by admin",
                "assignedToId": ctx.user.id
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let frame = admin_session.direct.recv().await.unwrap();
    assert_eq!(frame.event, "taskCreated");

    let frame = assignee_session.direct.recv().await.unwrap();
    assert_eq!(frame.event, "taskAssigned");
    assert_eq!(frame.data["assignedToId"], ctx.user.id);

    ctx.cleanup().await.unwrap();
}

/// A regular creator is notified themself, along with every admin
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_regular_creation_notifies_creator_and_admins() {
    let ctx = TestContext::new().await.unwrap();

    let mut creator_session = ctx.hub.register(ctx.user.id).await;
    let mut admin_session = ctx.hub.register(ctx.admin.id).await;

    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.user_token,
            json!({ "title": "User-created task" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    assert_eq!(creator_session.direct.recv().await.unwrap().event, "taskCreated");
    assert_eq!(admin_session.direct.recv().await.unwrap().event, "taskCreated");

    ctx.cleanup().await.unwrap();
}

/// Regular users see only tasks they created or hold; admins see everything
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_listing_visibility_is_role_scoped() {
    let ctx = TestContext::new().await.unwrap();

    // One task owned by the user, one admin-only task
    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.user_token,
            json!({ "title": "Mine" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let mine = body_json(response).await;

    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.admin_token,
            json!({ "title": "Admin only" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let admin_only = body_json(response).await;

    let listing = body_json(ctx.call(bare_request("GET", "/tasks", &ctx.user_token)).await).await;
    let ids: Vec<i64> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&mine["id"].as_i64().unwrap()));
    assert!(!ids.contains(&admin_only["id"].as_i64().unwrap()));

    let listing = body_json(ctx.call(bare_request("GET", "/tasks", &ctx.admin_token)).await).await;
    let ids: Vec<i64> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&mine["id"].as_i64().unwrap()));
    assert!(ids.contains(&admin_only["id"].as_i64().unwrap()));

    ctx.cleanup().await.unwrap();
}

/// A user who is neither creator nor assignee gets 403 on mutation
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_stranger_cannot_modify() {
    let ctx = TestContext::new().await.unwrap();

    // Task created by the admin, assigned to the admin
    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.admin_token,
            json!({ "title": "Admin's task" }),
        ))
        .await;
    let task = body_json(response).await;
    let id = task["id"].as_i64().unwrap();

    let response = ctx
        .call(json_request(
            "PATCH",
            &format!("/tasks/{}", id),
            &ctx.user_token,
            json!({ "title": "Hijacked" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .call(bare_request("DELETE", &format!("/tasks/{}", id), &ctx.user_token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

/// Reassignment notifies the new assignee once plus a global update
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_reassignment_fanout() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.admin_token,
            json!({ "title": "To be reassigned" }),
        ))
        .await;
    let task = body_json(response).await;
    let id = task["id"].as_i64().unwrap();

    let mut assignee_session = ctx.hub.register(ctx.user.id).await;

    let response = ctx
        .call(json_request(
            "PATCH",
            &format!("/tasks/{}", id),
            &ctx.admin_token,
            json!({ "assignedToId": ctx.user.id }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let frame = assignee_session.direct.recv().await.unwrap();
    assert_eq!(frame.event, "taskAssigned");

    let frame = assignee_session.global.recv().await.unwrap();
    assert_eq!(frame.event, "taskUpdated");
    assert_eq!(frame.data["id"], id);

    ctx.cleanup().await.unwrap();
}

/// `assignedToId: null` unassigns without notifying anyone individually
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_unassignment_via_null() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.admin_token,
            json!({ "title": "Unassign me", "assignedToId": ctx.user.id }),
        ))
        .await;
    let task = body_json(response).await;
    let id = task["id"].as_i64().unwrap();

    let mut old_assignee_session = ctx.hub.register(ctx.user.id).await;

    let response = ctx
        .call(json_request(
            "PATCH",
            &format!("/tasks/{}", id),
            &ctx.admin_token,
            json!({ "assignedToId": null }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let updated = body_json(response).await;
    assert!(updated["assignedToId"].is_null());
    assert!(updated["assignedTo"].is_null());

    // Global update arrives, but no targeted frame for the old assignee
    let frame = old_assignee_session.global.recv().await.unwrap();
    assert_eq!(frame.event, "taskUpdated");
    assert!(old_assignee_session.direct.try_recv().is_err());

    ctx.cleanup().await.unwrap();
}

/// Deletion returns 204, broadcasts taskDeleted, and 404s afterwards
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_delete_lifecycle() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.user_token,
            json!({ "title": "Short-lived" }),
        ))
        .await;
    let task = body_json(response).await;
    let id = task["id"].as_i64().unwrap();

    let mut session = ctx.hub.register(ctx.admin.id).await;

    let response = ctx
        .call(bare_request("DELETE", &format!("/tasks/{}", id), &ctx.user_token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let frame = session.global.recv().await.unwrap();
    assert_eq!(frame.event, "taskDeleted");
    assert_eq!(frame.data["id"], id);

    let response = ctx
        .call(bare_request("GET", &format!("/tasks/{}", id), &ctx.admin_token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

/// Register then login round-trips credentials and returns a usable token
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_register_and_login() {
    let ctx = TestContext::new().await.unwrap();

    let email = format!(
        "register-{}@example.com",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    );

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            json!({
                "email": email,
                "password": "Sup3rSecret",
                "name": "New User"
            })
            .to_string(),
        ))
        .unwrap();

    let response = ctx.call(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered = body_json(response).await;
    assert_eq!(registered["role"], "user");
    assert!(registered.get("passwordHash").is_none());

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            json!({ "email": email, "password": "Sup3rSecret" }).to_string(),
        ))
        .unwrap();

    let response = ctx.call(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    let token = login["access_token"].as_str().unwrap().to_string();

    // The fresh token works against a protected route
    let response = ctx.call(bare_request("GET", "/users/profile", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Remove the registered account
    let id = registered["id"].as_i64().unwrap();
    let response = ctx
        .call(bare_request("DELETE", &format!("/users/{}", id), &ctx.admin_token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

/// A mutation evicts the acting user's cached listing, so the next read
/// reflects it instead of returning the pre-mutation snapshot
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_mutation_evicts_actors_cached_listing() {
    let ctx = TestContext::new().await.unwrap();

    // Prime the cache with the pre-mutation listing
    let response = ctx.call(bare_request("GET", "/tasks", &ctx.user_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let before = body_json(response).await;

    let response = ctx
        .call(json_request(
            "POST",
            "/tasks",
            &ctx.user_token,
            json!({ "title": "Fresh after eviction" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_i64().unwrap();

    // The cached pre-mutation listing must be gone
    let listing = body_json(ctx.call(bare_request("GET", "/tasks", &ctx.user_token)).await).await;
    let ids: Vec<i64> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&id));
    assert_eq!(
        listing.as_array().unwrap().len(),
        before.as_array().unwrap().len() + 1
    );

    // Same property across update and delete
    let response = ctx
        .call(json_request(
            "PATCH",
            &format!("/tasks/{}", id),
            &ctx.user_token,
            json!({ "title": "Renamed" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let listing = body_json(ctx.call(bare_request("GET", "/tasks", &ctx.user_token)).await).await;
    let renamed = listing
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == id)
        .unwrap();
    assert_eq!(renamed["title"], "Renamed");

    let response = ctx
        .call(bare_request("DELETE", &format!("/tasks/{}", id), &ctx.user_token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let listing = body_json(ctx.call(bare_request("GET", "/tasks", &ctx.user_token)).await).await;
    assert!(!listing.as_array().unwrap().iter().any(|t| t["id"] == id));

    ctx.cleanup().await.unwrap();
}

/// Deleting a nonexistent task is a plain 404 with no side effects
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_remove_nonexistent_task_has_no_side_effects() {
    let ctx = TestContext::new().await.unwrap();

    let mut session = ctx.hub.register(ctx.admin.id).await;

    let response = ctx
        .call(bare_request("DELETE", "/tasks/999999999", &ctx.admin_token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Nothing was broadcast or targeted
    assert!(session.global.try_recv().is_err());
    assert!(session.direct.try_recv().is_err());

    ctx.cleanup().await.unwrap();
}

/// Admin user routes reject regular users
#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_user_management_requires_admin() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.call(bare_request("GET", "/users", &ctx.user_token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx.call(bare_request("GET", "/users", &ctx.admin_token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    ctx.cleanup().await.unwrap();
}
