/// Common test utilities for integration tests
///
/// Provides shared infrastructure:
/// - Test database setup and cleanup
/// - Test Redis connection
/// - Admin and regular test users with JWT tokens
/// - Request/response helpers around the in-process router

use axum::body::Body;
use axum::http::{Request, Response};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use taskhub_api::app::{build_router, AppState};
use taskhub_api::config::Config;
use taskhub_api::notify::hub::EventHub;
use taskhub_shared::audit::RedisAuditSink;
use taskhub_shared::auth::jwt::{create_token, Claims};
use taskhub_shared::cache::ListingCache;
use taskhub_shared::models::user::{CreateUser, User, UserRole};
use taskhub_shared::redis::client::{RedisClient, RedisConfig};
use sqlx::PgPool;
use tower::Service as _;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub hub: Arc<EventHub>,
    pub admin: User,
    pub admin_token: String,
    pub user: User,
    pub user_token: String,
}

impl TestContext {
    /// Creates a new test context with fresh users against live backends
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Path relative to Cargo.toml, not this file
        sqlx::migrate!("../migrations").run(&db).await?;

        let redis = RedisClient::new(RedisConfig::from_env()?).await?;
        let cache = ListingCache::new(redis.clone());
        let audit = Arc::new(RedisAuditSink::new(redis));
        let hub = Arc::new(EventHub::new());

        // Unique emails so parallel test runs don't collide
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)?
            .as_nanos();

        let admin = User::create(
            &db,
            CreateUser {
                email: format!("admin-{}@example.com", nonce),
                password_hash: "unused-in-tests".to_string(),
                name: "Test Admin".to_string(),
                role: UserRole::Admin,
            },
        )
        .await?;

        let user = User::create(
            &db,
            CreateUser {
                email: format!("user-{}@example.com", nonce),
                password_hash: "unused-in-tests".to_string(),
                name: "Test User".to_string(),
                role: UserRole::User,
            },
        )
        .await?;

        let admin_claims = Claims::new(admin.id, admin.email.clone(), admin.role);
        let admin_token = create_token(&admin_claims, &config.jwt.secret)?;

        let user_claims = Claims::new(user.id, user.email.clone(), user.role);
        let user_token = create_token(&user_claims, &config.jwt.secret)?;

        let state = AppState::new(db.clone(), cache, hub.clone(), audit, config);
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            hub,
            admin,
            admin_token,
            user,
            user_token,
        })
    }

    /// Sends a request through the in-process router
    pub async fn call(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().call(request).await.unwrap()
    }

    /// Cleans up test data
    ///
    /// Deleting the users cascades to the tasks they created.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        User::delete(&self.db, self.user.id).await?;
        User::delete(&self.db, self.admin.id).await?;
        Ok(())
    }
}

/// Builds an authenticated JSON request
pub fn json_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Builds an authenticated bodyless request
pub fn bare_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Reads a response body as JSON
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
