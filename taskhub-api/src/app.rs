/// Application state and router builder
///
/// This module defines the shared application state and provides a function
/// to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskhub_api::{app::AppState, config::Config};
/// use taskhub_api::notify::hub::EventHub;
/// use taskhub_shared::audit::RedisAuditSink;
/// use taskhub_shared::cache::ListingCache;
/// use taskhub_shared::redis::client::{RedisClient, RedisConfig};
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let redis = RedisClient::new(RedisConfig::from_env()?).await?;
///
/// let state = AppState::new(
///     pool,
///     ListingCache::new(redis.clone()),
///     Arc::new(EventHub::new()),
///     Arc::new(RedisAuditSink::new(redis)),
///     config,
/// );
/// let app = taskhub_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::notify::hub::EventHub;
use crate::tasks::TaskService;
use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskhub_shared::audit::AuditSink;
use taskhub_shared::auth::{jwt, Actor};
use taskhub_shared::cache::ListingCache;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. All fields
/// are cheap to clone (pools, Arcs).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Per-user task-listing cache
    pub cache: ListingCache,

    /// WebSocket session hub (also the production Notifier)
    pub hub: Arc<EventHub>,

    /// Audit sink for task mutations
    pub audit: Arc<dyn AuditSink>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(
        db: PgPool,
        cache: ListingCache,
        hub: Arc<EventHub>,
        audit: Arc<dyn AuditSink>,
        config: Config,
    ) -> Self {
        Self {
            db,
            cache,
            hub,
            audit,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Builds the task service over this state's collaborators
    pub fn task_service(&self) -> TaskService {
        TaskService::new(
            self.db.clone(),
            self.cache.clone(),
            self.hub.clone(),
            self.audit.clone(),
        )
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                  # Health check (public)
/// ├── /auth/
/// │   ├── POST /register       # Create account (public)
/// │   └── POST /login          # Get access token (public)
/// ├── /events                  # WebSocket upgrade (token checked in-handler)
/// ├── /tasks/                  # Task pipeline (JWT required)
/// │   ├── POST   /
/// │   ├── GET    /
/// │   ├── GET    /:id
/// │   ├── PATCH  /:id
/// │   └── DELETE /:id
/// └── /users/                  # User management (JWT required)
///     ├── GET    /profile
///     ├── PATCH  /profile
///     ├── GET    /             # admin only
///     ├── POST   /             # admin only
///     ├── GET    /:id          # admin only
///     ├── PATCH  /:id          # admin only
///     └── DELETE /:id          # admin only
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
///
/// The WebSocket route is outside the JWT layer because browsers cannot set
/// an Authorization header on an upgrade request; the handler authenticates
/// from the query string (or header, for non-browser clients) itself.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    // Real-time event channel; authenticates inside the handler
    let event_routes = Router::new().route("/events", get(routes::events::events_upgrade));

    // Task routes (require JWT authentication)
    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/", get(routes::tasks::list_tasks))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id", patch(routes::tasks::update_task))
        .route("/:id", delete(routes::tasks::delete_task))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // User routes (require JWT authentication; admin checks in handlers)
    let user_routes = Router::new()
        .route("/profile", get(routes::users::get_profile))
        .route("/profile", patch(routes::users::update_profile))
        .route("/", get(routes::users::list_users))
        .route("/", post(routes::users::create_user))
        .route("/:id", get(routes::users::get_user))
        .route("/:id", patch(routes::users::update_user))
        .route("/:id", delete(routes::users::delete_user))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    Router::new()
        .merge(health_routes)
        .merge(event_routes)
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/users", user_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the JWT from the Authorization header, then
/// injects an [`Actor`] into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| crate::error::ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_token(token, state.jwt_secret())?;

    req.extensions_mut()
        .insert(Actor::new(claims.sub, claims.role));

    Ok(next.run(req).await)
}
