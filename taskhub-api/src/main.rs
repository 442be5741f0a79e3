//! # Taskhub API Server
//!
//! REST + WebSocket backend for multi-user task collaboration:
//! - Task CRUD with role-based authorization (admin / user)
//! - Per-user Redis-cached task listings
//! - Real-time task events over WebSocket
//! - Append-only audit trail of task mutations
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskhub-api
//! ```

use std::sync::Arc;
use taskhub_api::{
    app::{build_router, AppState},
    config::Config,
    notify::hub::EventHub,
};
use taskhub_shared::{
    audit::RedisAuditSink,
    cache::ListingCache,
    db::{migrations::run_migrations, pool::create_pool, pool::DatabaseConfig},
    redis::client::{RedisClient, RedisConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhub_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskhub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let redis = RedisClient::new(RedisConfig::from_env()?).await?;
    let cache = ListingCache::new(redis.clone());
    let audit = Arc::new(RedisAuditSink::new(redis));
    let hub = Arc::new(EventHub::new());

    let state = AppState::new(pool, cache, hub, audit, config.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, app).await?;

    Ok(())
}
