/// Health check endpoint
///
/// Verifies that the server is running and that both backends (PostgreSQL
/// and Redis) are reachable.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "redis": "connected"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Redis status
    pub redis: String,
}

/// Health check handler
///
/// Returns 200 with a status body even when a backend is down; the `status`
/// field flips to "degraded" so probes can distinguish the cases. A down
/// Redis only degrades caching and audit, so the service stays usable.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_status = match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let redis_status = match state.cache.client().ping().await {
        Ok(true) => "connected",
        _ => "disconnected",
    };

    let healthy = database_status == "connected" && redis_status == "connected";

    Ok(Json(HealthResponse {
        status: if healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database_status.to_string(),
        redis: redis_status.to_string(),
    }))
}
