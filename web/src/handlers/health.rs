//! Liveness and readiness probes.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use recipe_catalog_runtime::{HealthReport, HealthStatus};

/// `GET /health`: the process is up. Touches neither the store nor the queue.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness: review queue depth, worker liveness and search availability.
///
/// # Status Codes
///
/// - 200 OK: Healthy or Degraded
/// - 503 Service Unavailable: Unhealthy
///
/// # Endpoint
///
/// ```text
/// GET /health/ready
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "checks": [
///     { "component": "ingest", "status": "healthy",
///       "details": { "queue_capacity": "100", "queue_depth": "0", "queue_usage_pct": "0.0" } },
///     { "component": "search", "status": "healthy" }
///   ],
///   "timestamp": "2025-01-01T00:00:00Z"
/// }
/// ```
#[allow(clippy::unused_async)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.catalog.health();

    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(report))
}
