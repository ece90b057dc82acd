use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use supplychainx_database::postgres_health_check;

use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "supplychainx-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /api/v1/health/detailed
///
/// Probes PostgreSQL; answers 503 when it is unreachable.
pub async fn detailed_health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let postgres_status = match postgres_health_check(&state.pool).await {
        Ok(()) => json!({"status": "healthy", "message": "Connected"}),
        Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
    };
    let healthy = postgres_status["status"] == "healthy";

    let body = json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "supplychainx-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": { "postgres": postgres_status }
    });

    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}
