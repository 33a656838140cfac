use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::server::AppState;

/// Liveness check.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
/// - **Response**: `{"status": "pong"}`
pub async fn ping() -> Json<Value> {
    Json(json!({ "status": "pong" }))
}

/// Readiness check that also checks the credential store.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/api/healthchecker`
///
/// # HTTP Status Codes
/// - **200 OK**: store reachable
/// - **503 Service Unavailable**: store unreachable or timed out
pub async fn health_checker(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.sessions.store().health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "message": "store reachable" })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "message": "store unreachable" })),
            )
        }
    }
}
