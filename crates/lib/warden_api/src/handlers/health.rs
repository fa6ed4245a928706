//! Liveness probe.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /health`: no auth, no I/O.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive".into(),
    })
}
