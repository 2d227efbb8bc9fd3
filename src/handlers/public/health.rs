use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service name and version
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Notes API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health, /health/ready (public)",
            "notes": "/api/notes[/:id] (protected)",
            "user": "/api/user/profile (protected)",
        }
    }))
}

/// GET /health - Liveness check
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}

/// GET /health/ready - Readiness check against the store
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
