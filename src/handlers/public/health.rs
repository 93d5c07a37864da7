// handlers/public/health.rs - GET /health handler

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

/// Liveness plus a ping of the shared database
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.registry.health_check().await {
        Ok(()) => Ok(Json(json!({
            "status": "ok",
            "database": "connected",
            "registered_tenants": state.registry.len().await,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))),
        Err(e) => {
            tracing::error!(error = %e, "Shared database health check failed");
            Err(ApiError::service_unavailable("Shared database is unreachable"))
        }
    }
}
