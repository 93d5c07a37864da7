// handlers/platform/modules/upsert.rs - POST /api/platform/modules handler

use axum::{extract::State, Json};

use crate::app::AppState;
use crate::database::models::ModuleDefinition;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// Create or update a catalog entry. Keys must stay lowercase identifiers so
/// they can appear in the route table.
pub async fn module_upsert(
    State(state): State<AppState>,
    Json(definition): Json<ModuleDefinition>,
) -> ApiResult<ModuleDefinition> {
    let valid_key = !definition.key.is_empty()
        && definition
            .key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid_key {
        return Err(ApiError::bad_request(format!("Invalid module key '{}'", definition.key)));
    }
    if definition.name.trim().is_empty() {
        return Err(ApiError::bad_request("Module name is required"));
    }

    let created = state.catalog.upsert_definition(&definition).await?;
    tracing::info!(module_key = %definition.key, created, "Module definition saved");
    Ok(if created {
        ApiResponse::created(definition)
    } else {
        ApiResponse::success(definition)
    })
}
