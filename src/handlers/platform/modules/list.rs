// handlers/platform/modules/list.rs - GET /api/platform/modules handler

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::ModuleDefinition;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn module_list(State(state): State<AppState>) -> ApiResult<Vec<ModuleDefinition>> {
    let definitions = state.catalog.definitions().await?;
    Ok(ApiResponse::success(definitions.as_ref().clone()))
}
