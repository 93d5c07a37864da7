// handlers/platform/module_access.rs - POST /api/platform/module-access handler

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::ModuleAccessReport;

#[derive(Debug, Deserialize)]
pub struct ModuleAccessQuery {
    pub subdomain: String,
    pub module_key: String,
}

pub async fn module_access(
    State(state): State<AppState>,
    Json(query): Json<ModuleAccessQuery>,
) -> ApiResult<ModuleAccessReport> {
    let report = state
        .tenants
        .check_module_access(&query.subdomain, &query.module_key)
        .await?;
    Ok(ApiResponse::success(report))
}
