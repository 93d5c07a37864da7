// handlers/platform/tenants/module_set.rs - PUT /api/platform/tenants/:subdomain/modules/:module_key handler

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::TenantModuleEnablement;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SetModule {
    pub is_enabled: bool,
}

pub async fn tenant_module_set(
    State(state): State<AppState>,
    Path((subdomain, module_key)): Path<(String, String)>,
    Json(body): Json<SetModule>,
) -> ApiResult<TenantModuleEnablement> {
    let row = state
        .tenants
        .set_module(&subdomain, &module_key, body.is_enabled)
        .await?;
    Ok(ApiResponse::success(row))
}
