// handlers/platform/tenants/active.rs - PUT /api/platform/tenants/:subdomain/active handler

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::Tenant;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SetActive {
    pub is_active: bool,
}

/// Deactivation is the decommission path; the tenant's pool is released.
pub async fn tenant_set_active(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
    Json(body): Json<SetActive>,
) -> ApiResult<Tenant> {
    Ok(ApiResponse::success(state.tenants.set_active(&subdomain, body.is_active).await?))
}
