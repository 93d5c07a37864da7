// handlers/platform/tenants/show.rs - GET /api/platform/tenants/:subdomain handler

use axum::extract::{Path, State};

use crate::app::AppState;
use crate::database::models::Tenant;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn tenant_show(State(state): State<AppState>, Path(subdomain): Path<String>) -> ApiResult<Tenant> {
    Ok(ApiResponse::success(state.tenants.get(&subdomain).await?))
}
