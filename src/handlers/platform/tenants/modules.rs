// handlers/platform/tenants/modules.rs - GET /api/platform/tenants/:subdomain/modules handler

use axum::extract::{Path, State};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::TenantModuleView;

pub async fn tenant_modules(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<Vec<TenantModuleView>> {
    Ok(ApiResponse::success(state.tenants.modules(&subdomain).await?))
}
