// handlers/platform/tenants/update.rs - PATCH /api/platform/tenants/:subdomain handler

use axum::{
    extract::{Path, State},
    Json,
};

use crate::app::AppState;
use crate::database::models::{Tenant, TenantUpdate};
use crate::middleware::{ApiResponse, ApiResult};

/// Branding, domain, TLS and active-flag changes. Regenerates the tenant's configuration.
pub async fn tenant_update(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
    Json(update): Json<TenantUpdate>,
) -> ApiResult<Tenant> {
    Ok(ApiResponse::success(state.tenants.update(&subdomain, &update).await?))
}
