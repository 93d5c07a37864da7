// handlers/public/tenant_config.rs - GET /api/public/tenant-config[/:subdomain] handlers

use axum::extract::{Path, State};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TenantConfigArtifact;
use crate::tenancy::BoundTenant;

/// Branding and module flags for the tenant the request resolved to
pub async fn tenant_config_current(
    State(state): State<AppState>,
    bound: BoundTenant,
) -> ApiResult<TenantConfigArtifact> {
    let config = state.tenants.public_config(&bound.tenant).await?;
    Ok(ApiResponse::success(config))
}

/// Branding and module flags for an explicit subdomain; 404 when unknown or inactive
pub async fn tenant_config_show(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<TenantConfigArtifact> {
    let config = state.tenants.public_config_for(&subdomain).await?;
    Ok(ApiResponse::success(config))
}
