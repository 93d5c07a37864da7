// handlers/tenant/context.rs - GET /api/tenant/context handler

use axum::extract::State;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenancy::{BoundTenant, ResolvedVia};

#[derive(Debug, Serialize)]
pub struct TenantContext {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub domain: String,
    pub resolved_via: ResolvedVia,
    pub database_alias: String,
    pub modules: Vec<String>,
}

pub async fn context(State(state): State<AppState>, bound: BoundTenant) -> ApiResult<TenantContext> {
    let config = state.tenants.public_config(&bound.tenant).await?;

    Ok(ApiResponse::success(TenantContext {
        id: bound.tenant.id,
        name: bound.tenant.name.clone(),
        subdomain: bound.tenant.subdomain.clone(),
        domain: config.domain.clone(),
        resolved_via: bound.via,
        database_alias: bound.alias.clone(),
        modules: config.enabled_modules().into_iter().map(str::to_string).collect(),
    }))
}
