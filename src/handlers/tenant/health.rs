// handlers/tenant/health.rs - GET /api/tenant/health handler

use axum::response::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::tenancy::BoundTenant;

/// Ping the bound tenant database; 503 when it cannot be reached
pub async fn health(bound: BoundTenant) -> Result<Json<Value>, ApiError> {
    match sqlx::query("SELECT 1").execute(&bound.pool).await {
        Ok(_) => Ok(Json(json!({
            "status": "ok",
            "tenant": bound.tenant.subdomain,
            "database": bound.alias,
        }))),
        Err(e) => {
            tracing::error!(
                tenant_id = %bound.tenant.id,
                tenant = %bound.tenant.subdomain,
                alias = %bound.alias,
                error = %e,
                "Tenant database unreachable"
            );
            Err(ApiError::tenant_database_unavailable(format!(
                "Database for tenant '{}' is unavailable",
                bound.tenant.subdomain
            )))
        }
    }
}
