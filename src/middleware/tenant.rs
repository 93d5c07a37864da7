use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::app::AppState;
use crate::error::ApiError;
use crate::tenancy::{Access, BoundTenant, RequestContext, RequestSignals, Resolution};

pub const TENANT_NAME_HEADER: &str = "x-tenant-name";
pub const TENANT_SUBDOMAIN_HEADER: &str = "x-tenant-subdomain";

/// Request pipeline: resolve the tenant, bind its database, install the
/// request context, then run the module gate and the handler inside it.
pub async fn tenant_pipeline(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let signals = RequestSignals::from_headers(request.headers(), state.resolver.settings());

    let resolution = match state.resolver.resolve(&signals).await {
        Ok(resolution) => resolution,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let context = match resolution {
        Resolution::NoTenant => RequestContext::Platform,
        Resolution::Tenant { tenant, via } => {
            let alias = tenant.database_alias();
            match state.registry.ensure(&tenant).await {
                Ok(pool) => RequestContext::Bound(BoundTenant {
                    tenant: Arc::new(tenant),
                    alias,
                    pool,
                    via,
                }),
                Err(e) => {
                    error!(tenant_id = %tenant.id, tenant = %tenant.subdomain, alias = %alias, error = %e, "Failed to bind tenant database");
                    return ApiError::tenant_database_unavailable(format!(
                        "Database for tenant '{}' is unavailable",
                        tenant.subdomain
                    ))
                    .into_response();
                }
            }
        }
    };

    request.extensions_mut().insert(context.clone());
    let gate = state.gate.clone();
    let path = request.uri().path().to_string();

    let mut response = context
        .clone()
        .scope(async move {
            let current = RequestContext::current_tenant();
            match gate.check(&path, current.as_ref().map(|b| b.tenant.as_ref())).await {
                Ok(Access::Allow) => next.run(request).await,
                Ok(Access::Deny(denial)) => ApiError::from(denial).into_response(),
                Err(e) => ApiError::from(e).into_response(),
            }
        })
        .await;

    if let Some(bound) = context.tenant() {
        let headers = response.headers_mut();
        if let Ok(name) = HeaderValue::from_str(&bound.tenant.name) {
            headers.insert(TENANT_NAME_HEADER, name);
        }
        if let Ok(subdomain) = HeaderValue::from_str(&bound.tenant.subdomain) {
            headers.insert(TENANT_SUBDOMAIN_HEADER, subdomain);
        }
    }
    response
}
