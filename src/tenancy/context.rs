use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;

use crate::database::models::Tenant;
use crate::error::ApiError;
use crate::tenancy::resolver::ResolvedVia;

/// A resolved tenant together with its registered database handle
#[derive(Debug, Clone)]
pub struct BoundTenant {
    pub tenant: Arc<Tenant>,
    pub alias: String,
    pub pool: PgPool,
    pub via: ResolvedVia,
}

/// Tenant binding for one request. `Platform` records that resolution ran and
/// found no tenant.
#[derive(Debug, Clone)]
pub enum RequestContext {
    Platform,
    Bound(BoundTenant),
}

tokio::task_local! {
    static CURRENT: RequestContext;
}

impl RequestContext {
    pub fn tenant(&self) -> Option<&BoundTenant> {
        match self {
            RequestContext::Bound(bound) => Some(bound),
            RequestContext::Platform => None,
        }
    }

    /// Run `f` with this context installed. The slot is released when `f`
    /// completes, errors, panics or is dropped.
    pub async fn scope<F>(self, f: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(self, f).await
    }

    /// Context of the running request, `None` outside any request scope
    pub fn current() -> Option<RequestContext> {
        CURRENT.try_with(Clone::clone).ok()
    }

    pub fn current_tenant() -> Option<BoundTenant> {
        CURRENT
            .try_with(|ctx| ctx.tenant().cloned())
            .ok()
            .flatten()
    }

    /// Pool of the current tenant database
    pub fn current_pool() -> Result<PgPool, ApiError> {
        Self::current_tenant()
            .map(|bound| bound.pool)
            .ok_or_else(unresolved)
    }
}

fn unresolved() -> ApiError {
    ApiError::tenant_unresolved("No active tenant matches this request")
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .or_else(RequestContext::current)
            .ok_or_else(|| ApiError::internal_server_error("Request context was not initialized"))
    }
}

/// Extractor for tenant-scoped handlers; rejects with `TENANT_UNRESOLVED`
#[axum::async_trait]
impl<S> FromRequestParts<S> for BoundTenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match RequestContext::from_request_parts(parts, state).await? {
            RequestContext::Bound(bound) => Ok(bound),
            RequestContext::Platform => Err(unresolved()),
        }
    }
}
