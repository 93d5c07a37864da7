// handlers/public/root.rs - GET / handler

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::tenancy::RequestContext;

pub async fn root(State(state): State<AppState>, context: RequestContext) -> Json<Value> {
    let tenant = context.tenant().map(|bound| bound.tenant.subdomain.clone());
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "base_domain": state.resolver.settings().base_domain,
        "tenant": tenant,
        "endpoints": {
            "public": ["/health", "/api/public/tenant-config", "/api/public/tenant-config/:subdomain"],
            "tenant": ["/api/tenant/context", "/api/tenant/health"],
            "platform": ["/api/platform/tenants", "/api/platform/modules", "/api/platform/statistics"]
        }
    }))
}
