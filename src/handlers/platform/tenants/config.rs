// handlers/platform/tenants/config.rs - POST /api/platform/tenants/:subdomain/config handler

use axum::extract::{Path, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn tenant_config_regenerate(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<Value> {
    let path = state.tenants.regenerate_config(&subdomain).await?;
    Ok(ApiResponse::success(json!({
        "subdomain": subdomain,
        "path": path.display().to_string(),
    })))
}
