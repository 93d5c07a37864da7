// handlers/platform/statistics.rs - GET /api/platform/statistics handler

use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::tenant_service::TenantStatistics;

pub async fn statistics(State(state): State<AppState>) -> ApiResult<TenantStatistics> {
    Ok(ApiResponse::success(state.tenants.statistics().await?))
}
