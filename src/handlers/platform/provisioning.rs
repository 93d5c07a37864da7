// handlers/platform/provisioning.rs - GET /api/platform/provisioning/:job_id handler

use axum::extract::{Path, State};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ProvisioningJob;

pub async fn provisioning_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<ProvisioningJob> {
    let job = state
        .queue
        .status(job_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Provisioning job '{}' not found", job_id)))?;
    Ok(ApiResponse::success(job))
}
