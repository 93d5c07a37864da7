// handlers/platform/tenants/create.rs - POST /api/platform/tenants handler

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::services::ProvisionRequest;

/// Provision a tenant and return the per-step report.
///
/// Custom-domain tenants go to the background queue when deferral is
/// configured; the response is then 202 with a job id to poll.
pub async fn tenant_create(
    State(state): State<AppState>,
    Json(request): Json<ProvisionRequest>,
) -> Result<Response, ApiError> {
    if state.provisioner.settings().defer_custom_domains && request.has_custom_domain() {
        let job_id = state.queue.enqueue(request).await?;
        return Ok(ApiResponse::accepted(json!({
            "job_id": job_id,
            "status_url": format!("/api/platform/provisioning/{}", job_id),
        }))
        .into_response());
    }

    let report = state.provisioner.provision(request).await?;
    let response = if report.tenant_created {
        ApiResponse::created(report)
    } else {
        ApiResponse::success(report)
    };
    Ok(response.into_response())
}
