use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

use crate::app::AppState;
use crate::error::ApiError;

/// Bearer-token guard for the platform administration routes
pub async fn require_platform_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let expected = &state.security.platform_admin_token;
    if expected.is_empty() {
        return ApiError::forbidden("Platform administration API is disabled").into_response();
    }

    let token = match extract_bearer_token(&headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    // Compare fixed-length digests, not the raw tokens
    if Sha256::digest(token.as_bytes()) != Sha256::digest(expected.as_bytes()) {
        tracing::warn!(path = %request.uri().path(), "Rejected platform request with invalid token");
        return ApiError::unauthorized("Invalid platform token").into_response();
    }

    next.run(request).await
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get("authorization")
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err("Empty bearer token"),
        None => Err("Authorization header must use Bearer token format"),
    }
}
