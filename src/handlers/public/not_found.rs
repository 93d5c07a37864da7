// handlers/public/not_found.rs - fallback for unmatched routes

use axum::http::Uri;

use crate::error::ApiError;

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}
