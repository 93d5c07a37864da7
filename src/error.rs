// HTTP API Error Types
use axum::{response::IntoResponse, http::StatusCode, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::{RegistryError, StorageError};
use crate::database::models::TenantValidationError;
use crate::services::{
    ArtifactError, CatalogError, ProvisionError, QueueError, TenantServiceError,
};
use crate::tenancy::{DenialReason, ModuleDenial, ResolveError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    ModuleDenied(ModuleDenial),

    // 404 Not Found
    NotFound(String),
    TenantUnresolved(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
    TenantDatabaseUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::ModuleDenied(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::TenantUnresolved(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::TenantDatabaseUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Forbidden(msg) => msg.clone(),
            ApiError::ModuleDenied(denial) => denial.message(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::TenantUnresolved(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::InternalServerError(msg) => msg.clone(),
            ApiError::ServiceUnavailable(msg) => msg.clone(),
            ApiError::TenantDatabaseUnavailable(msg) => msg.clone(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            ApiError::ModuleDenied(denial) => {
                json!({
                    "error": true,
                    "message": denial.message(),
                    "code": self.error_code(),
                    "reason": denial.reason,
                    "module_key": denial.module_key,
                    "module_name": denial.module_name,
                    "upgrade_available": denial.upgrade_available
                })
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::ModuleDenied(denial) => match denial.reason {
                DenialReason::NotEnabled => "MODULE_NOT_ENABLED",
                DenialReason::NotFound => "MODULE_NOT_FOUND",
            },
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::TenantUnresolved(_) => "TENANT_UNRESOLVED",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::TenantDatabaseUnavailable(_) => "TENANT_DATABASE_UNAVAILABLE",
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn tenant_unresolved(message: impl Into<String>) -> Self {
        ApiError::TenantUnresolved(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }

    pub fn tenant_database_unavailable(message: impl Into<String>) -> Self {
        ApiError::TenantDatabaseUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => ApiError::not_found(msg),
            StorageError::Conflict(msg) => ApiError::conflict(msg),
            StorageError::Unavailable(msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            StorageError::Invalid(msg) | StorageError::Query(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        tracing::error!("Connection registry error: {}", err);
        match err {
            RegistryError::InvalidDatabaseName(_) | RegistryError::InvalidDatabaseUrl(_) => {
                ApiError::internal_server_error("Tenant database is misconfigured")
            }
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Directory(storage) => {
                tracing::error!("Tenant resolution failed: {}", storage);
                ApiError::service_unavailable("Tenant directory temporarily unavailable")
            }
        }
    }
}

impl From<TenantValidationError> for ApiError {
    fn from(err: TenantValidationError) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(err.field().to_string(), err.to_string());
        ApiError::validation_error("Invalid tenant data", Some(field_errors))
    }
}

impl From<ModuleDenial> for ApiError {
    fn from(denial: ModuleDenial) -> Self {
        ApiError::ModuleDenied(denial)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownModule(_) => ApiError::not_found(err.to_string()),
            CatalogError::CoreModule(_) => ApiError::bad_request(err.to_string()),
            CatalogError::Storage(storage) => storage.into(),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Storage(storage) => storage.into(),
            other => {
                tracing::error!("Tenant configuration artifact error: {}", other);
                ApiError::internal_server_error("Failed to write tenant configuration")
            }
        }
    }
}

impl From<TenantServiceError> for ApiError {
    fn from(err: TenantServiceError) -> Self {
        match err {
            TenantServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            TenantServiceError::DomainTaken(_) => ApiError::conflict(err.to_string()),
            TenantServiceError::Invalid(invalid) => invalid.into(),
            TenantServiceError::Catalog(catalog) => catalog.into(),
            TenantServiceError::Artifact(artifact) => artifact.into(),
            TenantServiceError::Storage(storage) => storage.into(),
        }
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Invalid(invalid) => invalid.into(),
            ProvisionError::UnknownModules(_) => {
                let mut field_errors = HashMap::new();
                field_errors.insert("module_keys".to_string(), err.to_string());
                ApiError::validation_error("Invalid provisioning request", Some(field_errors))
            }
            ProvisionError::DomainTaken(_) => ApiError::conflict(err.to_string()),
            ProvisionError::Storage(storage) => storage.into(),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        tracing::error!("Provisioning queue error: {}", err);
        ApiError::service_unavailable(err.to_string())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
