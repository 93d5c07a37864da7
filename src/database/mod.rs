pub mod manager;
pub mod models;
pub mod schema;

use thiserror::Error;

pub use manager::{ConnectionRegistry, RegistryError};

/// Errors surfaced by the shared-database stores and tenant databases
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid stored data: {0}")]
    Invalid(String),

    #[error("Query error: {0}")]
    Query(String),
}

impl StorageError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StorageError::Unavailable(err.to_string()),
            sqlx::Error::RowNotFound => StorageError::NotFound(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::Invalid(err.to_string())
            }
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // unique_violation
                Some("23505") => StorageError::Conflict(db.message().to_string()),
                // invalid_catalog_name (database does not exist), cannot_connect_now
                Some("3D000") | Some("57P03") => StorageError::Unavailable(db.message().to_string()),
                _ => StorageError::Query(err.to_string()),
            },
            _ => StorageError::Query(err.to_string()),
        }
    }
}
