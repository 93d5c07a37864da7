use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::database::{schema, ConnectionRegistry, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseCreation {
    Created,
    AlreadyExists,
}

/// Administrative account seeded into a tenant database
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Lifecycle operations on isolated tenant databases, addressed by alias
#[async_trait]
pub trait TenantDatabases: Send + Sync {
    async fn create_database(&self, alias: &str) -> Result<DatabaseCreation, StorageError>;

    async fn apply_schema(&self, alias: &str) -> Result<(), StorageError>;

    async fn admin_exists(&self, alias: &str, username: &str) -> Result<bool, StorageError>;

    async fn create_admin(&self, alias: &str, admin: &NewAdmin) -> Result<(), StorageError>;
}

pub struct PgTenantDatabases {
    registry: Arc<ConnectionRegistry>,
}

impl PgTenantDatabases {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    async fn pool(&self, alias: &str) -> Result<sqlx::PgPool, StorageError> {
        self.registry
            .ensure_alias(alias)
            .await
            .map_err(|e| StorageError::Invalid(e.to_string()))
    }
}

#[async_trait]
impl TenantDatabases for PgTenantDatabases {
    async fn create_database(&self, alias: &str) -> Result<DatabaseCreation, StorageError> {
        if !self.registry.is_valid_db_name(alias) {
            return Err(StorageError::Invalid(format!("invalid database name '{}'", alias)));
        }

        let admin_pool = self.registry.admin_pool();
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(alias)
            .fetch_one(&admin_pool)
            .await?;
        if exists {
            return Ok(DatabaseCreation::AlreadyExists);
        }

        // CREATE DATABASE cannot take bind parameters
        let statement = format!("CREATE DATABASE {}", ConnectionRegistry::quote_identifier(alias));
        match sqlx::query(&statement).execute(&admin_pool).await {
            Ok(_) => {
                info!(alias, "Created tenant database");
                Ok(DatabaseCreation::Created)
            }
            // duplicate_database: a concurrent provisioning run won the race
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("42P04") => {
                Ok(DatabaseCreation::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_schema(&self, alias: &str) -> Result<(), StorageError> {
        let pool = self.pool(alias).await?;
        schema::apply(&pool, schema::TENANT_SCHEMA).await
    }

    async fn admin_exists(&self, alias: &str, username: &str) -> Result<bool, StorageError> {
        let pool = self.pool(alias).await?;
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&pool)
            .await?;
        Ok(exists)
    }

    async fn create_admin(&self, alias: &str, admin: &NewAdmin) -> Result<(), StorageError> {
        let pool = self.pool(alias).await?;
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_superuser, is_staff, is_active)
            VALUES ($1, $2, $3, $4, TRUE, TRUE, TRUE)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&admin.username)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .execute(&pool)
        .await?;
        Ok(())
    }
}
