use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Tenant, TenantRow};
use crate::database::StorageError;

/// Tenant records in the shared database
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StorageError>;

    async fn find_by_custom_domain(&self, domain: &str) -> Result<Option<Tenant>, StorageError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, StorageError>;

    /// All tenants, newest first
    async fn list(&self) -> Result<Vec<Tenant>, StorageError>;

    /// Insert a new tenant. `Conflict` when the subdomain or custom domain is taken.
    async fn insert(&self, tenant: &Tenant) -> Result<(), StorageError>;

    /// Persist every mutable field of an existing tenant.
    async fn update(&self, tenant: &Tenant) -> Result<(), StorageError>;
}

const TENANT_COLUMNS: &str = r#"
    id, name, subdomain, custom_domain, domain_type, is_active, tls_issued, tls_issued_at,
    primary_color, secondary_color, logo_url, contact_email, contact_phone, created_by,
    created_at, updated_at
"#;

pub struct PgTenantDirectory {
    pool: PgPool,
}

impl PgTenantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<Tenant>, StorageError> {
        let query = format!("SELECT {} FROM tenants WHERE {} = $1", TENANT_COLUMNS, clause);
        let row = sqlx::query_as::<_, TenantRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Tenant::try_from).transpose()
    }
}

#[async_trait]
impl TenantDirectory for PgTenantDirectory {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StorageError> {
        self.fetch_one_where("subdomain", subdomain).await
    }

    async fn find_by_custom_domain(&self, domain: &str) -> Result<Option<Tenant>, StorageError> {
        self.fetch_one_where("custom_domain", domain).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, StorageError> {
        let query = format!("SELECT {} FROM tenants WHERE id = $1", TENANT_COLUMNS);
        let row = sqlx::query_as::<_, TenantRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Tenant::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Tenant>, StorageError> {
        let query = format!("SELECT {} FROM tenants ORDER BY created_at DESC", TENANT_COLUMNS);
        let rows = sqlx::query_as::<_, TenantRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Tenant::try_from).collect()
    }

    async fn insert(&self, tenant: &Tenant) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, name, subdomain, custom_domain, domain_type, is_active, tls_issued,
                tls_issued_at, primary_color, secondary_color, logo_url, contact_email,
                contact_phone, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.subdomain)
        .bind(&tenant.custom_domain)
        .bind(tenant.domain_type.as_str())
        .bind(tenant.is_active)
        .bind(tenant.tls_issued)
        .bind(tenant.tls_issued_at)
        .bind(&tenant.primary_color)
        .bind(&tenant.secondary_color)
        .bind(&tenant.logo_url)
        .bind(&tenant.contact_email)
        .bind(&tenant.contact_phone)
        .bind(&tenant.created_by)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, tenant: &Tenant) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                name = $2, custom_domain = $3, domain_type = $4, is_active = $5,
                tls_issued = $6, tls_issued_at = $7, primary_color = $8, secondary_color = $9,
                logo_url = $10, contact_email = $11, contact_phone = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.custom_domain)
        .bind(tenant.domain_type.as_str())
        .bind(tenant.is_active)
        .bind(tenant.tls_issued)
        .bind(tenant.tls_issued_at)
        .bind(&tenant.primary_color)
        .bind(&tenant.secondary_color)
        .bind(&tenant.logo_url)
        .bind(&tenant.contact_email)
        .bind(&tenant.contact_phone)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("tenant {}", tenant.id)));
        }
        Ok(())
    }
}
