use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{ModuleDefinition, Tenant, TenantModuleEnablement};
use crate::database::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    Existing,
}

/// Module catalog and per-tenant enablement rows in the shared database
#[async_trait]
pub trait ModuleCatalog: Send + Sync {
    /// All definitions ordered by `sort_order`
    async fn definitions(&self) -> Result<Arc<Vec<ModuleDefinition>>, StorageError>;

    /// Insert or update a definition. Returns true when it was created.
    async fn upsert_definition(&self, definition: &ModuleDefinition) -> Result<bool, StorageError>;

    async fn enablement(
        &self,
        tenant_id: Uuid,
        module_key: &str,
    ) -> Result<Option<TenantModuleEnablement>, StorageError>;

    async fn enablements(&self, tenant_id: Uuid) -> Result<Vec<TenantModuleEnablement>, StorageError>;

    /// Create the row with `is_enabled` unless one already exists. Never modifies an existing row.
    async fn ensure_enablement(
        &self,
        tenant_id: Uuid,
        module_key: &str,
        is_enabled: bool,
    ) -> Result<EnsureOutcome, StorageError>;

    /// Set the flag, creating the row when missing.
    async fn set_enabled(
        &self,
        tenant_id: Uuid,
        module_key: &str,
        is_enabled: bool,
    ) -> Result<TenantModuleEnablement, StorageError>;

    /// Number of tenants with each module enabled
    async fn enablement_counts(&self) -> Result<HashMap<String, i64>, StorageError>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown module '{0}'")]
    UnknownModule(String),

    #[error("Module '{0}' is a core module and cannot be disabled")]
    CoreModule(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Modules every deployment starts with
pub fn default_definitions() -> Vec<ModuleDefinition> {
    vec![
        ModuleDefinition::new("employees", "Employee Management", "Employee records, departments and profiles", "users", true, 1),
        ModuleDefinition::new("attendance", "Attendance Tracking", "Check-in, check-out and leave requests", "clock", false, 2),
        ModuleDefinition::new("wallet", "Wallet & Salary", "Employee wallets, salaries and reimbursements", "wallet", false, 3),
        ModuleDefinition::new("tasks", "Task Management", "Tasks, subtasks and team assignments", "clipboard-list", false, 4),
        ModuleDefinition::new("complaints", "Complaint System", "Complaint tickets and categories", "message-square", false, 5),
        ModuleDefinition::new("shifts", "Shift Scheduling", "Shifts, schedules and overrides", "calendar", false, 6),
        ModuleDefinition::new("reports", "Reports & Analytics", "Dashboards and exported reports", "bar-chart", false, 7),
        ModuleDefinition::new("notifications", "Notifications", "In-app notifications", "bell", true, 8),
    ]
}

/// Seed the default catalog. Idempotent; returns how many definitions were created.
pub async fn initialize_defaults(catalog: &dyn ModuleCatalog) -> Result<usize, StorageError> {
    let existing = catalog.definitions().await?;
    let mut created = 0;
    for definition in default_definitions() {
        if existing.iter().any(|d| d.key == definition.key) {
            continue;
        }
        if catalog.upsert_definition(&definition).await? {
            created += 1;
        }
    }
    info!(created, "Module catalog initialized");
    Ok(created)
}

pub fn find_definition<'a>(definitions: &'a [ModuleDefinition], key: &str) -> Option<&'a ModuleDefinition> {
    definitions.iter().find(|d| d.key == key)
}

/// Administrative toggle. Core modules can be enabled but never disabled.
pub async fn set_module_enabled(
    catalog: &dyn ModuleCatalog,
    tenant: &Tenant,
    module_key: &str,
    is_enabled: bool,
) -> Result<TenantModuleEnablement, CatalogError> {
    let definitions = catalog.definitions().await?;
    let definition = find_definition(&definitions, module_key)
        .ok_or_else(|| CatalogError::UnknownModule(module_key.to_string()))?;

    if definition.is_core && !is_enabled {
        return Err(CatalogError::CoreModule(module_key.to_string()));
    }

    let row = catalog.set_enabled(tenant.id, module_key, is_enabled).await?;
    info!(tenant = %tenant.subdomain, module_key, is_enabled, "Module enablement changed");
    Ok(row)
}

pub struct PgModuleCatalog {
    pool: PgPool,
    cache: RwLock<Option<Arc<Vec<ModuleDefinition>>>>,
}

impl PgModuleCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: RwLock::new(None),
        }
    }

    async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

#[async_trait]
impl ModuleCatalog for PgModuleCatalog {
    async fn definitions(&self) -> Result<Arc<Vec<ModuleDefinition>>, StorageError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let rows = sqlx::query_as::<_, ModuleDefinition>(
            "SELECT key, name, description, icon, is_core, sort_order FROM module_definitions ORDER BY sort_order, key",
        )
        .fetch_all(&self.pool)
        .await?;

        let definitions = Arc::new(rows);
        *self.cache.write().await = Some(definitions.clone());
        Ok(definitions)
    }

    async fn upsert_definition(&self, definition: &ModuleDefinition) -> Result<bool, StorageError> {
        // xmax = 0 only for freshly inserted rows
        let (created,): (bool,) = sqlx::query_as(
            r#"
            INSERT INTO module_definitions (key, name, description, icon, is_core, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (key) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                icon = EXCLUDED.icon,
                is_core = EXCLUDED.is_core,
                sort_order = EXCLUDED.sort_order
            RETURNING (xmax = 0)
            "#,
        )
        .bind(&definition.key)
        .bind(&definition.name)
        .bind(&definition.description)
        .bind(&definition.icon)
        .bind(definition.is_core)
        .bind(definition.sort_order)
        .fetch_one(&self.pool)
        .await?;

        self.invalidate().await;
        Ok(created)
    }

    async fn enablement(
        &self,
        tenant_id: Uuid,
        module_key: &str,
    ) -> Result<Option<TenantModuleEnablement>, StorageError> {
        let row = sqlx::query_as::<_, TenantModuleEnablement>(
            r#"
            SELECT tenant_id, module_key, is_enabled, enabled_at, disabled_at
            FROM tenant_modules
            WHERE tenant_id = $1 AND module_key = $2
            "#,
        )
        .bind(tenant_id)
        .bind(module_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn enablements(&self, tenant_id: Uuid) -> Result<Vec<TenantModuleEnablement>, StorageError> {
        let rows = sqlx::query_as::<_, TenantModuleEnablement>(
            r#"
            SELECT tm.tenant_id, tm.module_key, tm.is_enabled, tm.enabled_at, tm.disabled_at
            FROM tenant_modules tm
            JOIN module_definitions md ON md.key = tm.module_key
            WHERE tm.tenant_id = $1
            ORDER BY md.sort_order, tm.module_key
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ensure_enablement(
        &self,
        tenant_id: Uuid,
        module_key: &str,
        is_enabled: bool,
    ) -> Result<EnsureOutcome, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tenant_modules (tenant_id, module_key, is_enabled, enabled_at)
            VALUES ($1, $2, $3, CASE WHEN $3 THEN $4 END)
            ON CONFLICT (tenant_id, module_key) DO NOTHING
            "#,
        )
        .bind(tenant_id)
        .bind(module_key)
        .bind(is_enabled)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            EnsureOutcome::Created
        } else {
            EnsureOutcome::Existing
        })
    }

    async fn set_enabled(
        &self,
        tenant_id: Uuid,
        module_key: &str,
        is_enabled: bool,
    ) -> Result<TenantModuleEnablement, StorageError> {
        let row = sqlx::query_as::<_, TenantModuleEnablement>(
            r#"
            INSERT INTO tenant_modules (tenant_id, module_key, is_enabled, enabled_at, disabled_at)
            VALUES ($1, $2, $3, CASE WHEN $3 THEN $4 END, CASE WHEN $3 THEN NULL ELSE $4 END)
            ON CONFLICT (tenant_id, module_key) DO UPDATE SET
                is_enabled = EXCLUDED.is_enabled,
                enabled_at = CASE
                    WHEN EXCLUDED.is_enabled AND NOT tenant_modules.is_enabled THEN $4
                    ELSE tenant_modules.enabled_at END,
                disabled_at = CASE
                    WHEN NOT EXCLUDED.is_enabled AND tenant_modules.is_enabled THEN $4
                    ELSE tenant_modules.disabled_at END
            RETURNING tenant_id, module_key, is_enabled, enabled_at, disabled_at
            "#,
        )
        .bind(tenant_id)
        .bind(module_key)
        .bind(is_enabled)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn enablement_counts(&self) -> Result<HashMap<String, i64>, StorageError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT module_key, COUNT(*) FROM tenant_modules WHERE is_enabled GROUP BY module_key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
