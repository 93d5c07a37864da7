use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::database::models::{Tenant, TenantModuleEnablement, TenantUpdate, TenantValidationError};
use crate::database::{ConnectionRegistry, StorageError};
use crate::services::config_artifact::{ArtifactError, ArtifactStore, TenantConfigArtifact};
use crate::services::module_catalog::{find_definition, set_module_enabled, CatalogError, ModuleCatalog};
use crate::services::tenant_directory::TenantDirectory;

#[derive(Debug, Error)]
pub enum TenantServiceError {
    #[error("Tenant '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Invalid(#[from] TenantValidationError),

    #[error("Custom domain '{0}' is already used by another tenant")]
    DomainTaken(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Catalog entry joined with one tenant's enablement row
#[derive(Debug, Clone, Serialize)]
pub struct TenantModuleView {
    pub key: String,
    pub name: String,
    pub icon: String,
    pub is_core: bool,
    pub sort_order: i32,
    pub is_enabled: bool,
    pub enabled_at: Option<DateTime<Utc>>,
    pub disabled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleAccessReport {
    pub has_access: bool,
    pub module_key: String,
    pub module_name: Option<String>,
    pub tenant_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleUsage {
    pub key: String,
    pub name: String,
    pub enabled_tenants: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantStatistics {
    pub total_tenants: usize,
    pub active_tenants: usize,
    pub inactive_tenants: usize,
    pub custom_domain_tenants: usize,
    pub modules: Vec<ModuleUsage>,
}

/// Administrative operations on existing tenants
pub struct TenantService {
    directory: Arc<dyn TenantDirectory>,
    catalog: Arc<dyn ModuleCatalog>,
    registry: Arc<ConnectionRegistry>,
    artifacts: ArtifactStore,
}

impl TenantService {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        catalog: Arc<dyn ModuleCatalog>,
        registry: Arc<ConnectionRegistry>,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            directory,
            catalog,
            registry,
            artifacts,
        }
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, TenantServiceError> {
        Ok(self.directory.list().await?)
    }

    pub async fn get(&self, subdomain: &str) -> Result<Tenant, TenantServiceError> {
        self.directory
            .find_by_subdomain(&subdomain.trim().to_ascii_lowercase())
            .await?
            .ok_or_else(|| TenantServiceError::NotFound(subdomain.to_string()))
    }

    /// Apply a settings change and regenerate the configuration artifact
    pub async fn update(&self, subdomain: &str, update: &TenantUpdate) -> Result<Tenant, TenantServiceError> {
        let mut tenant = self.get(subdomain).await?;
        let was_active = tenant.is_active;
        update.apply(&mut tenant, Utc::now())?;

        if let Some(domain) = &tenant.custom_domain {
            if let Some(owner) = self.directory.find_by_custom_domain(domain).await? {
                if owner.id != tenant.id {
                    return Err(TenantServiceError::DomainTaken(domain.clone()));
                }
            }
        }

        self.directory.update(&tenant).await.map_err(|e| match e {
            StorageError::Conflict(_) => {
                TenantServiceError::DomainTaken(tenant.custom_domain.clone().unwrap_or_default())
            }
            other => other.into(),
        })?;
        info!(tenant = %tenant.subdomain, "Tenant updated");

        // Stop holding connections for tenants that can no longer be resolved
        if was_active && !tenant.is_active {
            self.registry.evict(&tenant.database_alias()).await;
        }

        self.regenerate_quietly(&tenant).await;
        Ok(tenant)
    }

    pub async fn set_active(&self, subdomain: &str, is_active: bool) -> Result<Tenant, TenantServiceError> {
        self.update(subdomain, &TenantUpdate::activation(is_active)).await
    }

    pub async fn modules(&self, subdomain: &str) -> Result<Vec<TenantModuleView>, TenantServiceError> {
        let tenant = self.get(subdomain).await?;
        let definitions = self.catalog.definitions().await?;
        let rows = self.catalog.enablements(tenant.id).await?;

        Ok(definitions
            .iter()
            .map(|definition| {
                let row = rows.iter().find(|r| r.module_key == definition.key);
                TenantModuleView {
                    key: definition.key.clone(),
                    name: definition.name.clone(),
                    icon: definition.icon.clone(),
                    is_core: definition.is_core,
                    sort_order: definition.sort_order,
                    is_enabled: row.is_some_and(|r| r.is_enabled),
                    enabled_at: row.and_then(|r| r.enabled_at),
                    disabled_at: row.and_then(|r| r.disabled_at),
                }
            })
            .collect())
    }

    /// Toggle one module and regenerate the configuration artifact
    pub async fn set_module(
        &self,
        subdomain: &str,
        module_key: &str,
        is_enabled: bool,
    ) -> Result<TenantModuleEnablement, TenantServiceError> {
        let tenant = self.get(subdomain).await?;
        let row = set_module_enabled(self.catalog.as_ref(), &tenant, module_key, is_enabled).await?;
        self.regenerate_quietly(&tenant).await;
        Ok(row)
    }

    pub async fn regenerate_config(&self, subdomain: &str) -> Result<PathBuf, TenantServiceError> {
        let tenant = self.get(subdomain).await?;
        Ok(self.artifacts.regenerate(&tenant, self.catalog.as_ref()).await?)
    }

    /// Branding and module flags for an active tenant
    pub async fn public_config(&self, tenant: &Tenant) -> Result<TenantConfigArtifact, TenantServiceError> {
        if !tenant.is_active {
            return Err(TenantServiceError::NotFound(tenant.subdomain.clone()));
        }
        Ok(self.artifacts.snapshot(tenant, self.catalog.as_ref()).await?)
    }

    pub async fn public_config_for(&self, subdomain: &str) -> Result<TenantConfigArtifact, TenantServiceError> {
        let tenant = self.get(subdomain).await?;
        self.public_config(&tenant).await
    }

    pub async fn check_module_access(
        &self,
        subdomain: &str,
        module_key: &str,
    ) -> Result<ModuleAccessReport, TenantServiceError> {
        let tenant = self.get(subdomain).await?;
        let definitions = self.catalog.definitions().await?;
        let row = self.catalog.enablement(tenant.id, module_key).await?;

        Ok(ModuleAccessReport {
            has_access: tenant.is_active && row.is_some_and(|r| r.is_enabled),
            module_key: module_key.to_string(),
            module_name: find_definition(&definitions, module_key).map(|d| d.name.clone()),
            tenant_name: tenant.name,
        })
    }

    pub async fn statistics(&self) -> Result<TenantStatistics, TenantServiceError> {
        let tenants = self.directory.list().await?;
        let definitions = self.catalog.definitions().await?;
        let counts = self.catalog.enablement_counts().await?;

        let total = tenants.len();
        let active = tenants.iter().filter(|t| t.is_active).count();
        let custom = tenants.iter().filter(|t| t.custom_domain.is_some()).count();

        let modules = definitions
            .iter()
            .map(|definition| {
                let enabled = counts.get(&definition.key).copied().unwrap_or(0);
                let percentage = if total == 0 {
                    0.0
                } else {
                    (enabled as f64 / total as f64 * 1000.0).round() / 10.0
                };
                ModuleUsage {
                    key: definition.key.clone(),
                    name: definition.name.clone(),
                    enabled_tenants: enabled,
                    percentage,
                }
            })
            .collect();

        Ok(TenantStatistics {
            total_tenants: total,
            active_tenants: active,
            inactive_tenants: total - active,
            custom_domain_tenants: custom,
            modules,
        })
    }

    async fn regenerate_quietly(&self, tenant: &Tenant) {
        if let Err(e) = self.artifacts.regenerate(tenant, self.catalog.as_ref()).await {
            error!(tenant = %tenant.subdomain, error = %e, "Failed to regenerate tenant configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provisioner::ProvisionRequest;
    use crate::testing::TestHarness;

    async fn provisioned(harness: &TestHarness, subdomain: &str, modules: &[&str]) -> Tenant {
        let request = ProvisionRequest {
            name: subdomain.to_string(),
            subdomain: subdomain.to_string(),
            module_keys: modules.iter().map(|m| m.to_string()).collect(),
            ..ProvisionRequest::default()
        };
        harness.provisioner.provision(request).await.unwrap().tenant
    }

    #[tokio::test]
    async fn module_toggle_regenerates_artifact() {
        let harness = TestHarness::new().await;
        provisioned(&harness, "acme", &[]).await;

        harness.tenants.set_module("acme", "wallet", true).await.unwrap();

        let artifact = harness.artifacts.read("acme").await.unwrap().unwrap();
        assert!(artifact.modules["wallet"]);
        let views = harness.tenants.modules("acme").await.unwrap();
        assert!(views.iter().any(|v| v.key == "wallet" && v.is_enabled));
    }

    #[tokio::test]
    async fn deactivation_evicts_registered_pool() {
        let harness = TestHarness::new().await;
        provisioned(&harness, "acme", &[]).await;
        assert!(harness.registry.get("tenant_acme").await.is_some());

        let tenant = harness.tenants.set_active("acme", false).await.unwrap();

        assert!(!tenant.is_active);
        assert!(harness.registry.get("tenant_acme").await.is_none());
        assert!(matches!(
            harness.tenants.public_config_for("acme").await,
            Err(TenantServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_rejects_custom_domain_of_another_tenant() {
        let harness = TestHarness::new().await;
        let mut request = ProvisionRequest {
            name: "Acme".to_string(),
            subdomain: "acme".to_string(),
            custom_domain: Some("hr.acme.com".to_string()),
            ..ProvisionRequest::default()
        };
        harness.provisioner.provision(request.clone()).await.unwrap();
        request.subdomain = "globex".to_string();
        request.custom_domain = None;
        harness.provisioner.provision(request).await.unwrap();

        let update: TenantUpdate = serde_json::from_str(r#"{"custom_domain": "hr.acme.com"}"#).unwrap();
        let result = harness.tenants.update("globex", &update).await;
        assert!(matches!(result, Err(TenantServiceError::DomainTaken(_))));
    }

    #[tokio::test]
    async fn module_access_report() {
        let harness = TestHarness::new().await;
        provisioned(&harness, "acme", &["tasks"]).await;

        let tasks = harness.tenants.check_module_access("acme", "tasks").await.unwrap();
        assert!(tasks.has_access);
        assert_eq!(tasks.module_name.as_deref(), Some("Task Management"));

        let wallet = harness.tenants.check_module_access("acme", "wallet").await.unwrap();
        assert!(!wallet.has_access);
    }

    #[tokio::test]
    async fn statistics_counts_enabled_modules() {
        let harness = TestHarness::new().await;
        provisioned(&harness, "acme", &["tasks"]).await;
        provisioned(&harness, "globex", &[]).await;
        harness.tenants.set_active("globex", false).await.unwrap();

        let stats = harness.tenants.statistics().await.unwrap();
        assert_eq!(stats.total_tenants, 2);
        assert_eq!(stats.active_tenants, 1);
        assert_eq!(stats.inactive_tenants, 1);

        let employees = stats.modules.iter().find(|m| m.key == "employees").unwrap();
        assert_eq!(employees.enabled_tenants, 2);
        assert_eq!(employees.percentage, 100.0);
        let tasks = stats.modules.iter().find(|m| m.key == "tasks").unwrap();
        assert_eq!(tasks.enabled_tenants, 1);
        assert_eq!(tasks.percentage, 50.0);
    }
}
