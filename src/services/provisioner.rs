use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::hash_password;
use crate::config::ProvisioningConfig;
use crate::database::models::{NewTenant, Tenant, TenantValidationError};
use crate::database::{ConnectionRegistry, StorageError};
use crate::services::config_artifact::{ArtifactError, ArtifactStore};
use crate::services::module_catalog::{find_definition, EnsureOutcome, ModuleCatalog};
use crate::services::tenant_databases::{DatabaseCreation, NewAdmin, TenantDatabases};
use crate::services::tenant_directory::TenantDirectory;

/// Administrative request to bring a tenant to the ready state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub name: String,
    pub subdomain: String,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default, skip_serializing)]
    pub admin_password: Option<String>,
    /// Non-core modules to enable in addition to the core set
    #[serde(default)]
    pub module_keys: Vec<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl ProvisionRequest {
    fn new_tenant(&self) -> NewTenant {
        NewTenant {
            name: self.name.clone(),
            subdomain: self.subdomain.clone(),
            custom_domain: self.custom_domain.clone(),
            primary_color: self.primary_color.clone(),
            secondary_color: self.secondary_color.clone(),
            logo_url: self.logo_url.clone(),
            contact_email: self.contact_email.clone(),
            contact_phone: self.contact_phone.clone(),
            created_by: self.created_by.clone(),
        }
    }

    pub fn has_custom_domain(&self) -> bool {
        self.custom_domain.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

/// Request-level failures, detected before any step runs
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Invalid(#[from] TenantValidationError),

    #[error("Unknown module keys: {}", .0.join(", "))]
    UnknownModules(Vec<String>),

    #[error("Custom domain '{0}' is already used by another tenant")]
    DomainTaken(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStep {
    Allocate,
    Migrate,
    SeedAdmin,
    SeedModules,
    Finalize,
}

impl ProvisionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStep::Allocate => "allocate",
            ProvisionStep::Migrate => "migrate",
            ProvisionStep::SeedAdmin => "seed_admin",
            ProvisionStep::SeedModules => "seed_modules",
            ProvisionStep::Finalize => "finalize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded { detail: String },
    Failed { error: String },
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: ProvisionStep,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Highest state reached through an unbroken run of successful steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningState {
    Created,
    DatabaseAllocated,
    SchemaMigrated,
    AdminSeeded,
    ModulesSeeded,
    Ready,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionReport {
    pub tenant: Tenant,
    pub tenant_created: bool,
    pub database_alias: String,
    pub state: ProvisioningState,
    pub steps: Vec<StepReport>,
}

impl ProvisionReport {
    pub fn outcome(&self, step: ProvisionStep) -> Option<&StepOutcome> {
        self.steps.iter().find(|r| r.step == step).map(|r| &r.outcome)
    }

    pub fn is_complete(&self) -> bool {
        self.state == ProvisioningState::Ready
    }

    pub fn failed_steps(&self) -> Vec<ProvisionStep> {
        self.steps
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Failed { .. }))
            .map(|r| r.step)
            .collect()
    }
}

fn state_for(steps: &[StepReport]) -> ProvisioningState {
    const LADDER: [(ProvisionStep, ProvisioningState); 5] = [
        (ProvisionStep::Allocate, ProvisioningState::DatabaseAllocated),
        (ProvisionStep::Migrate, ProvisioningState::SchemaMigrated),
        (ProvisionStep::SeedAdmin, ProvisioningState::AdminSeeded),
        (ProvisionStep::SeedModules, ProvisioningState::ModulesSeeded),
        (ProvisionStep::Finalize, ProvisioningState::Ready),
    ];

    let mut state = ProvisioningState::Created;
    for (step, reached) in LADDER {
        let succeeded = steps
            .iter()
            .any(|r| r.step == step && r.outcome.is_success());
        if !succeeded {
            break;
        }
        state = reached;
    }
    state
}

/// Brings tenants to a ready state: database, schema, admin, modules, configuration artifact.
///
/// Every step checks for existing state first, so a partially provisioned tenant can be
/// re-driven with the same request.
pub struct TenantProvisioner {
    directory: Arc<dyn TenantDirectory>,
    catalog: Arc<dyn ModuleCatalog>,
    databases: Arc<dyn TenantDatabases>,
    registry: Arc<ConnectionRegistry>,
    artifacts: ArtifactStore,
    settings: ProvisioningConfig,
}

impl TenantProvisioner {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        catalog: Arc<dyn ModuleCatalog>,
        databases: Arc<dyn TenantDatabases>,
        registry: Arc<ConnectionRegistry>,
        artifacts: ArtifactStore,
        settings: ProvisioningConfig,
    ) -> Self {
        Self {
            directory,
            catalog,
            databases,
            registry,
            artifacts,
            settings,
        }
    }

    pub fn settings(&self) -> &ProvisioningConfig {
        &self.settings
    }

    pub async fn provision(&self, request: ProvisionRequest) -> Result<ProvisionReport, ProvisionError> {
        let candidate = request.new_tenant().into_tenant(Utc::now())?;
        self.check_module_keys(&request.module_keys).await?;

        let (tenant, tenant_created) = self.create_or_resume(candidate).await?;
        let alias = tenant.database_alias();
        info!(tenant = %tenant.subdomain, alias = %alias, created = tenant_created, "Provisioning tenant");

        let mut steps = Vec::with_capacity(5);

        let allocate = self.allocate(&alias).await;
        let allocated = allocate.is_success();
        self.record(&mut steps, &tenant, &alias, ProvisionStep::Allocate, allocate);

        let migrate = if allocated {
            self.migrate(&alias).await
        } else {
            skipped("database was not allocated")
        };
        let migrated = migrate.is_success();
        self.record(&mut steps, &tenant, &alias, ProvisionStep::Migrate, migrate);

        let seed_admin = if migrated {
            self.seed_admin(&tenant, &alias, &request).await
        } else {
            skipped("schema was not migrated")
        };
        self.record(&mut steps, &tenant, &alias, ProvisionStep::SeedAdmin, seed_admin);

        // Module seeding and the artifact live outside the tenant database
        let seed_modules = self.seed_modules(&tenant, &request.module_keys).await;
        self.record(&mut steps, &tenant, &alias, ProvisionStep::SeedModules, seed_modules);

        let finalize = self.finalize(&tenant).await;
        self.record(&mut steps, &tenant, &alias, ProvisionStep::Finalize, finalize);

        let report = ProvisionReport {
            state: state_for(&steps),
            tenant,
            tenant_created,
            database_alias: alias,
            steps,
        };
        info!(
            tenant = %report.tenant.subdomain,
            state = ?report.state,
            failed = ?report.failed_steps(),
            "Provisioning finished"
        );
        Ok(report)
    }

    /// Rewrite the configuration artifact after settings or module changes
    pub async fn refresh_artifact(&self, tenant: &Tenant) -> Result<PathBuf, ArtifactError> {
        self.artifacts.regenerate(tenant, self.catalog.as_ref()).await
    }

    async fn check_module_keys(&self, keys: &[String]) -> Result<(), ProvisionError> {
        if keys.is_empty() {
            return Ok(());
        }
        let definitions = self.catalog.definitions().await?;
        let unknown: Vec<String> = keys
            .iter()
            .filter(|key| find_definition(&definitions, key).is_none())
            .cloned()
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ProvisionError::UnknownModules(unknown))
        }
    }

    async fn create_or_resume(&self, candidate: Tenant) -> Result<(Tenant, bool), ProvisionError> {
        if let Some(existing) = self.directory.find_by_subdomain(&candidate.subdomain).await? {
            return Ok((existing, false));
        }

        if let Some(domain) = &candidate.custom_domain {
            if self.directory.find_by_custom_domain(domain).await?.is_some() {
                return Err(ProvisionError::DomainTaken(domain.clone()));
            }
        }

        match self.directory.insert(&candidate).await {
            Ok(()) => Ok((candidate, true)),
            // Lost a race against a concurrent request for the same subdomain
            Err(StorageError::Conflict(_)) => {
                match self.directory.find_by_subdomain(&candidate.subdomain).await? {
                    Some(existing) => Ok((existing, false)),
                    None => Err(ProvisionError::DomainTaken(
                        candidate.custom_domain.unwrap_or_default(),
                    )),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn allocate(&self, alias: &str) -> StepOutcome {
        let creation = match self.databases.create_database(alias).await {
            Ok(creation) => creation,
            Err(e) => return failed(e),
        };
        match creation {
            DatabaseCreation::Created => {
                // Discard any handle opened before the database existed
                if let Err(e) = self.registry.reregister(alias).await {
                    return failed(e);
                }
                succeeded(format!("created database {}", alias))
            }
            DatabaseCreation::AlreadyExists => {
                // Live requests may hold the registered pool; keep it
                if let Err(e) = self.registry.ensure_alias(alias).await {
                    return failed(e);
                }
                succeeded(format!("database {} already exists", alias))
            }
        }
    }

    async fn migrate(&self, alias: &str) -> StepOutcome {
        match self.databases.apply_schema(alias).await {
            Ok(()) => succeeded("tenant schema applied"),
            Err(e) => failed(e),
        }
    }

    async fn seed_admin(&self, tenant: &Tenant, alias: &str, request: &ProvisionRequest) -> StepOutcome {
        let username = request
            .admin_username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_admin_username.clone());

        match self.databases.admin_exists(alias, &username).await {
            Ok(true) => return succeeded(format!("admin '{}' already exists", username)),
            Ok(false) => {}
            Err(e) => return failed(e),
        }

        let password = match request
            .admin_password
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| Some(self.settings.default_admin_password.clone()).filter(|p| !p.is_empty()))
        {
            Some(password) => password,
            None => return failed("no admin password supplied and no default is configured"),
        };

        let password_hash = match tokio::task::spawn_blocking(move || hash_password(&password)).await {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => return failed(format!("password hashing failed: {}", e)),
            Err(e) => return failed(format!("password hashing task failed: {}", e)),
        };

        let email = request
            .admin_email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| format!("{}@{}.com", username, tenant.subdomain));

        let admin = NewAdmin {
            username: username.clone(),
            email,
            password_hash,
        };
        match self.databases.create_admin(alias, &admin).await {
            Ok(()) => succeeded(format!("created admin '{}'", username)),
            Err(StorageError::Conflict(_)) => succeeded(format!("admin '{}' already exists", username)),
            Err(e) => failed(e),
        }
    }

    async fn seed_modules(&self, tenant: &Tenant, requested: &[String]) -> StepOutcome {
        let definitions = match self.catalog.definitions().await {
            Ok(definitions) => definitions,
            Err(e) => return failed(e),
        };
        if definitions.is_empty() {
            return failed("module catalog is empty");
        }

        let mut created = 0;
        let mut enabled = 0;
        for definition in definitions.iter() {
            let wanted = definition.is_core || requested.iter().any(|k| k == &definition.key);
            match self.catalog.ensure_enablement(tenant.id, &definition.key, wanted).await {
                Ok(EnsureOutcome::Created) => created += 1,
                Ok(EnsureOutcome::Existing) if wanted => {
                    // Core modules are always on; explicitly requested ones are switched on
                    match self.catalog.enablement(tenant.id, &definition.key).await {
                        Ok(Some(row)) if row.is_enabled => {}
                        Ok(_) => match self.catalog.set_enabled(tenant.id, &definition.key, true).await {
                            Ok(_) => enabled += 1,
                            Err(e) => return failed(e),
                        },
                        Err(e) => return failed(e),
                    }
                }
                Ok(EnsureOutcome::Existing) => {}
                Err(e) => return failed(e),
            }
        }

        succeeded(format!(
            "{} enablement rows created, {} existing rows enabled",
            created, enabled
        ))
    }

    async fn finalize(&self, tenant: &Tenant) -> StepOutcome {
        match self.refresh_artifact(tenant).await {
            Ok(path) => succeeded(format!("wrote {}", path.display())),
            Err(e) => failed(e),
        }
    }

    fn record(
        &self,
        steps: &mut Vec<StepReport>,
        tenant: &Tenant,
        alias: &str,
        step: ProvisionStep,
        outcome: StepOutcome,
    ) {
        match &outcome {
            StepOutcome::Failed { error: message } => error!(
                tenant_id = %tenant.id,
                tenant = %tenant.subdomain,
                alias,
                step = step.as_str(),
                error = %message,
                "Provisioning step failed"
            ),
            StepOutcome::Skipped { reason } => warn!(
                tenant = %tenant.subdomain,
                alias,
                step = step.as_str(),
                reason = %reason,
                "Provisioning step skipped"
            ),
            StepOutcome::Succeeded { detail } => info!(
                tenant = %tenant.subdomain,
                step = step.as_str(),
                detail = %detail,
                "Provisioning step succeeded"
            ),
        }
        steps.push(StepReport { step, outcome });
    }
}

fn succeeded(detail: impl Into<String>) -> StepOutcome {
    StepOutcome::Succeeded { detail: detail.into() }
}

fn failed(error: impl ToString) -> StepOutcome {
    StepOutcome::Failed { error: error.to_string() }
}

fn skipped(reason: impl Into<String>) -> StepOutcome {
    StepOutcome::Skipped { reason: reason.into() }
}
