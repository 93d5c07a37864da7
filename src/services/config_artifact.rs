use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{ModuleDefinition, Tenant, TenantModuleEnablement};
use crate::database::StorageError;
use crate::services::module_catalog::ModuleCatalog;

const CONFIG_FILE: &str = "config.json";
const TENANT_SUBDIRS: &[&str] = &["public", "public/images", "config", "assets"];

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to write tenant configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode tenant configuration: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub primary: String,
    pub secondary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Denormalized tenant settings readable without a database round-trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfigArtifact {
    pub name: String,
    pub domain: String,
    pub subdomain: String,
    pub modules: BTreeMap<String, bool>,
    pub theme: Theme,
    pub logo_url: Option<String>,
    pub contact: Contact,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantConfigArtifact {
    /// Every catalog module appears in `modules`; a missing enablement row reads as disabled.
    pub fn build(
        tenant: &Tenant,
        definitions: &[ModuleDefinition],
        enablements: &[TenantModuleEnablement],
        base_domain: &str,
    ) -> Self {
        let modules = definitions
            .iter()
            .map(|definition| {
                let enabled = enablements
                    .iter()
                    .any(|row| row.module_key == definition.key && row.is_enabled);
                (definition.key.clone(), enabled)
            })
            .collect();

        Self {
            name: tenant.name.clone(),
            domain: tenant.full_domain(base_domain),
            subdomain: tenant.subdomain.clone(),
            modules,
            theme: Theme {
                primary: tenant.primary_color.clone(),
                secondary: tenant.secondary_color.clone(),
            },
            logo_url: tenant.logo_url.clone(),
            contact: Contact {
                email: tenant.contact_email.clone(),
                phone: tenant.contact_phone.clone(),
            },
            is_active: tenant.is_active,
            created_at: tenant.created_at,
            updated_at: tenant.updated_at,
        }
    }

    pub fn enabled_modules(&self) -> Vec<&str> {
        self.modules
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// Writes `<root>/<subdomain>/config.json` plus the tenant folder layout
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    base_domain: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, base_domain: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_domain: base_domain.into(),
        }
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    pub fn tenant_dir(&self, subdomain: &str) -> PathBuf {
        self.root.join(subdomain)
    }

    pub fn config_path(&self, subdomain: &str) -> PathBuf {
        self.tenant_dir(subdomain).join(CONFIG_FILE)
    }

    /// Build the artifact from current catalog state
    pub async fn snapshot(
        &self,
        tenant: &Tenant,
        catalog: &dyn ModuleCatalog,
    ) -> Result<TenantConfigArtifact, StorageError> {
        let definitions = catalog.definitions().await?;
        let enablements = catalog.enablements(tenant.id).await?;
        Ok(TenantConfigArtifact::build(tenant, &definitions, &enablements, &self.base_domain))
    }

    /// Rebuild and write the artifact for `tenant`
    pub async fn regenerate(
        &self,
        tenant: &Tenant,
        catalog: &dyn ModuleCatalog,
    ) -> Result<PathBuf, ArtifactError> {
        let artifact = self.snapshot(tenant, catalog).await?;
        self.write(&artifact).await
    }

    pub async fn write(&self, artifact: &TenantConfigArtifact) -> Result<PathBuf, ArtifactError> {
        let dir = self.tenant_dir(&artifact.subdomain);
        for sub in TENANT_SUBDIRS {
            tokio::fs::create_dir_all(dir.join(sub)).await?;
        }

        let path = dir.join(CONFIG_FILE);
        let body = serde_json::to_vec_pretty(artifact)?;
        write_atomic(&path, &body).await?;

        debug!(path = %path.display(), "Wrote tenant configuration");
        Ok(path)
    }

    pub async fn read(&self, subdomain: &str) -> Result<Option<TenantConfigArtifact>, ArtifactError> {
        match tokio::fs::read(self.config_path(subdomain)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// Each writer stages its own file in the target directory, so concurrent writers never share one
async fn write_atomic(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
    let result = match tokio::fs::write(&tmp, body).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}
