use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::database::models::{ModuleDefinition, Tenant};
use crate::database::StorageError;
use crate::services::module_catalog::{find_definition, ModuleCatalog};

/// Paths that never require a module, whatever the table says
const BYPASS_PREFIXES: &[&str] = &[
    "/health",
    "/api/auth",
    "/api/public",
    "/api/platform",
    "/api/tenant",
    "/api/hr/public",
    "/api/hr/client-portal",
    "/api/hr/client/auth",
    "/api/hr/current-user",
    "/static",
    "/media",
];

const MODULE_PREFIXES: &[(&str, &str)] = &[
    ("/api/hr/employees", "employees"),
    ("/api/hr/departments", "employees"),
    ("/api/hr/attendance", "attendance"),
    ("/api/hr/leave-requests", "attendance"),
    ("/api/hr/wallet", "wallet"),
    ("/api/hr/salaries", "wallet"),
    ("/api/hr/reimbursements", "wallet"),
    ("/api/hr/tasks", "tasks"),
    ("/api/hr/subtasks", "tasks"),
    ("/api/hr/teams", "tasks"),
    ("/api/hr/complaints", "complaints"),
    ("/api/hr/complaint-categories", "complaints"),
    ("/api/hr/shifts", "shifts"),
    ("/api/hr/shift-schedules", "shifts"),
    ("/api/hr/shift-overrides", "shifts"),
    ("/api/hr/reports", "reports"),
    ("/api/hr/notifications", "notifications"),
    // Short paths used by client applications
    ("/wallet", "wallet"),
    ("/tasks", "tasks"),
    ("/complaints", "complaints"),
];

#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("Route prefix '{prefix}' maps to unknown module '{module_key}'")]
    UnknownModule { prefix: String, module_key: String },

    #[error("Route prefix '{0}' must start with '/'")]
    InvalidPrefix(String),
}

/// Path prefix to required module key, matched on whole path segments
#[derive(Debug, Clone)]
pub struct ModuleRoutes {
    entries: Vec<(String, String)>,
    bypass: Vec<String>,
}

fn segment_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => prefix.is_empty() || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl ModuleRoutes {
    pub fn new<I, P, K>(entries: I, bypass: &[&str]) -> Self
    where
        I: IntoIterator<Item = (P, K)>,
        P: Into<String>,
        K: Into<String>,
    {
        let mut entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(p, k)| (p.into(), k.into()))
            .collect();
        // Longest prefix first so the first hit is the most specific
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            entries,
            bypass: bypass.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn default_table() -> Self {
        Self::new(MODULE_PREFIXES.iter().copied(), BYPASS_PREFIXES)
    }

    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass.iter().any(|prefix| segment_prefix(path, prefix))
    }

    /// Module key guarding `path`, if any
    pub fn required_module(&self, path: &str) -> Option<&str> {
        if self.is_bypassed(path) {
            return None;
        }
        self.entries
            .iter()
            .find(|(prefix, _)| segment_prefix(path, prefix))
            .map(|(_, key)| key.as_str())
    }

    pub fn module_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.iter().map(|(_, k)| k.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Every mapped key must exist in `definitions`
    pub fn validate_against(&self, definitions: &[ModuleDefinition]) -> Result<(), RouteTableError> {
        for (prefix, key) in &self.entries {
            if !prefix.starts_with('/') {
                return Err(RouteTableError::InvalidPrefix(prefix.clone()));
            }
            if find_definition(definitions, key).is_none() {
                return Err(RouteTableError::UnknownModule {
                    prefix: prefix.clone(),
                    module_key: key.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DenialReason {
    #[serde(rename = "module_not_enabled")]
    NotEnabled,
    #[serde(rename = "module_not_found")]
    NotFound,
}

/// Structured refusal returned to the client as 403
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDenial {
    pub reason: DenialReason,
    pub module_key: String,
    pub module_name: Option<String>,
    pub upgrade_available: bool,
}

impl ModuleDenial {
    pub fn message(&self) -> String {
        let name = self.module_name.as_deref().unwrap_or(&self.module_key);
        match self.reason {
            DenialReason::NotEnabled => format!("Module \"{}\" is not enabled for this tenant", name),
            DenialReason::NotFound => format!("Module \"{}\" is not available", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(ModuleDenial),
}

pub struct ModuleAccessGate {
    routes: ModuleRoutes,
    catalog: Arc<dyn ModuleCatalog>,
}

impl ModuleAccessGate {
    pub fn new(routes: ModuleRoutes, catalog: Arc<dyn ModuleCatalog>) -> Self {
        Self { routes, catalog }
    }

    pub fn routes(&self) -> &ModuleRoutes {
        &self.routes
    }

    /// Unmapped paths and requests without a tenant are allowed without a lookup.
    pub async fn check(&self, path: &str, tenant: Option<&Tenant>) -> Result<Access, StorageError> {
        let Some(module_key) = self.routes.required_module(path) else {
            return Ok(Access::Allow);
        };
        let Some(tenant) = tenant else {
            debug!(path, module_key, "No tenant in context, module check skipped");
            return Ok(Access::Allow);
        };

        let row = self.catalog.enablement(tenant.id, module_key).await?;
        if row.as_ref().is_some_and(|r| r.is_enabled) {
            return Ok(Access::Allow);
        }

        let definitions = self.catalog.definitions().await?;
        let definition = find_definition(&definitions, module_key);
        let denial = ModuleDenial {
            reason: if row.is_some() {
                DenialReason::NotEnabled
            } else {
                DenialReason::NotFound
            },
            module_key: module_key.to_string(),
            module_name: definition.map(|d| d.name.clone()),
            upgrade_available: definition.is_some(),
        };
        warn!(
            tenant = %tenant.subdomain,
            path,
            module_key,
            reason = ?denial.reason,
            "Module access denied"
        );
        Ok(Access::Deny(denial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::module_catalog::default_definitions;
    use crate::testing::{sample_tenant, MemoryModuleCatalog};

    fn gate(catalog: Arc<MemoryModuleCatalog>) -> ModuleAccessGate {
        ModuleAccessGate::new(ModuleRoutes::default_table(), catalog)
    }

    #[test]
    fn longest_prefix_wins_on_segment_boundaries() {
        let routes = ModuleRoutes::new(
            [("/api/hr", "employees"), ("/api/hr/wallet", "wallet")],
            &["/api/hr/public"],
        );
        assert_eq!(routes.required_module("/api/hr/wallet/42"), Some("wallet"));
        assert_eq!(routes.required_module("/api/hr/wallet"), Some("wallet"));
        assert_eq!(routes.required_module("/api/hr/wallets"), Some("employees"));
        assert_eq!(routes.required_module("/api/hr/public/form"), None);
        assert_eq!(routes.required_module("/other"), None);
    }

    #[test]
    fn default_table_matches_default_catalog() {
        let routes = ModuleRoutes::default_table();
        routes.validate_against(&default_definitions()).unwrap();
        assert_eq!(routes.required_module("/wallet/x"), Some("wallet"));
        assert_eq!(routes.required_module("/api/tenant/context"), None);
        assert_eq!(routes.required_module("/health"), None);
    }

    #[test]
    fn validation_rejects_typos() {
        let routes = ModuleRoutes::new([("/api/hr/wallet", "walet")], &[]);
        let err = routes.validate_against(&default_definitions()).unwrap_err();
        assert!(matches!(err, RouteTableError::UnknownModule { module_key, .. } if module_key == "walet"));
    }

    #[tokio::test]
    async fn disabled_module_is_denied() {
        let catalog = Arc::new(MemoryModuleCatalog::with_defaults());
        let tenant = sample_tenant("acme");
        catalog.set_enabled(tenant.id, "wallet", false).await.unwrap();

        let access = gate(catalog).check("/wallet/x", Some(&tenant)).await.unwrap();
        match access {
            Access::Deny(denial) => {
                assert_eq!(denial.reason, DenialReason::NotEnabled);
                assert_eq!(denial.module_key, "wallet");
                assert_eq!(denial.module_name.as_deref(), Some("Wallet & Salary"));
                assert!(denial.upgrade_available);
            }
            Access::Allow => panic!("wallet should be denied"),
        }
    }

    #[tokio::test]
    async fn missing_row_is_a_distinct_denial() {
        let catalog = Arc::new(MemoryModuleCatalog::with_defaults());
        let tenant = sample_tenant("acme");

        let access = gate(catalog).check("/api/hr/tasks/1", Some(&tenant)).await.unwrap();
        assert!(matches!(access, Access::Deny(ModuleDenial { reason: DenialReason::NotFound, .. })));
    }

    #[tokio::test]
    async fn enabled_module_is_allowed() {
        let catalog = Arc::new(MemoryModuleCatalog::with_defaults());
        let tenant = sample_tenant("acme");
        catalog.set_enabled(tenant.id, "tasks", true).await.unwrap();

        let access = gate(catalog).check("/tasks", Some(&tenant)).await.unwrap();
        assert_eq!(access, Access::Allow);
    }

    #[tokio::test]
    async fn unmapped_path_performs_no_lookup() {
        let catalog = Arc::new(MemoryModuleCatalog::with_defaults());
        let gate = gate(catalog.clone());
        let tenant = sample_tenant("acme");

        assert_eq!(gate.check("/api/unmapped", Some(&tenant)).await.unwrap(), Access::Allow);
        assert_eq!(gate.check("/api/unmapped", None).await.unwrap(), Access::Allow);
        assert_eq!(gate.check("/wallet/x", None).await.unwrap(), Access::Allow);
        assert_eq!(catalog.lookups(), 0);
    }
}
