use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Global catalog entry for a purchasable module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ModuleDefinition {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub is_core: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl ModuleDefinition {
    pub fn new(key: &str, name: &str, description: &str, icon: &str, is_core: bool, sort_order: i32) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            is_core,
            sort_order,
        }
    }
}

/// One row per (tenant, module key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TenantModuleEnablement {
    pub tenant_id: Uuid,
    pub module_key: String,
    pub is_enabled: bool,
    pub enabled_at: Option<DateTime<Utc>>,
    pub disabled_at: Option<DateTime<Utc>>,
}

impl TenantModuleEnablement {
    pub fn new(tenant_id: Uuid, module_key: &str, is_enabled: bool, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            module_key: module_key.to_string(),
            is_enabled,
            enabled_at: is_enabled.then_some(now),
            disabled_at: None,
        }
    }

    /// Flip the flag and stamp the matching timestamp. No-op when already in that state.
    pub fn toggle(&mut self, is_enabled: bool, now: DateTime<Utc>) {
        if self.is_enabled == is_enabled {
            return;
        }
        self.is_enabled = is_enabled;
        if is_enabled {
            self.enabled_at = Some(now);
        } else {
            self.disabled_at = Some(now);
        }
    }
}
