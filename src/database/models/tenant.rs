use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::database::StorageError;

pub const DEFAULT_PRIMARY_COLOR: &str = "#3498db";
pub const DEFAULT_SECONDARY_COLOR: &str = "#2ecc71";

/// Tenant databases are named `tenant_<label>`; Postgres identifiers are capped at 63 bytes.
pub const MAX_SUBDOMAIN_LEN: usize = 56;

// RFC 6761: only ever resolves to loopback
const RESERVED_TLD: &str = "localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainType {
    Subdomain,
    Custom,
}

impl DomainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainType::Subdomain => "subdomain",
            DomainType::Custom => "custom",
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subdomain" => Ok(DomainType::Subdomain),
            "custom" => Ok(DomainType::Custom),
            other => Err(format!("unknown domain type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub domain_type: DomainType,
    pub is_active: bool,
    pub tls_issued: bool,
    pub tls_issued_at: Option<DateTime<Utc>>,
    pub primary_color: String,
    pub secondary_color: String,
    pub logo_url: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Name of the tenant's isolated database, also its key in the connection registry.
    ///
    /// Subdomains never contain `_`, so replacing `-` keeps the mapping injective.
    pub fn database_alias(&self) -> String {
        database_alias_for(&self.subdomain)
    }

    /// Effective public domain: the custom domain for custom-domain tenants, otherwise
    /// `<subdomain>.<base_domain>`.
    pub fn full_domain(&self, base_domain: &str) -> String {
        match (&self.domain_type, &self.custom_domain) {
            (DomainType::Custom, Some(domain)) => domain.clone(),
            _ => format!("{}.{}", self.subdomain, base_domain),
        }
    }

    pub fn check_invariants(&self) -> Result<(), TenantValidationError> {
        if self.domain_type == DomainType::Custom && self.custom_domain.is_none() {
            return Err(TenantValidationError::MissingCustomDomain);
        }
        Ok(())
    }
}

pub fn database_alias_for(subdomain: &str) -> String {
    format!("tenant_{}", subdomain.replace('-', "_"))
}

/// Row shape of the `tenants` table
#[derive(Debug, Clone, FromRow)]
pub struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub domain_type: String,
    pub is_active: bool,
    pub tls_issued: bool,
    pub tls_issued_at: Option<DateTime<Utc>>,
    pub primary_color: String,
    pub secondary_color: String,
    pub logo_url: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = StorageError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let domain_type = row.domain_type.parse().map_err(StorageError::Invalid)?;
        Ok(Tenant {
            id: row.id,
            name: row.name,
            subdomain: row.subdomain,
            custom_domain: row.custom_domain,
            domain_type,
            is_active: row.is_active,
            tls_issued: row.tls_issued,
            tls_issued_at: row.tls_issued_at,
            primary_color: row.primary_color,
            secondary_color: row.secondary_color,
            logo_url: row.logo_url,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantValidationError {
    #[error("Tenant name must not be empty")]
    EmptyName,

    #[error("Invalid subdomain '{0}': use 1-56 characters of a-z, 0-9 and '-', not starting or ending with '-'")]
    InvalidSubdomain(String),

    #[error("Invalid custom domain '{0}'")]
    InvalidCustomDomain(String),

    #[error("Domain type 'custom' requires a custom domain")]
    MissingCustomDomain,

    #[error("Invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
}

impl TenantValidationError {
    /// Request field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            TenantValidationError::EmptyName => "name",
            TenantValidationError::InvalidSubdomain(_) => "subdomain",
            TenantValidationError::InvalidCustomDomain(_) | TenantValidationError::MissingCustomDomain => {
                "custom_domain"
            }
            TenantValidationError::InvalidColor(_) => "color",
        }
    }
}

/// Validate and normalize a subdomain label
pub fn normalize_subdomain(value: &str) -> Result<String, TenantValidationError> {
    let label = value.trim().to_ascii_lowercase();
    let valid = !label.is_empty()
        && label.len() <= MAX_SUBDOMAIN_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(label)
    } else {
        Err(TenantValidationError::InvalidSubdomain(value.to_string()))
    }
}

/// Validate and normalize a custom domain (lowercase, no trailing dot, at least two labels).
/// Names under the loopback-only `localhost` TLD are refused.
pub fn normalize_domain(value: &str) -> Result<String, TenantValidationError> {
    let domain = value.trim().trim_end_matches('.').to_ascii_lowercase();
    let labels: Vec<&str> = domain.split('.').collect();
    let valid = labels.len() >= 2
        && labels.last() != Some(&RESERVED_TLD)
        && domain.len() <= 253
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if valid {
        Ok(domain)
    } else {
        Err(TenantValidationError::InvalidCustomDomain(value.to_string()))
    }
}

fn validate_color(value: &str) -> Result<String, TenantValidationError> {
    let color = value.trim();
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(color.to_ascii_lowercase())
    } else {
        Err(TenantValidationError::InvalidColor(value.to_string()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Fields accepted when registering a tenant
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub subdomain: String,
    #[serde(default)]
    pub custom_domain: Option<String>,
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

impl NewTenant {
    /// Validate the input and build the tenant record. Domain type follows the presence of
    /// a custom domain.
    pub fn into_tenant(self, now: DateTime<Utc>) -> Result<Tenant, TenantValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(TenantValidationError::EmptyName);
        }
        let subdomain = normalize_subdomain(&self.subdomain)?;
        let custom_domain = non_empty(self.custom_domain)
            .map(|d| normalize_domain(&d))
            .transpose()?;
        let primary_color = non_empty(self.primary_color)
            .map(|c| validate_color(&c))
            .transpose()?
            .unwrap_or_else(|| DEFAULT_PRIMARY_COLOR.to_string());
        let secondary_color = non_empty(self.secondary_color)
            .map(|c| validate_color(&c))
            .transpose()?
            .unwrap_or_else(|| DEFAULT_SECONDARY_COLOR.to_string());

        let domain_type = if custom_domain.is_some() {
            DomainType::Custom
        } else {
            DomainType::Subdomain
        };

        Ok(Tenant {
            id: Uuid::new_v4(),
            name,
            subdomain,
            custom_domain,
            domain_type,
            is_active: true,
            tls_issued: false,
            tls_issued_at: None,
            primary_color,
            secondary_color,
            logo_url: non_empty(self.logo_url),
            contact_email: non_empty(self.contact_email),
            contact_phone: non_empty(self.contact_phone),
            created_by: non_empty(self.created_by),
            created_at: now,
            updated_at: now,
        })
    }
}

// Distinguishes an absent field from an explicit `null`
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Partial update of tenant settings. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub custom_domain: Option<Option<String>>,
    #[serde(default)]
    pub domain_type: Option<DomainType>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub tls_issued: Option<bool>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub logo_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub contact_phone: Option<Option<String>>,
}

impl TenantUpdate {
    pub fn activation(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    /// Apply onto `tenant`, leaving it untouched when validation fails.
    pub fn apply(&self, tenant: &mut Tenant, now: DateTime<Utc>) -> Result<(), TenantValidationError> {
        let mut next = tenant.clone();

        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(TenantValidationError::EmptyName);
            }
            next.name = name.to_string();
        }
        if let Some(custom_domain) = &self.custom_domain {
            next.custom_domain = non_empty(custom_domain.clone())
                .map(|d| normalize_domain(&d))
                .transpose()?;
            if self.domain_type.is_none() {
                next.domain_type = if next.custom_domain.is_some() {
                    DomainType::Custom
                } else {
                    DomainType::Subdomain
                };
            }
        }
        if let Some(domain_type) = self.domain_type {
            next.domain_type = domain_type;
        }
        if let Some(is_active) = self.is_active {
            next.is_active = is_active;
        }
        if let Some(tls_issued) = self.tls_issued {
            if tls_issued && !next.tls_issued {
                next.tls_issued_at = Some(now);
            } else if !tls_issued {
                next.tls_issued_at = None;
            }
            next.tls_issued = tls_issued;
        }
        if let Some(color) = &self.primary_color {
            next.primary_color = validate_color(color)?;
        }
        if let Some(color) = &self.secondary_color {
            next.secondary_color = validate_color(color)?;
        }
        if let Some(logo_url) = &self.logo_url {
            next.logo_url = non_empty(logo_url.clone());
        }
        if let Some(email) = &self.contact_email {
            next.contact_email = non_empty(email.clone());
        }
        if let Some(phone) = &self.contact_phone {
            next.contact_phone = non_empty(phone.clone());
        }

        next.check_invariants()?;
        next.updated_at = now;
        *tenant = next;
        Ok(())
    }
}
