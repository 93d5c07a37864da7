pub mod module;
pub mod tenant;

pub use module::{ModuleDefinition, TenantModuleEnablement};
pub use tenant::{
    normalize_domain, normalize_subdomain, DomainType, NewTenant, Tenant, TenantRow, TenantUpdate, TenantValidationError,
};
