// handlers/platform/mod.rs - Platform administration handlers
//
// Guarded by the platform bearer token. /api/platform is on the module gate's
// bypass list; tenants are addressed by subdomain in the path, never by the
// request's own resolution.

pub mod module_access; // POST /api/platform/module-access
pub mod modules;       // /api/platform/modules
pub mod provisioning;  // GET /api/platform/provisioning/:job_id
pub mod statistics;    // GET /api/platform/statistics
pub mod tenants;       // /api/platform/tenants/*

pub use module_access::module_access;
pub use modules::{module_list, module_upsert};
pub use provisioning::provisioning_status;
pub use statistics::statistics;
pub use tenants::{
    tenant_config_regenerate, tenant_create, tenant_list, tenant_module_set, tenant_modules, tenant_set_active,
    tenant_show, tenant_update,
};
