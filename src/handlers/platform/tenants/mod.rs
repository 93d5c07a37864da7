// handlers/platform/tenants/mod.rs - Tenant administration handlers

pub mod active;     // PUT /api/platform/tenants/:subdomain/active
pub mod config;     // POST /api/platform/tenants/:subdomain/config
pub mod create;     // POST /api/platform/tenants
pub mod list;       // GET /api/platform/tenants
pub mod module_set; // PUT /api/platform/tenants/:subdomain/modules/:module_key
pub mod modules;    // GET /api/platform/tenants/:subdomain/modules
pub mod show;       // GET /api/platform/tenants/:subdomain
pub mod update;     // PATCH /api/platform/tenants/:subdomain

pub use active::tenant_set_active;
pub use config::tenant_config_regenerate;
pub use create::tenant_create;
pub use list::tenant_list;
pub use module_set::tenant_module_set;
pub use modules::tenant_modules;
pub use show::tenant_show;
pub use update::tenant_update;
