// handlers/public/mod.rs - Public handlers
//
// Reachable with or without a resolved tenant. The module gate bypasses
// /health and /api/public so branding lookups work for every tenant.

pub mod health;          // GET /health
pub mod not_found;       // fallback
pub mod root;            // GET /
pub mod tenant_config;   // GET /api/public/tenant-config[/:subdomain]

pub use health::health;
pub use not_found::not_found;
pub use root::root;
pub use tenant_config::{tenant_config_current, tenant_config_show};
