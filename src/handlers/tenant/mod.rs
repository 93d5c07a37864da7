// handlers/tenant/mod.rs - Tenant-scoped handlers
//
// Require a resolved, active tenant. The `BoundTenant` extractor rejects
// with TENANT_UNRESOLVED when the pipeline recorded no tenant.

pub mod context; // GET /api/tenant/context
pub mod health;  // GET /api/tenant/health

pub use context::context;
pub use health::health;
