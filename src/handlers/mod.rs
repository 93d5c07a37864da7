// handlers/mod.rs - Handlers grouped by how a request reaches them
//
// Public (no tenant required) → Tenant (bound tenant required) → Platform (admin token)
//
// Every request has already passed the tenant pipeline (resolve → bind → scope → gate)
// before a handler runs, so handlers read the tenant from `BoundTenant` or
// `RequestContext` and never resolve it themselves.
pub mod public;   // /, /health, /api/public/*
pub mod tenant;   // /api/tenant/*
pub mod platform; // /api/platform/*
