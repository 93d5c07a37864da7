//! Per-request tenant identification, database binding and module gating.

pub mod context;
pub mod gate;
pub mod resolver;

pub use context::{BoundTenant, RequestContext};
pub use gate::{Access, DenialReason, ModuleAccessGate, ModuleDenial, ModuleRoutes, RouteTableError};
pub use resolver::{normalize_host, RequestSignals, ResolveError, Resolution, ResolvedVia, TenantResolver};
