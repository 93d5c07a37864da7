pub mod platform_auth;
pub mod response;
pub mod tenant;

pub use platform_auth::require_platform_token;
pub use response::{ApiResponse, ApiResult};
pub use tenant::tenant_pipeline;
