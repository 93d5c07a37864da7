use axum::{
    http::{HeaderValue, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::{ApiConfig, AppConfig, SecurityConfig};
use crate::database::{ConnectionRegistry, RegistryError};
use crate::error::ApiError;
use crate::handlers::{platform, public, tenant};
use crate::middleware::{require_platform_token, tenant_pipeline};
use crate::services::module_catalog::default_definitions;
use crate::services::{
    ArtifactStore, ModuleCatalog, PgModuleCatalog, PgTenantDatabases, PgTenantDirectory, ProvisioningQueue,
    TenantDatabases, TenantDirectory, TenantProvisioner, TenantService,
};
use crate::tenancy::{ModuleAccessGate, ModuleRoutes, RouteTableError, TenantResolver};

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub catalog: Arc<dyn ModuleCatalog>,
    pub resolver: Arc<TenantResolver>,
    pub gate: Arc<ModuleAccessGate>,
    pub tenants: Arc<TenantService>,
    pub provisioner: Arc<TenantProvisioner>,
    pub queue: Arc<ProvisioningQueue>,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

impl AppState {
    /// Wire the Postgres-backed components. No connection is opened here.
    pub fn connect(config: &AppConfig) -> Result<Self, RegistryError> {
        let registry = Arc::new(ConnectionRegistry::new(&config.database)?);
        let main = registry.main_pool();

        let directory = Arc::new(PgTenantDirectory::new(main.clone()));
        let catalog = Arc::new(PgModuleCatalog::new(main));
        let databases = Arc::new(PgTenantDatabases::new(registry.clone()));

        Ok(Self::new(config, registry, directory, catalog, databases))
    }

    /// Must be called inside a tokio runtime; spawns the provisioning worker.
    pub fn new(
        config: &AppConfig,
        registry: Arc<ConnectionRegistry>,
        directory: Arc<dyn TenantDirectory>,
        catalog: Arc<dyn ModuleCatalog>,
        databases: Arc<dyn TenantDatabases>,
    ) -> Self {
        let artifacts = ArtifactStore::new(&config.tenancy.tenants_root, &config.tenancy.base_domain);

        let provisioner = Arc::new(TenantProvisioner::new(
            directory.clone(),
            catalog.clone(),
            databases,
            registry.clone(),
            artifacts.clone(),
            config.provisioning.clone(),
        ));
        let tenants = Arc::new(TenantService::new(
            directory.clone(),
            catalog.clone(),
            registry.clone(),
            artifacts,
        ));

        Self {
            resolver: Arc::new(TenantResolver::new(directory, config.tenancy.clone())),
            gate: Arc::new(ModuleAccessGate::new(ModuleRoutes::default_table(), catalog.clone())),
            queue: ProvisioningQueue::start(provisioner.clone()),
            registry,
            catalog,
            tenants,
            provisioner,
            api: config.api.clone(),
            security: config.security.clone(),
        }
    }

    /// Check the module route table against the built-in catalog and, when it
    /// is reachable and seeded, the live one.
    pub async fn verify_module_routes(&self) -> Result<(), RouteTableError> {
        let routes = self.gate.routes();
        routes.validate_against(&default_definitions())?;

        match self.catalog.definitions().await {
            Ok(definitions) if definitions.is_empty() => {
                warn!("Module catalog is empty; run `tenancy modules init`");
                Ok(())
            }
            Ok(definitions) => {
                routes.validate_against(&definitions)?;
                info!(modules = definitions.len(), "Module routes validated against catalog");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Module catalog unavailable; route table checked against defaults only");
                Ok(())
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    let platform_routes = Router::new()
        .route(
            "/api/platform/tenants",
            get(platform::tenant_list).post(platform::tenant_create),
        )
        .route(
            "/api/platform/tenants/:subdomain",
            get(platform::tenant_show).patch(platform::tenant_update),
        )
        .route("/api/platform/tenants/:subdomain/active", put(platform::tenant_set_active))
        .route("/api/platform/tenants/:subdomain/modules", get(platform::tenant_modules))
        .route(
            "/api/platform/tenants/:subdomain/modules/:module_key",
            put(platform::tenant_module_set),
        )
        .route("/api/platform/tenants/:subdomain/config", post(platform::tenant_config_regenerate))
        .route(
            "/api/platform/modules",
            get(platform::module_list).post(platform::module_upsert),
        )
        .route("/api/platform/module-access", post(platform::module_access))
        .route("/api/platform/statistics", get(platform::statistics))
        .route("/api/platform/provisioning/:job_id", get(platform::provisioning_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_platform_token));

    let router = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/api/public/tenant-config", get(public::tenant_config_current))
        .route("/api/public/tenant-config/:subdomain", get(public::tenant_config_show))
        .route("/api/tenant/context", get(tenant::context))
        .route("/api/tenant/health", get(tenant::health))
        .merge(platform_routes)
        .fallback(public::not_found)
        // Resolve, bind, scope and gate every request, matched or not
        .layer(middleware::from_fn_with_state(state.clone(), tenant_pipeline))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&state.api.cors_origins));

    let router = if state.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(cors::Any)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Request handler panicked");
    ApiError::internal_server_error("An error occurred while processing your request").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provisioner::ProvisionRequest;
    use crate::testing::TestHarness;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn get_with(path: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn harness_with_acme() -> TestHarness {
        let harness = TestHarness::new().await;
        harness
            .provisioner
            .provision(ProvisionRequest {
                name: "Acme".to_string(),
                subdomain: "acme".to_string(),
                module_keys: vec!["tasks".to_string()],
                ..ProvisionRequest::default()
            })
            .await
            .unwrap();
        harness
    }

    #[tokio::test]
    async fn disabled_module_path_is_denied() {
        let harness = harness_with_acme().await;
        let app = router(harness.state());

        let (status, _, body) = send(app, get_with("/wallet/x", &[("x-tenant-subdomain", "acme")])).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "MODULE_NOT_ENABLED");
        assert_eq!(body["reason"], "module_not_enabled");
        assert_eq!(body["module_key"], "wallet");
        assert_eq!(body["module_name"], "Wallet & Salary");
    }

    #[tokio::test]
    async fn tenant_context_via_host() {
        let harness = harness_with_acme().await;
        let app = router(harness.state());

        let (status, headers, body) = send(app, get_with("/api/tenant/context", &[("host", "acme.platform.example")])).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["subdomain"], "acme");
        assert_eq!(body["data"]["resolved_via"], "host_subdomain");
        assert_eq!(body["data"]["database_alias"], "tenant_acme");
        assert_eq!(headers["x-tenant-subdomain"], "acme");
        assert_eq!(headers["x-tenant-name"], "Acme");
        let modules: Vec<&str> = body["data"]["modules"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(modules, vec!["employees", "notifications", "tasks"]);
    }

    #[tokio::test]
    async fn bare_domain_is_unresolved_for_tenant_routes() {
        let harness = harness_with_acme().await;
        let app = router(harness.state());

        let (status, headers, body) = send(app, get_with("/api/tenant/context", &[("host", "platform.example")])).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "TENANT_UNRESOLVED");
        assert!(headers.get("x-tenant-name").is_none());
    }

    #[tokio::test]
    async fn public_config_lookup() {
        let harness = harness_with_acme().await;
        let app = router(harness.state());

        let (status, _, body) = send(app.clone(), get_with("/api/public/tenant-config/acme", &[])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["domain"], "acme.platform.example");
        assert_eq!(body["data"]["modules"]["tasks"], true);

        let (status, _, _) = send(app, get_with("/api/public/tenant-config/missing", &[])).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn platform_routes_require_token() {
        let harness = harness_with_acme().await;
        let app = router(harness.state());

        let (status, _, _) = send(app.clone(), get_with("/api/platform/tenants", &[])).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(
            app.clone(),
            get_with("/api/platform/tenants", &[("authorization", "Bearer wrong")]),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, body) = send(
            app,
            get_with("/api/platform/tenants", &[("authorization", "Bearer test-platform-token")]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["subdomain"], "acme");
    }

    #[tokio::test]
    async fn health_reports_unreachable_database() {
        let harness = TestHarness::new().await;
        let app = router(harness.state());

        let (status, _, body) = send(app, get_with("/health", &[])).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], true);
    }

    #[tokio::test]
    async fn route_table_matches_catalog() {
        let harness = TestHarness::new().await;
        harness.state().verify_module_routes().await.unwrap();
    }
}
