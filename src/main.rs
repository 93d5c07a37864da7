use tenancy_api::app::{router, AppState};
use tenancy_api::config::config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_PLATFORM_ADMIN_TOKEN, etc.
    let _ = dotenvy::dotenv();

    let config = config();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.api.log_directives).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(
        environment = ?config.environment,
        base_domain = %config.tenancy.base_domain,
        "Starting tenancy API"
    );

    let state = AppState::connect(config)?;
    if let Err(e) = state.verify_module_routes().await {
        error!(error = %e, "Module route table is inconsistent with the catalog");
        std::process::exit(1);
    }
    if state.security.platform_admin_token.is_empty() {
        info!("Platform API disabled: no admin token configured");
    }

    let registry = state.registry.clone();
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(address = %bind_addr, "Tenancy API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.close_all().await;
    info!("Connection pools closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
