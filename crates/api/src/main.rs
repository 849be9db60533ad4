mod api;
mod config;
mod metrics;
mod rate_limit;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(config::ApiConfig::default_config_path);
    info!(path = %config_path, "loading api config");
    let config = config::ApiConfig::load(&config_path)?;

    // Install the Prometheus recorder before anything emits metrics
    let prom_handle = metrics::init_global()?;

    // Open the registry database
    let db = Arc::new(registry::db::RegistryDb::open(&config.database.path).await?);
    let store = registry::store::ReportStore::new(db);

    // Build app state
    let state = Arc::new(api::AppState {
        store,
        rate_limiter: rate_limit::RateLimiter::new(
            config.rate_limit.max_requests,
            config.rate_limit.window_secs,
        ),
        metrics: Some(prom_handle),
    });

    // Build router
    let app = api::router(state);

    // Start HTTP server; ConnectInfo feeds the rate limiter's client identity
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!(addr = %bind_addr, "starting rugwatch API server");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
