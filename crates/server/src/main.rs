use std::sync::Arc;

use anyhow::Result;
use axum::{http::HeaderName, routing::get, serve, Router};
use meridian_core::{
    config::AppConfig,
    directory::{cache::DirectoryCache, store::SqliteStore},
    forward::ForwardEngine,
    region::CountryRegionTable,
    routes::RouteTable,
};
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod router;

use router::GatewayState;

/// Initializes the logging system based on the configuration.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,meridian_core={level},server={level},sync={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        // "pretty" and any other format default to pretty logging
        registry
            .with(tracing_subscriber::fmt::layer().pretty().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("Starting Meridian gateway");
    debug!(
        environment = %config.environment,
        bind_port = config.server.bind_port,
        fallback_endpoints = config.gateway.fallback_endpoints.len(),
        "Configuration loaded"
    );

    let store = Arc::new(
        SqliteStore::new(&config.store.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Directory store initialization failed: {e}"))?,
    );
    let cache = DirectoryCache::new(store, config.cache_config());
    let engine = Arc::new(
        ForwardEngine::new(
            cache,
            Arc::new(CountryRegionTable::standard()),
            config.forward_config(),
        )
        .map_err(|e| anyhow::anyhow!("Forward engine initialization failed: {e}"))?,
    );

    let routes = Arc::new(RouteTable::standard());
    info!(routes = routes.len(), "Route table initialized");

    let country_header = HeaderName::from_bytes(config.gateway.country_header.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid country header name: {e}"))?;

    let state = GatewayState { engine, routes, country_header };
    let app = create_app(state, &config);

    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    info!(address = %addr, "Gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error occurred");
    }

    info!("Server shutdown complete");
    Ok(())
}

fn create_app(state: GatewayState, config: &AppConfig) -> Router {
    Router::new()
        .route("/healthz", get(router::handle_health))
        .fallback(router::handle_gateway)
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(router::MAX_BODY_BYTES))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
