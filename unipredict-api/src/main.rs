//! Unified prediction-market trader API server
//!
//! HTTP front end over the trading router: market discovery, positions,
//! order books and chain queries across every registered platform.

mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use unipredict_core::TraderConfig;
use unipredict_services::{Registry, TradingRouter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<TradingRouter>,
}

impl AppState {
    pub fn new(router: TradingRouter) -> Self {
        Self {
            router: Arc::new(router),
        }
    }
}

/// Build the HTTP application around `state`
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,unipredict_api=debug")),
        )
        .init();

    info!("Starting unified prediction-market trader API");

    let config = TraderConfig::from_env()?;
    if config.blockchains.is_empty() {
        warn!("No chains configured; set e.g. POLYGON_RPC_URL or POLYGON_ENABLED=true");
    }

    let registry = Registry::build(&config).await;
    for warning in registry.warnings() {
        warn!("Startup: {}", warning);
    }
    info!(
        "Registered platforms: {:?} on chains {:?}",
        registry.platforms(),
        registry.chains()
    );

    let router = TradingRouter::new(Arc::new(registry), config.router);
    let app = app(AppState::new(router));

    let port: u16 = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
