//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use unipredict_core::Blockchain;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    chains: Vec<Blockchain>,
    platforms: Vec<String>,
    warnings: Vec<String>,
}

/// Healthy with every startup step clean, degraded with warnings, and
/// unavailable when no platform is registered
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let registry = state.router.registry();
    let platforms: Vec<String> = registry.platforms().into_iter().collect();
    let warnings: Vec<String> = registry.warnings().iter().map(|w| w.to_string()).collect();

    let (status, code) = if platforms.is_empty() {
        ("unavailable", StatusCode::SERVICE_UNAVAILABLE)
    } else if !warnings.is_empty() {
        ("degraded", StatusCode::OK)
    } else {
        ("healthy", StatusCode::OK)
    };

    let response = HealthResponse {
        status: status.to_string(),
        chains: registry.chains(),
        platforms,
        warnings,
    };

    (code, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
