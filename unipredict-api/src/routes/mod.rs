//! API route definitions

mod health;
mod markets;
mod trading;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use serde::Serialize;
use std::time::Duration;
use unipredict_core::TradingError;
use unipredict_services::FanOut;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(markets::routes())
        .merge(trading::routes())
        .merge(health::routes())
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&TradingError> for ErrorResponse {
    fn from(e: &TradingError) -> Self {
        Self {
            error: e.to_string(),
            code: e.code(),
        }
    }
}

/// HTTP status for each error kind
pub fn status_for(e: &TradingError) -> StatusCode {
    match e {
        TradingError::PlatformNotFound(_) | TradingError::NotFound(_) => StatusCode::NOT_FOUND,
        TradingError::UnsupportedOperation(_) => StatusCode::NOT_IMPLEMENTED,
        TradingError::UnsupportedAsset(_) | TradingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        TradingError::Credential(_) => StatusCode::FORBIDDEN,
        TradingError::NotConnected(_) => StatusCode::SERVICE_UNAVAILABLE,
        TradingError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        TradingError::Connection(_)
        | TradingError::Submission(_)
        | TradingError::Decode(_)
        | TradingError::Upstream(_) => StatusCode::BAD_GATEWAY,
        TradingError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(e: &TradingError) -> Response {
    (status_for(e), Json(ErrorResponse::from(e))).into_response()
}

/// Parse user input, reporting parse failures as bad input
pub fn parse_param<T>(raw: &str, what: &str) -> Result<T, Response>
where
    T: std::str::FromStr<Err = TradingError>,
{
    raw.parse()
        .map_err(|e: TradingError| error_response(&TradingError::invalid_input(format!("{}: {}", what, e))))
}

/// Registered platform names are lowercase
pub fn platform_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// `None` for an absent, empty or "all" platform filter
pub fn platform_filter(platform: &Option<String>) -> Option<String> {
    platform
        .as_deref()
        .map(platform_name)
        .filter(|p| !p.is_empty() && p != "all")
}

pub fn timeout_from_ms(timeout_ms: Option<u64>) -> Option<Duration> {
    timeout_ms.map(Duration::from_millis)
}

/// One failed platform contribution
#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub platform: String,
    pub error: String,
    pub code: &'static str,
}

/// Merged fan-out result
#[derive(Debug, Serialize)]
pub struct FanOutResponse<T: Serialize> {
    pub items: Vec<T>,
    pub count: usize,
    pub failures: Vec<FailureResponse>,
}

impl<T: Serialize> From<FanOut<T>> for FanOutResponse<T> {
    fn from(merged: FanOut<T>) -> Self {
        let failures = merged
            .failures
            .iter()
            .map(|f| FailureResponse {
                platform: f.platform.clone(),
                error: f.error.to_string(),
                code: f.error.code(),
            })
            .collect();

        Self {
            count: merged.items.len(),
            items: merged.items,
            failures,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;
    use unipredict_core::{platforms, Blockchain, ChainConfig, RouterConfig};
    use unipredict_rest::RestMarketConnector;
    use unipredict_services::{Registry, TradingRouter};

    use crate::AppState;

    pub fn empty_state() -> AppState {
        AppState::new(TradingRouter::new(Arc::new(Registry::default()), RouterConfig::default()))
    }

    /// Hedgehog registered against an unreachable API on an unconnected chain
    pub fn hedgehog_state() -> AppState {
        let chain = unipredict_chains::build_chain(Blockchain::Ethereum, &ChainConfig::new("http://127.0.0.1:1")).unwrap();
        let hedgehog = RestMarketConnector::new(platforms::HEDGEHOG, "http://127.0.0.1:1", chain).unwrap();

        let mut registry = Registry::default();
        registry.register(Arc::new(hedgehog));
        AppState::new(TradingRouter::new(Arc::new(registry), RouterConfig::default()))
    }

    pub async fn send(state: AppState, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = crate::app(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }
}
