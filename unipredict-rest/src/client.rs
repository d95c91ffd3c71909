//! HTTP client for Hedgehog-style market APIs

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use unipredict_core::{TradingError, TradingResult};

/// Default Hedgehog Markets API
pub const HEDGEHOG_API_BASE: &str = "https://api.hedgehog.markets";

/// Default Myriad Markets API
pub const MYRIAD_API_BASE: &str = "https://api.myriad.markets";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// JSON client rooted at one API base URL
#[derive(Clone, Debug)]
pub struct RestClient {
    client: Client,
    base_url: url::Url,
}

impl RestClient {
    /// Create a client; fails with `Config` on a malformed base URL
    pub fn new(api_url: &str) -> TradingResult<Self> {
        // Trailing slash so joined paths stay under the base
        let normalized = format!("{}/", api_url.trim_end_matches('/'));
        let base_url = url::Url::parse(&normalized)
            .map_err(|e| TradingError::config(format!("Invalid API URL {}: {}", api_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TradingError::connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build the URL for `segments` under the base, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> TradingResult<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TradingError::config(format!("API URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document
    ///
    /// 404 maps to `NotFound`, other non-success statuses to `Upstream`.
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, String)]) -> TradingResult<T> {
        let url = self.endpoint(segments)?;
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| TradingError::connection(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TradingError::not_found(format!("{} returned 404", url)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::upstream(format!("API error ({}): {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| TradingError::decode(format!("Failed to parse response from {}: {}", url, e)))
    }
}
