//! Polymarket API client
//!
//! Read-only access to the Gamma API (market metadata), the CLOB API (books
//! and prices), and the public Data API (user positions).

use crate::types::{
    ClobOrderbookResponse, ClobPriceResponse, GammaMarket, CLOB_API_BASE, DATA_API_BASE, GAMMA_API_BASE,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};
use unipredict_core::{Side, TradingError, TradingResult};

/// Polymarket API client
#[derive(Clone, Debug)]
pub struct PolymarketClient {
    client: Client,
    gamma_url: String,
    clob_url: String,
    data_api_url: String,
}

impl PolymarketClient {
    /// Create a client against the public endpoints
    pub fn new() -> TradingResult<Self> {
        Self::with_urls(GAMMA_API_BASE, CLOB_API_BASE, DATA_API_BASE)
    }

    /// Create a client against explicit endpoints
    pub fn with_urls(
        gamma_url: impl Into<String>,
        clob_url: impl Into<String>,
        data_api_url: impl Into<String>,
    ) -> TradingResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TradingError::connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            gamma_url: gamma_url.into().trim_end_matches('/').to_string(),
            clob_url: clob_url.into().trim_end_matches('/').to_string(),
            data_api_url: data_api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the Gamma base URL
    pub fn base_url(&self) -> &str {
        &self.gamma_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)], what: &str) -> TradingResult<T> {
        debug!("Fetching Polymarket {} from: {} {:?}", what, url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| TradingError::connection(format!("Failed to fetch {}: {}", what, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TradingError::not_found(format!("Polymarket {} not found", what)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::upstream(format!(
                "Polymarket API error ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TradingError::decode(format!("Failed to parse {} response: {}", what, e)))
    }

    /// List raw market payloads; records are decoded individually by the caller
    #[instrument(skip(self))]
    pub async fn list_markets(&self, limit: usize, closed: Option<bool>) -> TradingResult<Vec<serde_json::Value>> {
        let mut query = vec![
            ("limit", limit.to_string()),
            // Order by volume for most relevant markets
            ("order", "volume".to_string()),
            ("ascending", "false".to_string()),
        ];
        if let Some(closed) = closed {
            query.push(("closed", closed.to_string()));
        }

        let url = format!("{}/markets", self.gamma_url);
        self.get_json(&url, &query, "markets").await
    }

    /// Get a single market by ID; `None` when Gamma has no such market
    #[instrument(skip(self))]
    pub async fn get_market(&self, id: &str) -> TradingResult<Option<GammaMarket>> {
        let url = format!("{}/markets", self.gamma_url);
        let markets: Vec<serde_json::Value> = match self.get_json(&url, &[("id", id.to_string())], "market").await {
            Ok(markets) => markets,
            Err(TradingError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        markets
            .into_iter()
            .next()
            .map(|raw| {
                serde_json::from_value(raw)
                    .map_err(|e| TradingError::decode(format!("Market {}: {}", id, e)))
            })
            .transpose()
    }

    /// Get a market or fail with `NotFound`
    pub async fn require_market(&self, id: &str) -> TradingResult<GammaMarket> {
        self.get_market(id)
            .await?
            .ok_or_else(|| TradingError::not_found(format!("Market not found: {}", id)))
    }

    // ========================================================================
    // CLOB API Methods (Order Book, Price)
    // ========================================================================

    /// Get the order book for a token from the CLOB API
    #[instrument(skip(self))]
    pub async fn get_orderbook(&self, token_id: &str) -> TradingResult<ClobOrderbookResponse> {
        let url = format!("{}/book", self.clob_url);
        self.get_json(&url, &[("token_id", token_id.to_string())], "orderbook")
            .await
    }

    /// Get the current buy price for a token
    #[instrument(skip(self))]
    pub async fn get_price(&self, token_id: &str) -> TradingResult<ClobPriceResponse> {
        let url = format!("{}/price", self.clob_url);
        let query = [("token_id", token_id.to_string()), ("side", "buy".to_string())];
        self.get_json(&url, &query, "price").await
    }

    // ========================================================================
    // Data API Methods
    // ========================================================================

    /// List raw position payloads for a wallet
    #[instrument(skip(self))]
    pub async fn get_positions(&self, user_address: &str) -> TradingResult<Vec<serde_json::Value>> {
        let url = format!("{}/positions", self.data_api_url);
        let query = [("user", user_address.to_string()), ("sizeThreshold", "0".to_string())];
        self.get_json(&url, &query, "positions").await
    }

    /// Resolve the CLOB token for one side of a market
    pub async fn token_for(&self, market_id: &str, side: Side) -> TradingResult<String> {
        self.require_market(market_id).await?.token_id(side)
    }
}
