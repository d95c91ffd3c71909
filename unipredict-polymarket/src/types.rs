//! Polymarket API response types
//!
//! These types mirror the Gamma, CLOB, and Data API responses and are
//! converted to unipredict-core records. Conversions fail with `Decode`
//! rather than guessing a value the payload does not carry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use unipredict_core::{
    decimal_from_value, optional_decimal, platforms, required_decimal, Blockchain, BookSide, Market, MarketStatus,
    OrderBookLevel, Position, Side, TradingError, TradingResult,
};

/// Base URL for the Gamma market metadata API
pub const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

/// CLOB API base URL
pub const CLOB_API_BASE: &str = "https://clob.polymarket.com";

/// Base URL for the public data API (no auth required)
pub const DATA_API_BASE: &str = "https://data-api.polymarket.com";

// ============================================================================
// Gamma API
// ============================================================================

/// A Polymarket market from the Gamma API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    pub id: String,

    pub question: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub slug: Option<String>,

    /// Condition ID (used for CLOB and the data API)
    #[serde(default)]
    pub condition_id: Option<String>,

    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub category: Option<String>,

    /// Total volume (string or number depending on endpoint)
    #[serde(default)]
    pub volume: Option<serde_json::Value>,

    #[serde(default)]
    pub liquidity: Option<serde_json::Value>,

    /// Outcomes as a JSON-encoded string, e.g. `"[\"Yes\", \"No\"]"`
    #[serde(default)]
    pub outcomes: Option<String>,

    #[serde(default)]
    pub outcome_prices: Option<String>,

    #[serde(default)]
    pub active: Option<bool>,

    #[serde(default)]
    pub closed: Option<bool>,

    /// UMA oracle resolution state
    #[serde(default)]
    pub uma_resolution_status: Option<String>,

    /// CLOB token IDs as a JSON-encoded string, YES first
    #[serde(default)]
    pub clob_token_ids: Option<String>,
}

impl GammaMarket {
    /// Derive the lifecycle status from the oracle and trading flags
    pub fn status(&self) -> TradingResult<MarketStatus> {
        if let Some(resolution) = self.uma_resolution_status.as_deref() {
            match resolution.to_lowercase().as_str() {
                "resolved" => return Ok(MarketStatus::Resolved),
                "" | "proposed" | "disputed" | "challenged" => {}
                other => {
                    return Err(TradingError::decode(format!(
                        "Market {}: unknown resolution status '{}'",
                        self.id, other
                    )))
                }
            }
        }

        match (self.closed, self.active) {
            (Some(true), _) => Ok(MarketStatus::Closed),
            (_, Some(false)) => Ok(MarketStatus::Closed),
            (Some(false), _) | (None, Some(true)) => Ok(MarketStatus::Open),
            (None, None) => Err(TradingError::decode(format!(
                "Market {}: no status fields present",
                self.id
            ))),
        }
    }

    /// Outcome labels; binary markets omit them
    pub fn parse_outcomes(&self) -> TradingResult<Vec<String>> {
        match self.outcomes.as_deref() {
            None => Ok(vec!["Yes".to_string(), "No".to_string()]),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| TradingError::decode(format!("Market {}: invalid outcomes {}: {}", self.id, raw, e))),
        }
    }

    /// Parse CLOB token IDs, returning (yes_token_id, no_token_id)
    pub fn parse_clob_token_ids(&self) -> TradingResult<(String, String)> {
        let raw = self
            .clob_token_ids
            .as_deref()
            .ok_or_else(|| TradingError::decode(format!("Market {} has no CLOB tokens", self.id)))?;

        let ids: Vec<String> = serde_json::from_str(raw)
            .map_err(|e| TradingError::decode(format!("Market {}: invalid token ids: {}", self.id, e)))?;

        match ids.as_slice() {
            [yes, no, ..] => Ok((yes.clone(), no.clone())),
            _ => Err(TradingError::decode(format!(
                "Market {}: expected two CLOB tokens, got {}",
                self.id,
                ids.len()
            ))),
        }
    }

    /// Token ID for one side of a binary market
    pub fn token_id(&self, side: Side) -> TradingResult<String> {
        let (yes, no) = self.parse_clob_token_ids()?;
        Ok(match side {
            Side::Yes => yes,
            Side::No => no,
        })
    }

    /// Convert to a unipredict-core Market
    pub fn into_market(self, blockchain: Blockchain) -> TradingResult<Market> {
        let status = self.status()?;
        let outcomes = self.parse_outcomes()?;
        let volume = optional_decimal(self.volume.as_ref(), &format!("volume for market {}", self.id))?;
        let liquidity = optional_decimal(self.liquidity.as_ref(), &format!("liquidity for market {}", self.id))?;

        let mut metadata = serde_json::Map::new();
        if let Some(slug) = &self.slug {
            metadata.insert("slug".into(), slug.clone().into());
            metadata.insert("url".into(), format!("https://polymarket.com/event/{}", slug).into());
        }
        if let Some(condition_id) = &self.condition_id {
            metadata.insert("conditionId".into(), condition_id.clone().into());
        }
        if let Some(category) = &self.category {
            metadata.insert("category".into(), category.clone().into());
        }
        if let Some(prices) = &self.outcome_prices {
            metadata.insert("outcomePrices".into(), prices.clone().into());
        }
        if let Ok((yes, no)) = self.parse_clob_token_ids() {
            metadata.insert("clobTokenIds".into(), serde_json::json!([yes, no]));
        }

        Ok(Market {
            volume,
            liquidity,
            id: self.id,
            question: self.question,
            description: self.description,
            outcomes,
            status,
            end_date: self.end_date,
            platform: platforms::POLYMARKET.to_string(),
            blockchain,
            metadata,
        })
    }
}

// ============================================================================
// CLOB API
// ============================================================================

/// Response from GET /book
#[derive(Debug, Clone, Deserialize)]
pub struct ClobOrderbookResponse {
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    /// Bid levels (buy orders)
    #[serde(default)]
    pub bids: Vec<ClobOrderLevel>,
    /// Ask levels (sell orders)
    #[serde(default)]
    pub asks: Vec<ClobOrderLevel>,
}

/// A single level in the CLOB order book
#[derive(Debug, Clone, Deserialize)]
pub struct ClobOrderLevel {
    /// Price as string (0.00 - 1.00)
    pub price: String,
    /// Size/quantity as string
    pub size: String,
}

impl ClobOrderLevel {
    fn to_level(&self) -> TradingResult<OrderBookLevel> {
        let price = Decimal::from_str(&self.price)
            .map_err(|e| TradingError::decode(format!("Invalid book price {}: {}", self.price, e)))?;
        let size = Decimal::from_str(&self.size)
            .map_err(|e| TradingError::decode(format!("Invalid book size {}: {}", self.size, e)))?;
        Ok(OrderBookLevel::new(price, size))
    }
}

impl ClobOrderbookResponse {
    /// Convert one token's book into a sorted book side
    pub fn to_book_side(&self) -> TradingResult<BookSide> {
        let bids = self.bids.iter().map(ClobOrderLevel::to_level).collect::<TradingResult<Vec<_>>>()?;
        let asks = self.asks.iter().map(ClobOrderLevel::to_level).collect::<TradingResult<Vec<_>>>()?;
        Ok(BookSide::from_levels(bids, asks))
    }
}

/// Response from GET /price
#[derive(Debug, Clone, Deserialize)]
pub struct ClobPriceResponse {
    #[serde(default)]
    pub price: Option<serde_json::Value>,
}

impl ClobPriceResponse {
    pub fn parse_price(&self, token_id: &str) -> TradingResult<Decimal> {
        self.price
            .as_ref()
            .and_then(decimal_from_value)
            .ok_or_else(|| TradingError::decode(format!("No price quoted for token {}", token_id)))
    }
}

// ============================================================================
// Public Data API Types (https://data-api.polymarket.com)
// ============================================================================

/// A holding from GET /positions
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataApiPosition {
    /// Outcome token ID
    pub asset: String,
    pub condition_id: String,
    pub size: serde_json::Value,
    #[serde(default)]
    pub initial_value: Option<serde_json::Value>,
    #[serde(default)]
    pub current_value: Option<serde_json::Value>,
    /// Outcome label ("Yes"/"No")
    pub outcome: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl DataApiPosition {
    pub fn into_position(self, blockchain: Blockchain) -> TradingResult<Position> {
        let side = Side::from_str(&self.outcome).map_err(|_| {
            TradingError::decode(format!("Position {}: non-binary outcome '{}'", self.asset, self.outcome))
        })?;

        let field = |name: &str, value: Option<&serde_json::Value>| {
            required_decimal(value, &format!("{} for position {}", name, self.asset))
        };

        let shares = field("size", Some(&self.size))?;
        let cost_basis = field("initialValue", self.initial_value.as_ref())?;
        let current_value = field("currentValue", self.current_value.as_ref())?;

        Ok(Position {
            id: self.asset,
            market_id: self.condition_id,
            side,
            shares,
            cost_basis,
            current_value,
            platform: platforms::POLYMARKET.to_string(),
            blockchain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn gamma(extra: serde_json::Value) -> GammaMarket {
        let mut base = json!({
            "id": "512",
            "question": "Will it rain tomorrow?",
            "conditionId": "0xabc",
            "slug": "rain-tomorrow",
            "volume": "1234.5",
            "liquidityNum": 10.0,
            "outcomes": "[\"Yes\", \"No\"]",
            "clobTokenIds": "[\"111\", \"222\"]",
            "endDate": "2026-12-31T00:00:00Z"
        });
        if let (Some(obj), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn test_open_market_conversion() {
        let market = gamma(json!({ "active": true, "closed": false }))
            .into_market(Blockchain::Polygon)
            .unwrap();

        assert_eq!(market.status, MarketStatus::Open);
        assert_eq!(market.platform, "polymarket");
        assert_eq!(market.blockchain, Blockchain::Polygon);
        assert_eq!(market.outcomes, vec!["Yes", "No"]);
        assert_eq!(market.volume, Some(dec!(1234.5)));
        assert_eq!(market.metadata["conditionId"], "0xabc");
        assert_eq!(market.metadata["clobTokenIds"], json!(["111", "222"]));
    }

    #[test]
    fn test_malformed_volume_is_decode_error() {
        let market = gamma(json!({ "closed": false, "volume": "n/a" })).into_market(Blockchain::Polygon);
        assert!(matches!(market, Err(TradingError::Decode(_))));

        let market = gamma(json!({ "closed": false, "volume": null }))
            .into_market(Blockchain::Polygon)
            .unwrap();
        assert_eq!(market.volume, None);
    }

    #[test]
    fn test_status_mapping() {
        let closed = gamma(json!({ "active": true, "closed": true }));
        assert_eq!(closed.status().unwrap(), MarketStatus::Closed);

        let resolved = gamma(json!({ "closed": true, "umaResolutionStatus": "resolved" }));
        assert_eq!(resolved.status().unwrap(), MarketStatus::Resolved);

        let proposed = gamma(json!({ "closed": false, "umaResolutionStatus": "proposed" }));
        assert_eq!(proposed.status().unwrap(), MarketStatus::Open);
    }

    #[test]
    fn test_missing_or_unknown_status_is_decode_error() {
        let bare = gamma(json!({}));
        assert!(matches!(bare.into_market(Blockchain::Polygon), Err(TradingError::Decode(_))));

        let weird = gamma(json!({ "closed": false, "umaResolutionStatus": "exploded" }));
        assert!(matches!(weird.status(), Err(TradingError::Decode(_))));
    }

    #[test]
    fn test_token_ids() {
        let market = gamma(json!({ "closed": false }));
        assert_eq!(market.token_id(Side::Yes).unwrap(), "111");
        assert_eq!(market.token_id(Side::No).unwrap(), "222");

        let no_tokens = gamma(json!({ "closed": false, "clobTokenIds": "[\"111\"]" }));
        assert!(matches!(no_tokens.token_id(Side::No), Err(TradingError::Decode(_))));
    }

    #[test]
    fn test_orderbook_side_is_sorted() {
        let book: ClobOrderbookResponse = serde_json::from_value(json!({
            "asset_id": "111",
            "bids": [{ "price": "0.40", "size": "10" }, { "price": "0.45", "size": "5" }],
            "asks": [{ "price": "0.60", "size": "3" }, { "price": "0.55", "size": "8" }]
        }))
        .unwrap();

        let side = book.to_book_side().unwrap();
        assert_eq!(side.best_bid(), Some(dec!(0.45)));
        assert_eq!(side.best_ask(), Some(dec!(0.55)));
    }

    #[test]
    fn test_missing_price_is_decode_error() {
        let empty: ClobPriceResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(empty.parse_price("111"), Err(TradingError::Decode(_))));

        let quoted: ClobPriceResponse = serde_json::from_value(json!({ "price": "0.52" })).unwrap();
        assert_eq!(quoted.parse_price("111").unwrap(), dec!(0.52));
    }

    #[test]
    fn test_position_conversion() {
        let raw: DataApiPosition = serde_json::from_value(json!({
            "asset": "111",
            "conditionId": "0xabc",
            "size": 100.0,
            "initialValue": 45.0,
            "currentValue": 52.5,
            "outcome": "Yes"
        }))
        .unwrap();

        let position = raw.into_position(Blockchain::Polygon).unwrap();
        assert_eq!(position.side, Side::Yes);
        assert_eq!(position.shares, dec!(100));
        assert_eq!(position.unrealized_pnl(), dec!(7.5));
    }

    #[test]
    fn test_non_binary_position_is_rejected() {
        let raw: DataApiPosition = serde_json::from_value(json!({
            "asset": "333",
            "conditionId": "0xdef",
            "size": "5",
            "initialValue": "1",
            "currentValue": "2",
            "outcome": "Lakers"
        }))
        .unwrap();

        assert!(matches!(raw.into_position(Blockchain::Polygon), Err(TradingError::Decode(_))));
    }
}
