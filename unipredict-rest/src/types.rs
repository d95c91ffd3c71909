//! Wire types for Hedgehog-style REST APIs
//!
//! Every list endpoint wraps its records in an envelope (`markets`,
//! `positions`, `data`). Records are decoded one at a time so a malformed
//! entry is rejected without discarding its neighbours.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use unipredict_core::{
    decimal_from_value, optional_decimal, required_decimal, Blockchain, BookSide, Market, MarketStatus, OrderBook, OrderBookLevel, Position, Side, TradingError,
    TradingResult,
};

/// `GET markets`
#[derive(Debug, Deserialize)]
pub struct MarketsEnvelope {
    #[serde(default)]
    pub markets: Vec<serde_json::Value>,
}

/// `GET markets/{id}`
#[derive(Debug, Deserialize)]
pub struct MarketEnvelope {
    #[serde(default)]
    pub market: Option<serde_json::Value>,
}

/// `GET users/{address}/positions`
#[derive(Debug, Deserialize)]
pub struct PositionsEnvelope {
    #[serde(default)]
    pub positions: Vec<serde_json::Value>,
}

/// `GET markets/{id}/price` and `GET markets/{id}/orderbook`
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: Option<T>,
}

/// Parse ISO-8601 timestamps with or without an offset (naive ones are UTC)
fn parse_timestamp(raw: &str) -> TradingResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| TradingError::decode(format!("Invalid timestamp {}: {}", raw, e)))
}

// ============================================================================
// Markets
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestMarket {
    id: String,
    question: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    outcomes: Option<Vec<String>>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    closed: Option<bool>,
    #[serde(default)]
    resolved: Option<bool>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    volume: Option<serde_json::Value>,
    #[serde(default)]
    liquidity: Option<serde_json::Value>,
}

impl RestMarket {
    fn status(&self) -> TradingResult<MarketStatus> {
        if let Some(status) = self.status.as_deref() {
            return MarketStatus::from_str(status)
                .map_err(|_| TradingError::decode(format!("Market {}: unknown status '{}'", self.id, status)));
        }

        match (self.resolved, self.closed) {
            (Some(true), _) => Ok(MarketStatus::Resolved),
            (_, Some(true)) => Ok(MarketStatus::Closed),
            (Some(false), _) | (_, Some(false)) => Ok(MarketStatus::Open),
            (None, None) => Err(TradingError::decode(format!("Market {}: no status fields present", self.id))),
        }
    }
}

/// Decode one market record, tagging it with provenance
///
/// The raw record is kept as metadata.
pub fn decode_market(raw: serde_json::Value, platform: &str, blockchain: Blockchain) -> TradingResult<Market> {
    let metadata = match &raw {
        serde_json::Value::Object(map) => map.clone(),
        other => return Err(TradingError::decode(format!("Market record is not an object: {}", other))),
    };

    let market: RestMarket = serde_json::from_value(raw)
        .map_err(|e| TradingError::decode(format!("Malformed {} market: {}", platform, e)))?;

    let status = market.status()?;
    let end_date = market.end_date.as_deref().map(parse_timestamp).transpose()?;
    let volume = optional_decimal(market.volume.as_ref(), "volume")?;
    let liquidity = optional_decimal(market.liquidity.as_ref(), "liquidity")?;

    Ok(Market {
        id: market.id,
        question: market.question,
        description: market.description,
        outcomes: market.outcomes.unwrap_or_else(|| vec!["YES".to_string(), "NO".to_string()]),
        status,
        end_date,
        volume,
        liquidity,
        platform: platform.to_string(),
        blockchain,
        metadata,
    })
}

// ============================================================================
// Positions
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestPosition {
    id: String,
    market_id: String,
    side: String,
    #[serde(default)]
    shares: Option<serde_json::Value>,
    #[serde(default)]
    cost_basis: Option<serde_json::Value>,
    #[serde(default)]
    current_value: Option<serde_json::Value>,
}

pub fn decode_position(raw: serde_json::Value, platform: &str, blockchain: Blockchain) -> TradingResult<Position> {
    let position: RestPosition = serde_json::from_value(raw)
        .map_err(|e| TradingError::decode(format!("Malformed {} position: {}", platform, e)))?;

    let side = Side::from_str(&position.side)
        .map_err(|_| TradingError::decode(format!("Position {}: unknown side '{}'", position.id, position.side)))?;

    Ok(Position {
        shares: required_decimal(position.shares.as_ref(), "shares")?,
        cost_basis: required_decimal(position.cost_basis.as_ref(), "costBasis")?,
        current_value: required_decimal(position.current_value.as_ref(), "currentValue")?,
        id: position.id,
        market_id: position.market_id,
        side,
        platform: platform.to_string(),
        blockchain,
    })
}

// ============================================================================
// Prices and books
// ============================================================================

/// Pick one side's quote out of a `{"YES": .., "NO": ..}` map
pub fn price_for_side(prices: &serde_json::Map<String, serde_json::Value>, side: Side) -> TradingResult<Decimal> {
    let quote = prices
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(side.as_str()))
        .map(|(_, value)| value);

    match quote {
        Some(value) => decimal_from_value(value)
            .ok_or_else(|| TradingError::decode(format!("Invalid {} price: {}", side, value))),
        None => Err(TradingError::decode(format!("No {} price quoted", side))),
    }
}

#[derive(Debug, Deserialize)]
pub struct RestLevel {
    pub price: serde_json::Value,
    pub size: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct RestBookSide {
    #[serde(default)]
    pub bids: Vec<RestLevel>,
    #[serde(default)]
    pub asks: Vec<RestLevel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct RestOrderBook {
    #[serde(default, alias = "YES")]
    pub yes: RestBookSide,
    #[serde(default, alias = "NO")]
    pub no: RestBookSide,
}

impl RestLevel {
    fn to_level(&self) -> TradingResult<OrderBookLevel> {
        let price = decimal_from_value(&self.price)
            .ok_or_else(|| TradingError::decode(format!("Invalid book price: {}", self.price)))?;
        let size = decimal_from_value(&self.size)
            .ok_or_else(|| TradingError::decode(format!("Invalid book size: {}", self.size)))?;
        Ok(OrderBookLevel::new(price, size))
    }
}

impl RestBookSide {
    fn to_book_side(&self) -> TradingResult<BookSide> {
        let bids = self.bids.iter().map(RestLevel::to_level).collect::<TradingResult<Vec<_>>>()?;
        let asks = self.asks.iter().map(RestLevel::to_level).collect::<TradingResult<Vec<_>>>()?;
        Ok(BookSide::from_levels(bids, asks))
    }
}

impl RestOrderBook {
    pub fn to_order_book(&self, market_id: &str, platform: &str, blockchain: Blockchain) -> TradingResult<OrderBook> {
        let mut book = OrderBook::new(market_id, platform, blockchain);
        book.timestamp = Utc::now();
        book.yes = self.yes.to_book_side()?;
        book.no = self.no.to_book_side()?;
        Ok(book)
    }
}
