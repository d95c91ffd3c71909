//! Market data structures for prediction markets

use crate::error::TradingError;
use crate::platform::Blockchain;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a prediction market
///
/// There is deliberately no `Default`: adapters must map every upstream
/// value explicitly or reject the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    /// Market is open for trading
    Open,
    /// Market is closed but not yet settled
    Closed,
    /// Market has been settled with a final outcome
    Resolved,
    /// Market was voided
    Cancelled,
}

impl MarketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Open => "open",
            MarketStatus::Closed => "closed",
            MarketStatus::Resolved => "resolved",
            MarketStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketStatus {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "active" => Ok(MarketStatus::Open),
            "closed" => Ok(MarketStatus::Closed),
            "resolved" | "settled" => Ok(MarketStatus::Resolved),
            "cancelled" | "canceled" | "voided" => Ok(MarketStatus::Cancelled),
            other => Err(TradingError::decode(format!("unknown market status '{}'", other))),
        }
    }
}

/// Side of a binary prediction market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(Side::Yes),
            "no" | "n" => Ok(Side::No),
            other => Err(TradingError::decode(format!("unknown position side '{}'", other))),
        }
    }
}

/// A prediction market snapshot from one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Identifier on the platform (not globally unique)
    pub id: String,

    /// Market question
    pub question: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Outcome labels in platform order
    pub outcomes: Vec<String>,

    pub status: MarketStatus,

    /// When the market closes for trading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<Decimal>,

    /// Platform that served this record
    pub platform: String,

    /// Chain the platform settles on
    pub blockchain: Blockchain,

    /// Raw upstream fields not mapped above
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Market {
    /// Check if this market is currently tradeable
    pub fn is_tradeable(&self) -> bool {
        self.status == MarketStatus::Open
    }
}

/// A single price level in an order book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    /// Price (0.00 - 1.00)
    pub price: Decimal,
    /// Size at this level
    pub size: Decimal,
}

impl OrderBookLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Bids and asks for one outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSide {
    /// Sorted by price descending (best bid first)
    pub bids: Vec<OrderBookLevel>,
    /// Sorted by price ascending (best ask first)
    pub asks: Vec<OrderBookLevel>,
}

impl BookSide {
    /// Build a side from unsorted levels
    pub fn from_levels(mut bids: Vec<OrderBookLevel>, mut asks: Vec<OrderBookLevel>) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self { bids, asks }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// Best ask minus best bid
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// Order book snapshot for a prediction market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub market_id: String,
    pub platform: String,
    pub blockchain: Blockchain,
    /// Timestamp of the snapshot
    pub timestamp: DateTime<Utc>,
    pub yes: BookSide,
    pub no: BookSide,
}

impl OrderBook {
    /// Create an empty order book
    pub fn new(market_id: impl Into<String>, platform: impl Into<String>, blockchain: Blockchain) -> Self {
        Self {
            market_id: market_id.into(),
            platform: platform.into(),
            blockchain,
            timestamp: Utc::now(),
            yes: BookSide::default(),
            no: BookSide::default(),
        }
    }

    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Yes => &self.yes,
            Side::No => &self.no,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_parses_resolved() {
        assert_eq!("resolved".parse::<MarketStatus>().unwrap(), MarketStatus::Resolved);
        assert_eq!("RESOLVED".parse::<MarketStatus>().unwrap(), MarketStatus::Resolved);
        assert_eq!("canceled".parse::<MarketStatus>().unwrap(), MarketStatus::Cancelled);
    }

    #[test]
    fn test_unknown_status_is_decode_error() {
        let err = "paused".parse::<MarketStatus>().unwrap_err();
        assert!(matches!(err, TradingError::Decode(_)));
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("YES".parse::<Side>().unwrap(), Side::Yes);
        assert_eq!("no".parse::<Side>().unwrap(), Side::No);
        assert!(matches!("maybe".parse::<Side>(), Err(TradingError::Decode(_))));
        assert_eq!(Side::Yes.opposite(), Side::No);
    }

    #[test]
    fn test_book_side_sorting_and_spread() {
        let side = BookSide::from_levels(
            vec![
                OrderBookLevel::new(dec!(0.40), dec!(10)),
                OrderBookLevel::new(dec!(0.45), dec!(5)),
            ],
            vec![
                OrderBookLevel::new(dec!(0.55), dec!(3)),
                OrderBookLevel::new(dec!(0.50), dec!(7)),
            ],
        );
        assert_eq!(side.best_bid(), Some(dec!(0.45)));
        assert_eq!(side.best_ask(), Some(dec!(0.50)));
        assert_eq!(side.spread(), Some(dec!(0.05)));
    }

    #[test]
    fn test_empty_book_has_no_spread() {
        let book = OrderBook::new("m1", "hedgehog", Blockchain::Ethereum);
        assert!(book.side(Side::No).spread().is_none());
    }
}
