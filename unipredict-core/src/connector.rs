//! Market platform capability contract

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{TradingError, TradingResult};
use crate::market::{Market, MarketStatus, OrderBook, Side};
use crate::platform::Blockchain;
use crate::position::{Order, Position};

/// Default page size for market listings
pub const DEFAULT_MARKET_LIMIT: usize = 100;

/// Filters for a market listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<MarketStatus>,
    /// Page size of the first page, not a cap on total results
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_MARKET_LIMIT
}

impl Default for MarketQuery {
    fn default() -> Self {
        Self {
            category: None,
            status: None,
            limit: DEFAULT_MARKET_LIMIT,
        }
    }
}

impl MarketQuery {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// Records decoded from one upstream response
///
/// `rejected` holds one `Decode` error per upstream record that could not be
/// mapped; those records are never represented in `items`.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub rejected: Vec<TradingError>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            rejected: Vec::new(),
        }
    }

    /// Partition per-record decode results, preserving upstream order
    pub fn from_results(results: impl IntoIterator<Item = TradingResult<T>>) -> Self {
        let mut listing = Self::default();
        for result in results {
            match result {
                Ok(item) => listing.items.push(item),
                Err(e) => listing.rejected.push(e),
            }
        }
        listing
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Capability every market platform adapter implements
#[async_trait]
pub trait MarketConnector: Send + Sync {
    /// Platform name this adapter is registered under
    fn platform(&self) -> &str;

    /// Chain this adapter is bound to
    fn blockchain(&self) -> Blockchain;

    /// First page of markets matching the query
    async fn get_markets(&self, query: &MarketQuery) -> TradingResult<Listing<Market>>;

    /// `Ok(None)` when the platform reports no such market
    async fn get_market(&self, market_id: &str) -> TradingResult<Option<Market>>;

    async fn get_positions(&self, user_address: &str) -> TradingResult<Listing<Position>>;

    /// Open a position, returning the transaction or order id
    async fn create_position(
        &self,
        market_id: &str,
        side: Side,
        amount: Decimal,
        max_price: Option<Decimal>,
    ) -> TradingResult<String>;

    /// Close `shares` of a position, or all of it when `shares` is `None`
    async fn close_position(&self, position_id: &str, shares: Option<Decimal>) -> TradingResult<String>;

    async fn get_price(&self, market_id: &str, side: Side) -> TradingResult<Decimal>;

    async fn get_orderbook(&self, market_id: &str) -> TradingResult<OrderBook>;

    /// Resting and historical orders for a user
    async fn get_orders(&self, _user_address: &str) -> TradingResult<Listing<Order>> {
        Err(TradingError::unsupported(format!(
            "{} does not expose orders",
            self.platform()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_partitions_results() {
        let listing: Listing<u32> = Listing::from_results(vec![
            Ok(1),
            Err(TradingError::decode("bad status")),
            Ok(3),
        ]);
        assert_eq!(listing.items, vec![1, 3]);
        assert_eq!(listing.rejected.len(), 1);
    }

    #[test]
    fn test_query_defaults() {
        let query: MarketQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query, MarketQuery::default());
        assert_eq!(query.limit, DEFAULT_MARKET_LIMIT);
    }
}
