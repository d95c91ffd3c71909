//! [`MarketConnector`] implementation for Polymarket

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};
use unipredict_core::{
    platforms, Blockchain, ChainConnector, Listing, Market, MarketConnector, MarketQuery, MarketStatus, OrderBook,
    Position, Side, TradingError, TradingResult,
};

use crate::client::PolymarketClient;
use crate::types::{DataApiPosition, GammaMarket};

/// Polymarket adapter bound to a connected Polygon chain
pub struct PolymarketConnector {
    client: PolymarketClient,
    chain: Arc<dyn ChainConnector>,
}

impl PolymarketConnector {
    pub fn new(chain: Arc<dyn ChainConnector>) -> TradingResult<Self> {
        Ok(Self::with_client(PolymarketClient::new()?, chain))
    }

    pub fn with_client(client: PolymarketClient, chain: Arc<dyn ChainConnector>) -> Self {
        Self { client, chain }
    }

    pub fn client(&self) -> &PolymarketClient {
        &self.client
    }
}

/// Gamma `closed` filter for a status query
fn closed_filter(status: Option<MarketStatus>) -> Option<bool> {
    match status {
        Some(MarketStatus::Open) => Some(false),
        Some(MarketStatus::Closed) | Some(MarketStatus::Resolved) => Some(true),
        Some(MarketStatus::Cancelled) | None => None,
    }
}

fn matches_query(market: &Market, query: &MarketQuery) -> bool {
    let status_ok = query.status.map_or(true, |status| market.status == status);
    let category_ok = query.category.as_deref().map_or(true, |wanted| {
        market
            .metadata
            .get("category")
            .and_then(|c| c.as_str())
            .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
    });
    status_ok && category_ok
}

fn decode_market(raw: serde_json::Value, blockchain: Blockchain) -> TradingResult<Market> {
    serde_json::from_value::<GammaMarket>(raw)
        .map_err(|e| TradingError::decode(format!("Malformed Polymarket market: {}", e)))?
        .into_market(blockchain)
}

fn decode_position(raw: serde_json::Value, blockchain: Blockchain) -> TradingResult<Position> {
    serde_json::from_value::<DataApiPosition>(raw)
        .map_err(|e| TradingError::decode(format!("Malformed Polymarket position: {}", e)))?
        .into_position(blockchain)
}

#[async_trait]
impl MarketConnector for PolymarketConnector {
    fn platform(&self) -> &str {
        platforms::POLYMARKET
    }

    fn blockchain(&self) -> Blockchain {
        self.chain.blockchain()
    }

    #[instrument(skip(self))]
    async fn get_markets(&self, query: &MarketQuery) -> TradingResult<Listing<Market>> {
        let blockchain = self.blockchain();
        let raw = self.client.list_markets(query.limit, closed_filter(query.status)).await?;

        let mut listing = Listing::from_results(raw.into_iter().map(|m| decode_market(m, blockchain)));
        listing.items.retain(|m| matches_query(m, query));

        debug!(
            "Polymarket returned {} markets ({} rejected)",
            listing.items.len(),
            listing.rejected.len()
        );
        Ok(listing)
    }

    #[instrument(skip(self))]
    async fn get_market(&self, market_id: &str) -> TradingResult<Option<Market>> {
        let blockchain = self.blockchain();
        self.client
            .get_market(market_id)
            .await?
            .map(|m| m.into_market(blockchain))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn get_positions(&self, user_address: &str) -> TradingResult<Listing<Position>> {
        let blockchain = self.blockchain();
        let raw = self.client.get_positions(user_address).await?;
        Ok(Listing::from_results(raw.into_iter().map(|p| decode_position(p, blockchain))))
    }

    async fn create_position(
        &self,
        _market_id: &str,
        _side: Side,
        _amount: Decimal,
        _max_price: Option<Decimal>,
    ) -> TradingResult<String> {
        Err(TradingError::unsupported("polymarket order placement requires CLOB order signing"))
    }

    async fn close_position(&self, _position_id: &str, _shares: Option<Decimal>) -> TradingResult<String> {
        Err(TradingError::unsupported("polymarket order placement requires CLOB order signing"))
    }

    #[instrument(skip(self))]
    async fn get_price(&self, market_id: &str, side: Side) -> TradingResult<Decimal> {
        let token_id = self.client.token_for(market_id, side).await?;
        self.client.get_price(&token_id).await?.parse_price(&token_id)
    }

    #[instrument(skip(self))]
    async fn get_orderbook(&self, market_id: &str) -> TradingResult<OrderBook> {
        let market = self.client.require_market(market_id).await?;
        let (yes_token, no_token) = market.parse_clob_token_ids()?;

        let (yes_book, no_book) = futures::try_join!(
            self.client.get_orderbook(&yes_token),
            self.client.get_orderbook(&no_token)
        )?;

        let mut book = OrderBook::new(market_id, platforms::POLYMARKET, self.blockchain());
        book.timestamp = Utc::now();
        book.yes = yes_book.to_book_side()?;
        book.no = no_book.to_book_side()?;
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::time::Duration;
    use unipredict_core::TransactionPayload;

    struct StubChain;

    #[async_trait]
    impl ChainConnector for StubChain {
        fn blockchain(&self) -> Blockchain {
            Blockchain::Polygon
        }
        fn address(&self) -> Option<String> {
            None
        }
        async fn connect(&self) -> TradingResult<()> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
        async fn get_balance(&self, _address: &str, _token: Option<&str>) -> TradingResult<Decimal> {
            Ok(Decimal::ZERO)
        }
        async fn send_transaction(&self, _payload: TransactionPayload) -> TradingResult<String> {
            Err(TradingError::credential("stub"))
        }
        async fn wait_for_confirmation(&self, _tx_id: &str, _timeout: Duration) -> TradingResult<bool> {
            Ok(false)
        }
    }

    fn connector() -> PolymarketConnector {
        // Unroutable endpoints; these tests never reach the network
        let client = PolymarketClient::with_urls("http://127.0.0.1:1", "http://127.0.0.1:1", "http://127.0.0.1:1").unwrap();
        PolymarketConnector::with_client(client, Arc::new(StubChain))
    }

    #[test]
    fn test_provenance() {
        let polymarket = connector();
        assert_eq!(polymarket.platform(), "polymarket");
        assert_eq!(polymarket.blockchain(), Blockchain::Polygon);
    }

    #[tokio::test]
    async fn test_order_placement_is_unsupported() {
        let polymarket = connector();
        let created = polymarket.create_position("m1", Side::Yes, dec!(10), None).await;
        assert!(matches!(created, Err(TradingError::UnsupportedOperation(_))));

        let closed = polymarket.close_position("p1", None).await;
        assert!(matches!(closed, Err(TradingError::UnsupportedOperation(_))));

        let orders = polymarket.get_orders("0xabc").await;
        assert!(matches!(orders, Err(TradingError::UnsupportedOperation(_))));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_connection_error() {
        let polymarket = connector();
        let markets = polymarket.get_markets(&MarketQuery::default()).await;
        assert!(matches!(markets, Err(TradingError::Connection(_))));
    }

    #[test]
    fn test_bad_records_are_rejected_not_defaulted() {
        let raw = vec![
            json!({ "id": "1", "question": "Q1", "closed": false }),
            json!({ "id": "2", "question": "Q2" }),
            json!({ "question": "no id" }),
        ];
        let listing = Listing::from_results(raw.into_iter().map(|m| decode_market(m, Blockchain::Polygon)));

        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].id, "1");
        assert_eq!(listing.rejected.len(), 2);
        assert!(listing.rejected.iter().all(|e| matches!(e, TradingError::Decode(_))));
    }

    #[test]
    fn test_query_filters() {
        let market = decode_market(
            json!({ "id": "1", "question": "Q", "closed": true, "category": "Sports" }),
            Blockchain::Polygon,
        )
        .unwrap();

        let mut query = MarketQuery::default();
        assert!(matches_query(&market, &query));

        query.category = Some("sports".to_string());
        assert!(matches_query(&market, &query));

        query.status = Some(MarketStatus::Open);
        assert!(!matches_query(&market, &query));

        assert_eq!(closed_filter(Some(MarketStatus::Open)), Some(false));
        assert_eq!(closed_filter(None), None);
    }
}
