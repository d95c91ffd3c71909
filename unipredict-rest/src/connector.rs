//! [`MarketConnector`] for platforms exposing the Hedgehog REST layout

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use unipredict_core::{
    Blockchain, ChainConnector, Listing, Market, MarketConnector, MarketQuery, OrderBook, Position, Side,
    TradingError, TradingResult,
};

use crate::client::RestClient;
use crate::types::{
    decode_market, decode_position, price_for_side, DataEnvelope, MarketEnvelope, MarketsEnvelope,
    PositionsEnvelope, RestOrderBook,
};

/// REST market adapter bound to one platform name and one connected chain
pub struct RestMarketConnector {
    platform: String,
    client: RestClient,
    chain: Arc<dyn ChainConnector>,
}

impl RestMarketConnector {
    pub fn new(platform: impl Into<String>, api_url: &str, chain: Arc<dyn ChainConnector>) -> TradingResult<Self> {
        Ok(Self {
            platform: platform.into(),
            client: RestClient::new(api_url)?,
            chain,
        })
    }

    pub fn api_url(&self) -> &str {
        self.client.base_url()
    }

    fn contract_required(&self, operation: &str) -> TradingError {
        warn!("{} {} requires contract integration", self.platform, operation);
        TradingError::unsupported(format!("{} {} requires contract integration", self.platform, operation))
    }
}

#[async_trait]
impl MarketConnector for RestMarketConnector {
    fn platform(&self) -> &str {
        &self.platform
    }

    fn blockchain(&self) -> Blockchain {
        self.chain.blockchain()
    }

    #[instrument(skip(self), fields(platform = %self.platform))]
    async fn get_markets(&self, query: &MarketQuery) -> TradingResult<Listing<Market>> {
        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }

        let envelope: MarketsEnvelope = self.client.get(&["markets"], &params).await?;
        let blockchain = self.blockchain();

        let mut listing = Listing::from_results(
            envelope
                .markets
                .into_iter()
                .map(|raw| decode_market(raw, &self.platform, blockchain)),
        );
        if let Some(status) = query.status {
            listing.items.retain(|m| m.status == status);
        }
        listing.items.truncate(query.limit);

        debug!(
            "{} returned {} markets ({} rejected)",
            self.platform,
            listing.items.len(),
            listing.rejected.len()
        );
        Ok(listing)
    }

    #[instrument(skip(self), fields(platform = %self.platform))]
    async fn get_market(&self, market_id: &str) -> TradingResult<Option<Market>> {
        let envelope: MarketEnvelope = match self.client.get(&["markets", market_id], &[]).await {
            Ok(envelope) => envelope,
            Err(TradingError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        envelope
            .market
            .map(|raw| decode_market(raw, &self.platform, self.blockchain()))
            .transpose()
    }

    #[instrument(skip(self), fields(platform = %self.platform))]
    async fn get_positions(&self, user_address: &str) -> TradingResult<Listing<Position>> {
        let envelope: PositionsEnvelope = self
            .client
            .get(&["users", user_address, "positions"], &[])
            .await?;
        let blockchain = self.blockchain();

        Ok(Listing::from_results(
            envelope
                .positions
                .into_iter()
                .map(|raw| decode_position(raw, &self.platform, blockchain)),
        ))
    }

    async fn create_position(
        &self,
        _market_id: &str,
        _side: Side,
        _amount: Decimal,
        _max_price: Option<Decimal>,
    ) -> TradingResult<String> {
        Err(self.contract_required("create_position"))
    }

    async fn close_position(&self, _position_id: &str, _shares: Option<Decimal>) -> TradingResult<String> {
        Err(self.contract_required("close_position"))
    }

    #[instrument(skip(self), fields(platform = %self.platform))]
    async fn get_price(&self, market_id: &str, side: Side) -> TradingResult<Decimal> {
        let envelope: DataEnvelope<serde_json::Map<String, serde_json::Value>> =
            self.client.get(&["markets", market_id, "price"], &[]).await?;

        let prices = envelope
            .data
            .ok_or_else(|| TradingError::decode(format!("No price data for market {}", market_id)))?;
        price_for_side(&prices, side)
    }

    #[instrument(skip(self), fields(platform = %self.platform))]
    async fn get_orderbook(&self, market_id: &str) -> TradingResult<OrderBook> {
        let envelope: DataEnvelope<RestOrderBook> =
            self.client.get(&["markets", market_id, "orderbook"], &[]).await?;

        envelope
            .data
            .ok_or_else(|| TradingError::decode(format!("No orderbook data for market {}", market_id)))?
            .to_order_book(market_id, &self.platform, self.blockchain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use unipredict_core::TransactionPayload;

    struct StubChain(Blockchain);

    #[async_trait]
    impl ChainConnector for StubChain {
        fn blockchain(&self) -> Blockchain {
            self.0
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

    fn myriad_on(blockchain: Blockchain) -> RestMarketConnector {
        RestMarketConnector::new("myriad", "http://127.0.0.1:1", Arc::new(StubChain(blockchain))).unwrap()
    }

    #[test]
    fn test_provenance_follows_bound_chain() {
        let myriad = myriad_on(Blockchain::Polygon);
        assert_eq!(myriad.platform(), "myriad");
        assert_eq!(myriad.blockchain(), Blockchain::Polygon);
        assert_eq!(myriad.api_url(), "http://127.0.0.1:1/");
    }

    #[tokio::test]
    async fn test_mutations_are_unsupported() {
        let myriad = myriad_on(Blockchain::Ethereum);
        assert!(matches!(
            myriad.create_position("m1", Side::Yes, dec!(5), Some(dec!(0.6))).await,
            Err(TradingError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            myriad.close_position("p1", Some(dec!(1))).await,
            Err(TradingError::UnsupportedOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_api_surfaces_error() {
        let myriad = myriad_on(Blockchain::Ethereum);
        let result = myriad.get_markets(&MarketQuery::default()).await;
        assert!(matches!(result, Err(TradingError::Connection(_))));
    }
}
