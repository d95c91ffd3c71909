//! Trading router
//!
//! Single entry point over the registry. Listing calls without a platform
//! fan out to every registered adapter; everything else is routed to exactly
//! one adapter by name.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, instrument, warn};
use unipredict_core::{
    Blockchain, ChainConnector, Listing, Market, MarketConnector, MarketQuery, Order, OrderBook, Position,
    RouterConfig, Side, TradingError, TradingResult,
};

use crate::aggregate::FanOut;
use crate::registry::Registry;

/// Routes calls to registered adapters with bounded concurrency
pub struct TradingRouter {
    registry: Arc<Registry>,
    limiter: Arc<Semaphore>,
    default_timeout: Duration,
}

impl TradingRouter {
    pub fn new(registry: Arc<Registry>, config: RouterConfig) -> Self {
        Self {
            registry,
            limiter: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            default_timeout: config.default_timeout,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn list_platforms(&self) -> BTreeSet<String> {
        self.registry.platforms()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn platform(&self, name: &str) -> TradingResult<Arc<dyn MarketConnector>> {
        self.registry
            .get(name)
            .ok_or_else(|| TradingError::platform_not_found(name))
    }

    fn chain(&self, blockchain: Blockchain) -> TradingResult<Arc<dyn ChainConnector>> {
        self.registry
            .chain(blockchain)
            .ok_or_else(|| TradingError::not_connected(format!("{} is not connected", blockchain)))
    }

    async fn permit(&self) -> TradingResult<OwnedSemaphorePermit> {
        self.limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TradingError::connection("router is shutting down"))
    }

    /// Run one adapter call under a permit, bounded by `deadline`
    ///
    /// The deadline covers the wait for a permit as well as the call itself.
    async fn guarded<T, F>(&self, platform: &str, op: &str, deadline: Duration, call: F) -> TradingResult<T>
    where
        F: Future<Output = TradingResult<T>>,
    {
        let bounded = async {
            let _permit = self.permit().await?;
            call.await
        };

        tokio::time::timeout(deadline, bounded).await.unwrap_or_else(|_| {
            Err(TradingError::timeout(format!(
                "{} {} exceeded {:?}",
                platform, op, deadline
            )))
        })
    }

    /// Issue `call` against the selected adapters concurrently and merge
    ///
    /// Adapter failures and timeouts are recorded, never raised. The only
    /// error is `PlatformNotFound` for an unregistered explicit platform.
    async fn fan_out<T, F>(
        &self,
        platform: Option<&str>,
        timeout: Option<Duration>,
        op: &'static str,
        call: F,
    ) -> TradingResult<FanOut<T>>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn MarketConnector>) -> BoxFuture<'static, TradingResult<Listing<T>>>,
    {
        let targets = match platform {
            Some(name) => vec![self.platform(name)?],
            None => self.registry.connectors(),
        };
        let deadline = timeout.unwrap_or(self.default_timeout);

        let mut pending: FuturesUnordered<_> = targets
            .into_iter()
            .map(|connector| {
                let name = connector.platform().to_string();
                let fut = call(connector);
                async move {
                    let result = self.guarded(&name, op, deadline, fut).await;
                    (name, result)
                }
            })
            .collect();

        let mut merged = FanOut::default();
        while let Some((name, result)) = pending.next().await {
            match result {
                Ok(listing) => {
                    debug!("{} {}: {} items, {} rejected", name, op, listing.items.len(), listing.rejected.len());
                    merged.merge(&name, listing);
                }
                Err(e) => {
                    warn!("{} {} failed: {}", name, op, e);
                    merged.record_failure(&name, e);
                }
            }
        }

        Ok(merged)
    }

    // ========================================================================
    // Fan-out reads
    // ========================================================================

    /// Markets from one platform, or from every registered platform
    #[instrument(skip(self))]
    pub async fn get_markets(
        &self,
        platform: Option<&str>,
        query: &MarketQuery,
        timeout: Option<Duration>,
    ) -> TradingResult<FanOut<Market>> {
        let query = Arc::new(query.clone());
        let merged = self
            .fan_out(platform, timeout, "get_markets", move |connector| {
                let query = query.clone();
                Box::pin(async move { connector.get_markets(&query).await })
            })
            .await?;

        info!("Fetched {} markets ({} failures)", merged.items.len(), merged.failures.len());
        Ok(merged)
    }

    #[instrument(skip(self))]
    pub async fn get_positions(
        &self,
        user_address: &str,
        platform: Option<&str>,
        timeout: Option<Duration>,
    ) -> TradingResult<FanOut<Position>> {
        let address: Arc<str> = Arc::from(user_address);
        self.fan_out(platform, timeout, "get_positions", move |connector| {
            let address = address.clone();
            Box::pin(async move { connector.get_positions(&address).await })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_orders(
        &self,
        user_address: &str,
        platform: Option<&str>,
        timeout: Option<Duration>,
    ) -> TradingResult<FanOut<Order>> {
        let address: Arc<str> = Arc::from(user_address);
        self.fan_out(platform, timeout, "get_orders", move |connector| {
            let address = address.clone();
            Box::pin(async move { connector.get_orders(&address).await })
        })
        .await
    }

    // ========================================================================
    // Single-platform calls
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn get_market(&self, market_id: &str, platform: &str) -> TradingResult<Option<Market>> {
        let connector = self.platform(platform)?;
        self.guarded(platform, "get_market", self.default_timeout, connector.get_market(market_id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_price(&self, platform: &str, market_id: &str, side: Side) -> TradingResult<Decimal> {
        let connector = self.platform(platform)?;
        self.guarded(platform, "get_price", self.default_timeout, connector.get_price(market_id, side))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_orderbook(&self, platform: &str, market_id: &str) -> TradingResult<OrderBook> {
        let connector = self.platform(platform)?;
        self.guarded(platform, "get_orderbook", self.default_timeout, connector.get_orderbook(market_id))
            .await
    }

    /// Open a position
    ///
    /// Mutations are neither time-bounded nor counted against the in-flight
    /// limit, so a stalled trade never holds up reads.
    #[instrument(skip(self))]
    pub async fn create_position(
        &self,
        platform: &str,
        market_id: &str,
        side: Side,
        amount: Decimal,
        max_price: Option<Decimal>,
    ) -> TradingResult<String> {
        let connector = self.platform(platform)?;
        let tx = connector.create_position(market_id, side, amount, max_price).await?;

        info!("Created position on {} market {}: {}", platform, market_id, tx);
        Ok(tx)
    }

    /// Close a position, fully when `shares` is `None`
    #[instrument(skip(self))]
    pub async fn close_position(
        &self,
        platform: &str,
        position_id: &str,
        shares: Option<Decimal>,
    ) -> TradingResult<String> {
        let connector = self.platform(platform)?;
        let tx = connector.close_position(position_id, shares).await?;

        info!("Closed position {} on {}: {}", position_id, platform, tx);
        Ok(tx)
    }

    // ========================================================================
    // Chain calls
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn get_balance(
        &self,
        blockchain: Blockchain,
        address: &str,
        token: Option<&str>,
    ) -> TradingResult<Decimal> {
        let chain = self.chain(blockchain)?;
        self.guarded(
            blockchain.as_str(),
            "get_balance",
            self.default_timeout,
            chain.get_balance(address, token),
        )
        .await
    }

    /// Wait for a transaction; the caller's timeout is the only bound
    #[instrument(skip(self))]
    pub async fn wait_for_confirmation(
        &self,
        blockchain: Blockchain,
        tx_id: &str,
        timeout: Duration,
    ) -> TradingResult<bool> {
        let chain = self.chain(blockchain)?;
        chain.wait_for_confirmation(tx_id, timeout).await
    }
}

impl std::fmt::Debug for TradingRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingRouter")
            .field("registry", &self.registry)
            .field("available_permits", &self.limiter.available_permits())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
