//! Blockchain capability contract

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

use crate::error::TradingResult;
use crate::platform::Blockchain;

/// Transaction to broadcast through a [`ChainConnector`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionPayload {
    /// Contract call or transfer, signed by the adapter's own key
    Call {
        /// Destination address
        to: String,
        /// Native amount in whole units (e.g. 0.5 ETH)
        value: Decimal,
        /// Calldata
        data: Vec<u8>,
        /// Gas limit; estimated by the node when absent
        gas_limit: Option<u64>,
    },
    /// Fully signed, chain-encoded transaction broadcast as-is
    Signed(Vec<u8>),
}

impl TransactionPayload {
    /// Plain native transfer
    pub fn transfer(to: impl Into<String>, value: Decimal) -> Self {
        TransactionPayload::Call {
            to: to.into(),
            value,
            data: Vec::new(),
            gas_limit: None,
        }
    }
}

/// Capability every blockchain adapter implements
///
/// Methods take `&self` so a connected adapter can be shared behind an
/// `Arc` by every market adapter bound to the chain.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    fn blockchain(&self) -> Blockchain;

    /// Signing identity, `None` for read-only adapters
    fn address(&self) -> Option<String>;

    /// Check reachability and resolve the signing identity
    async fn connect(&self) -> TradingResult<()>;

    /// Whether `connect` has succeeded
    fn is_connected(&self) -> bool;

    /// Native balance, or a token balance when `token` names a contract/mint
    async fn get_balance(&self, address: &str, token: Option<&str>) -> TradingResult<Decimal>;

    /// Broadcast a transaction and return its id
    async fn send_transaction(&self, payload: TransactionPayload) -> TradingResult<String>;

    /// Wait for the transaction to settle
    ///
    /// Returns `Ok(false)` when the timeout elapses or the transaction
    /// settled as failed. Dropping the future stops the watch.
    async fn wait_for_confirmation(&self, tx_id: &str, timeout: Duration) -> TradingResult<bool>;
}
