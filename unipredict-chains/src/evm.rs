//! EVM chain adapter (Ethereum, Polygon, BNB Chain)
//!
//! Balances come from `eth_getBalance` and ERC-20 `eth_call`s. Call payloads
//! are signed locally and broadcast with `eth_sendRawTransaction`.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use unipredict_core::{Blockchain, ChainConfig, ChainConnector, TradingError, TradingResult, TransactionPayload};

use crate::confirm::{poll_until_settled, DEFAULT_POLL_INTERVAL};
use crate::rpc::{parse_quantity, RpcClient};
use crate::units::{from_base_units, to_base_units};
use crate::wallet::EvmWallet;

/// ERC20 function selectors
const BALANCE_OF_SELECTOR: &str = "70a08231"; // balanceOf(address)
const DECIMALS_SELECTOR: &str = "313ce567"; // decimals()

#[derive(Debug, Deserialize)]
struct ReceiptStatus {
    #[serde(default)]
    status: Option<String>,
}

/// Adapter for one EVM chain
pub struct EvmConnector {
    blockchain: Blockchain,
    rpc: RpcClient,
    private_key: Option<String>,
    wallet: RwLock<Option<EvmWallet>>,
    connected: AtomicBool,
    /// Next nonce for the signing account; held across assignment and broadcast
    next_nonce: Mutex<Option<u64>>,
    poll_interval: Duration,
}

impl EvmConnector {
    /// Create an adapter for `blockchain`; no network traffic until `connect`
    pub fn new(blockchain: Blockchain, config: &ChainConfig) -> TradingResult<Self> {
        if !blockchain.is_evm() {
            return Err(TradingError::config(format!("{} is not an EVM chain", blockchain)));
        }

        let rpc = RpcClient::new(&config.rpc_url_for(blockchain))?;

        Ok(Self {
            blockchain,
            rpc,
            private_key: config.private_key.clone(),
            wallet: RwLock::new(None),
            connected: AtomicBool::new(false),
            next_nonce: Mutex::new(None),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override the receipt polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn ensure_connected(&self) -> TradingResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TradingError::not_connected(format!("{} adapter is not connected", self.blockchain)))
        }
    }

    async fn native_balance(&self, owner: Address) -> TradingResult<Decimal> {
        let raw: String = self.rpc.call("eth_getBalance", json!([owner.to_string(), "latest"])).await?;
        from_base_units(parse_quantity(&raw)?, self.blockchain.native_decimals())
    }

    async fn token_balance(&self, owner: Address, token: Address) -> TradingResult<Decimal> {
        let decimals_raw = self.eth_call(token, &format!("0x{}", DECIMALS_SELECTOR)).await?;
        if decimals_raw.trim_start_matches("0x").is_empty() {
            return Err(TradingError::unsupported_asset(format!(
                "{} is not an ERC-20 contract on {}",
                token, self.blockchain
            )));
        }

        let decimals = u32::try_from(parse_quantity(&decimals_raw)?)
            .ok()
            .filter(|d| *d <= 28)
            .ok_or_else(|| TradingError::unsupported_asset(format!("Unsupported decimals for token {}", token)))?;

        let data = format!("0x{}{}", BALANCE_OF_SELECTOR, encode_address_arg(&owner));
        let balance_raw = self.eth_call(token, &data).await?;

        from_base_units(parse_quantity(&balance_raw)?, decimals)
    }

    async fn eth_call(&self, to: Address, data: &str) -> TradingResult<String> {
        debug!("eth_call to {}: {}", to, data);
        self.rpc
            .call("eth_call", json!([{ "to": to.to_string(), "data": data }, "latest"]))
            .await
    }

    async fn broadcast(&self, raw: &[u8]) -> TradingResult<String> {
        self.rpc
            .call("eth_sendRawTransaction", json!([format!("0x{}", hex::encode(raw))]))
            .await
            .map_err(|e| TradingError::submission(format!("Broadcast on {} failed: {}", self.blockchain, e)))
    }

    async fn sign_and_send(
        &self,
        wallet: &EvmWallet,
        to: Address,
        value: U256,
        data: Vec<u8>,
        gas_limit: Option<u64>,
    ) -> TradingResult<String> {
        let from = wallet.address();
        let mut next_nonce = self.next_nonce.lock().await;

        let nonce = match *next_nonce {
            Some(nonce) => nonce,
            None => {
                let raw: String = self
                    .rpc
                    .call("eth_getTransactionCount", json!([from.to_string(), "pending"]))
                    .await?;
                u64::try_from(parse_quantity(&raw)?)
                    .map_err(|_| TradingError::decode(format!("Nonce out of range: {}", raw)))?
            }
        };

        let gas_price_raw: String = self.rpc.call("eth_gasPrice", json!([])).await?;
        let gas_price = parse_quantity(&gas_price_raw)?;

        let gas_limit = match gas_limit {
            Some(limit) => limit,
            None => {
                let estimate = json!({
                    "from": from.to_string(),
                    "to": to.to_string(),
                    "value": format!("0x{:x}", value),
                    "data": format!("0x{}", hex::encode(&data)),
                });
                let raw: String = self.rpc.call("eth_estimateGas", json!([estimate])).await?;
                u64::try_from(parse_quantity(&raw)?)
                    .map_err(|_| TradingError::decode(format!("Gas estimate out of range: {}", raw)))?
            }
        };

        let chain_id = self
            .blockchain
            .chain_id()
            .ok_or_else(|| TradingError::config(format!("No chain id for {}", self.blockchain)))?;

        let tx = TransactionRequest::default()
            .with_to(to)
            .with_value(value)
            .with_input(data)
            .with_nonce(nonce)
            .with_chain_id(chain_id)
            .with_gas_price(gas_price)
            .with_gas_limit(gas_limit);

        let raw = wallet.sign_transaction(tx).await?;

        match self.broadcast(&raw).await {
            Ok(tx_hash) => {
                *next_nonce = Some(nonce + 1);
                info!("Sent {} transaction {} (nonce {})", self.blockchain, tx_hash, nonce);
                Ok(tx_hash)
            }
            Err(e) => {
                // Resync from the node on the next send
                *next_nonce = None;
                warn!("{}", e);
                Err(e)
            }
        }
    }

    async fn receipt_status(&self, tx_id: &str) -> TradingResult<Option<bool>> {
        let receipt: Option<ReceiptStatus> = self
            .rpc
            .call_optional("eth_getTransactionReceipt", json!([tx_id]))
            .await?;

        Ok(receipt.map(|r| r.status.as_deref() != Some("0x0")))
    }
}

#[async_trait]
impl ChainConnector for EvmConnector {
    fn blockchain(&self) -> Blockchain {
        self.blockchain
    }

    fn address(&self) -> Option<String> {
        self.wallet.read().as_ref().map(|w| w.address_string())
    }

    #[instrument(skip(self), fields(blockchain = %self.blockchain))]
    async fn connect(&self) -> TradingResult<()> {
        self.connected.store(false, Ordering::SeqCst);

        let reported: String = self
            .rpc
            .call("eth_chainId", json!([]))
            .await
            .map_err(|e| TradingError::connection(format!("{} unreachable at {}: {}", self.blockchain, self.rpc.url(), e)))?;
        let chain_id = parse_quantity(&reported)?;

        if let Some(expected) = self.blockchain.chain_id() {
            if chain_id != u128::from(expected) {
                return Err(TradingError::connection(format!(
                    "{} endpoint reports chain id {}, expected {}",
                    self.blockchain, chain_id, expected
                )));
            }
        }

        let wallet = self
            .private_key
            .as_deref()
            .map(EvmWallet::from_private_key)
            .transpose()?;

        *self.wallet.write() = wallet;
        *self.next_nonce.lock().await = None;
        self.connected.store(true, Ordering::SeqCst);

        info!(
            "Connected to {} (chain id {}, {})",
            self.blockchain,
            chain_id,
            self.address().unwrap_or_else(|| "read-only".to_string())
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[instrument(skip(self), fields(blockchain = %self.blockchain))]
    async fn get_balance(&self, address: &str, token: Option<&str>) -> TradingResult<Decimal> {
        self.ensure_connected()?;

        let owner = Address::from_str(address)
            .map_err(|e| TradingError::invalid_input(format!("Invalid address {}: {}", address, e)))?;

        match token {
            None => self.native_balance(owner).await,
            Some(token) => {
                let token = Address::from_str(token).map_err(|_| {
                    TradingError::unsupported_asset(format!("{} is not a contract address", token))
                })?;
                self.token_balance(owner, token).await
            }
        }
    }

    #[instrument(skip(self, payload), fields(blockchain = %self.blockchain))]
    async fn send_transaction(&self, payload: TransactionPayload) -> TradingResult<String> {
        self.ensure_connected()?;

        match payload {
            TransactionPayload::Signed(raw) => self.broadcast(&raw).await,
            TransactionPayload::Call {
                to,
                value,
                data,
                gas_limit,
            } => {
                let wallet = self.wallet.read().clone().ok_or_else(|| {
                    TradingError::credential(format!("{} adapter is read-only", self.blockchain))
                })?;

                let to = Address::from_str(&to)
                    .map_err(|e| TradingError::invalid_input(format!("Invalid recipient {}: {}", to, e)))?;
                let value = U256::from(to_base_units(value, self.blockchain.native_decimals())?);

                self.sign_and_send(&wallet, to, value, data, gas_limit).await
            }
        }
    }

    #[instrument(skip(self), fields(blockchain = %self.blockchain))]
    async fn wait_for_confirmation(&self, tx_id: &str, timeout: Duration) -> TradingResult<bool> {
        self.ensure_connected()?;
        Ok(poll_until_settled(timeout, self.poll_interval, || self.receipt_status(tx_id)).await)
    }
}

impl std::fmt::Debug for EvmConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmConnector")
            .field("blockchain", &self.blockchain)
            .field("rpc", &self.rpc)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Left-pad an address to a 32-byte ABI word
fn encode_address_arg(address: &Address) -> String {
    format!("{:0>64}", hex::encode(address.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const OWNER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn polygon() -> EvmConnector {
        EvmConnector::new(Blockchain::Polygon, &ChainConfig::new("http://127.0.0.1:1")).unwrap()
    }

    #[test]
    fn test_encode_address_arg() {
        let owner = Address::from_str(OWNER).unwrap();
        let word = encode_address_arg(&owner);
        assert_eq!(word.len(), 64);
        assert_eq!(word, format!("{}{}", "0".repeat(24), &OWNER[2..]));
    }

    #[test]
    fn test_rejects_non_evm_chain() {
        let err = EvmConnector::new(Blockchain::Solana, &ChainConfig::default()).unwrap_err();
        assert!(matches!(err, TradingError::Config(_)));
    }

    #[test]
    fn test_bad_rpc_url_is_connection_error() {
        let err = EvmConnector::new(Blockchain::Ethereum, &ChainConfig::new("::nope::")).unwrap_err();
        assert!(matches!(err, TradingError::Connection(_)));
    }

    #[test]
    fn test_read_only_has_no_address() {
        let chain = polygon();
        assert_eq!(chain.blockchain(), Blockchain::Polygon);
        assert!(chain.address().is_none());
        assert!(!chain.is_connected());
    }

    #[tokio::test]
    async fn test_calls_before_connect_fail() {
        let chain = polygon();

        let balance = chain.get_balance(OWNER, None).await;
        assert!(matches!(balance, Err(TradingError::NotConnected(_))));

        let sent = chain.send_transaction(TransactionPayload::transfer(OWNER, dec!(1))).await;
        assert!(matches!(sent, Err(TradingError::NotConnected(_))));

        let confirmed = chain.wait_for_confirmation("0xabc", Duration::ZERO).await;
        assert!(matches!(confirmed, Err(TradingError::NotConnected(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_connect() {
        let chain = polygon();
        let err = chain.connect().await.unwrap_err();
        assert!(matches!(err, TradingError::Connection(_)));
        assert!(!chain.is_connected());
    }
}
