//! Solana chain adapter
//!
//! Reads go through the Solana JSON-RPC API. Call payloads cannot be encoded
//! here; only pre-signed transactions are broadcast.

use async_trait::async_trait;
use base64::Engine;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument};
use unipredict_core::{Blockchain, ChainConfig, ChainConnector, TradingError, TradingResult, TransactionPayload};

use crate::confirm::{poll_until_settled, DEFAULT_POLL_INTERVAL};
use crate::rpc::RpcClient;
use crate::units::from_base_units;

const PUBKEY_LEN: usize = 32;
const KEYPAIR_LEN: usize = 64;

/// Signing identity loaded from a 64-byte secret (base58 or JSON byte array)
///
/// Only the public half is retained.
#[derive(Clone, PartialEq, Eq)]
pub struct SolanaKeypair {
    pubkey: [u8; PUBKEY_LEN],
}

impl SolanaKeypair {
    pub fn from_secret(secret: &str) -> TradingResult<Self> {
        let secret = secret.trim();

        let bytes: Vec<u8> = if secret.starts_with('[') {
            serde_json::from_str(secret)
                .map_err(|e| TradingError::credential(format!("Invalid keypair byte array: {}", e)))?
        } else {
            bs58::decode(secret)
                .into_vec()
                .map_err(|e| TradingError::credential(format!("Invalid base58 keypair: {}", e)))?
        };

        if bytes.len() != KEYPAIR_LEN {
            return Err(TradingError::credential(format!(
                "Keypair must be {} bytes, got {}",
                KEYPAIR_LEN,
                bytes.len()
            )));
        }

        let mut pubkey = [0u8; PUBKEY_LEN];
        pubkey.copy_from_slice(&bytes[PUBKEY_LEN..]);

        Ok(Self { pubkey })
    }

    pub fn pubkey(&self) -> [u8; PUBKEY_LEN] {
        self.pubkey
    }

    /// Base58 address
    pub fn address(&self) -> String {
        bs58::encode(self.pubkey).into_string()
    }
}

impl std::fmt::Debug for SolanaKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaKeypair").field("address", &self.address()).finish()
    }
}

/// Whether `value` decodes to a 32-byte public key
fn is_pubkey(value: &str) -> bool {
    bs58::decode(value)
        .into_vec()
        .map(|bytes| bytes.len() == PUBKEY_LEN)
        .unwrap_or(false)
}

// ============================================================================
// RPC response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcValue<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
    amount: String,
    decimals: u32,
}

#[derive(Debug, Deserialize)]
struct TokenAccount {
    account: TokenAccountData,
}

#[derive(Debug, Deserialize)]
struct TokenAccountData {
    data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    parsed: ParsedInfo,
}

#[derive(Debug, Deserialize)]
struct ParsedInfo {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    err: Option<serde_json::Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// `Some(success)` once settled, `None` while pending
    fn settled(&self) -> Option<bool> {
        if self.err.is_some() {
            return Some(false);
        }
        match self.confirmation_status.as_deref() {
            Some("confirmed") | Some("finalized") => Some(true),
            _ => None,
        }
    }
}

fn parse_raw_amount(amount: &str) -> TradingResult<u128> {
    amount
        .parse::<u128>()
        .map_err(|e| TradingError::decode(format!("Invalid token amount {}: {}", amount, e)))
}

// ============================================================================
// Connector
// ============================================================================

/// Adapter for Solana mainnet (or any cluster the RPC URL points at)
pub struct SolanaConnector {
    rpc: RpcClient,
    secret: Option<String>,
    keypair: RwLock<Option<SolanaKeypair>>,
    connected: AtomicBool,
    poll_interval: Duration,
}

impl SolanaConnector {
    pub fn new(config: &ChainConfig) -> TradingResult<Self> {
        let rpc = RpcClient::new(&config.rpc_url_for(Blockchain::Solana))?;

        Ok(Self {
            rpc,
            secret: config.private_key.clone(),
            keypair: RwLock::new(None),
            connected: AtomicBool::new(false),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override the signature status polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn ensure_connected(&self) -> TradingResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TradingError::not_connected("solana adapter is not connected"))
        }
    }

    async fn native_balance(&self, owner: &str) -> TradingResult<Decimal> {
        let lamports: RpcValue<u64> = self.rpc.call("getBalance", json!([owner])).await?;
        from_base_units(u128::from(lamports.value), Blockchain::Solana.native_decimals())
    }

    async fn token_balance(&self, owner: &str, mint: &str) -> TradingResult<Decimal> {
        // Fails upstream for anything that is not a token mint
        let supply: RpcValue<TokenAmount> = self
            .rpc
            .call("getTokenSupply", json!([mint]))
            .await
            .map_err(|e| TradingError::unsupported_asset(format!("{} is not a token mint: {}", mint, e)))?;

        let accounts: RpcValue<Vec<TokenAccount>> = self
            .rpc
            .call(
                "getTokenAccountsByOwner",
                json!([owner, { "mint": mint }, { "encoding": "jsonParsed" }]),
            )
            .await?;

        debug!("{} token accounts for {} (mint {})", accounts.value.len(), owner, mint);

        let mut total: u128 = 0;
        for account in &accounts.value {
            let raw = parse_raw_amount(&account.account.data.parsed.info.token_amount.amount)?;
            total = total
                .checked_add(raw)
                .ok_or_else(|| TradingError::decode(format!("Token balance overflow for {}", owner)))?;
        }

        from_base_units(total, supply.value.decimals)
    }

    async fn signature_status(&self, signature: &str) -> TradingResult<Option<bool>> {
        let statuses: RpcValue<Vec<Option<SignatureStatus>>> = self
            .rpc
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;

        Ok(statuses
            .value
            .first()
            .and_then(|status| status.as_ref())
            .and_then(SignatureStatus::settled))
    }
}

#[async_trait]
impl ChainConnector for SolanaConnector {
    fn blockchain(&self) -> Blockchain {
        Blockchain::Solana
    }

    fn address(&self) -> Option<String> {
        self.keypair.read().as_ref().map(SolanaKeypair::address)
    }

    #[instrument(skip(self))]
    async fn connect(&self) -> TradingResult<()> {
        self.connected.store(false, Ordering::SeqCst);

        let version: serde_json::Value = self
            .rpc
            .call("getVersion", json!([]))
            .await
            .map_err(|e| TradingError::connection(format!("solana unreachable at {}: {}", self.rpc.url(), e)))?;

        let keypair = self
            .secret
            .as_deref()
            .map(SolanaKeypair::from_secret)
            .transpose()?;

        *self.keypair.write() = keypair;
        self.connected.store(true, Ordering::SeqCst);

        info!(
            "Connected to solana (core {}, {})",
            version.get("solana-core").and_then(|v| v.as_str()).unwrap_or("unknown"),
            self.address().unwrap_or_else(|| "read-only".to_string())
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[instrument(skip(self))]
    async fn get_balance(&self, address: &str, token: Option<&str>) -> TradingResult<Decimal> {
        self.ensure_connected()?;

        if !is_pubkey(address) {
            return Err(TradingError::invalid_input(format!("Invalid Solana address: {}", address)));
        }

        match token {
            None => self.native_balance(address).await,
            Some(mint) if is_pubkey(mint) => self.token_balance(address, mint).await,
            Some(mint) => Err(TradingError::unsupported_asset(format!("{} is not a mint address", mint))),
        }
    }

    #[instrument(skip(self, payload))]
    async fn send_transaction(&self, payload: TransactionPayload) -> TradingResult<String> {
        self.ensure_connected()?;

        match payload {
            TransactionPayload::Signed(raw) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&raw);
                let signature: String = self
                    .rpc
                    .call("sendTransaction", json!([encoded, { "encoding": "base64" }]))
                    .await
                    .map_err(|e| TradingError::submission(format!("Broadcast on solana failed: {}", e)))?;

                info!("Sent solana transaction {}", signature);
                Ok(signature)
            }
            TransactionPayload::Call { .. } if self.address().is_none() => {
                Err(TradingError::credential("solana adapter is read-only"))
            }
            TransactionPayload::Call { .. } => Err(TradingError::unsupported(
                "solana adapter only broadcasts pre-signed transactions",
            )),
        }
    }

    #[instrument(skip(self))]
    async fn wait_for_confirmation(&self, tx_id: &str, timeout: Duration) -> TradingResult<bool> {
        self.ensure_connected()?;
        Ok(poll_until_settled(timeout, self.poll_interval, || self.signature_status(tx_id)).await)
    }
}

impl std::fmt::Debug for SolanaConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaConnector")
            .field("rpc", &self.rpc)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn keypair_bytes() -> Vec<u8> {
        (0u8..64).collect()
    }

    #[test]
    fn test_keypair_from_json_array() {
        let json = serde_json::to_string(&keypair_bytes()).unwrap();
        let keypair = SolanaKeypair::from_secret(&json).unwrap();
        let expected: Vec<u8> = (32u8..64).collect();
        assert_eq!(keypair.pubkey().to_vec(), expected);
        assert_eq!(keypair.address(), bs58::encode(&expected).into_string());
    }

    #[test]
    fn test_keypair_from_base58() {
        let encoded = bs58::encode(keypair_bytes()).into_string();
        let from_b58 = SolanaKeypair::from_secret(&encoded).unwrap();
        let from_json = SolanaKeypair::from_secret(&serde_json::to_string(&keypair_bytes()).unwrap()).unwrap();
        assert_eq!(from_b58, from_json);
    }

    #[test]
    fn test_malformed_keypair_is_credential_error() {
        let short = bs58::encode([1u8; 32]).into_string();
        assert!(matches!(SolanaKeypair::from_secret(&short), Err(TradingError::Credential(_))));
        assert!(matches!(SolanaKeypair::from_secret("0OIl"), Err(TradingError::Credential(_))));
        assert!(matches!(SolanaKeypair::from_secret("[1, 2"), Err(TradingError::Credential(_))));
    }

    #[test]
    fn test_is_pubkey() {
        assert!(is_pubkey("So11111111111111111111111111111111111111112"));
        assert!(!is_pubkey("0x2791bca1f2de4661ed88a30c99a7a9449aa84174"));
        assert!(!is_pubkey(""));
    }

    #[test]
    fn test_signature_status_settlement() {
        let pending: SignatureStatus =
            serde_json::from_value(json!({ "err": null, "confirmationStatus": "processed" })).unwrap();
        assert_eq!(pending.settled(), None);

        let confirmed: SignatureStatus =
            serde_json::from_value(json!({ "err": null, "confirmationStatus": "finalized" })).unwrap();
        assert_eq!(confirmed.settled(), Some(true));

        let failed: SignatureStatus = serde_json::from_value(
            json!({ "err": { "InstructionError": [0, "Custom"] }, "confirmationStatus": "confirmed" }),
        )
        .unwrap();
        assert_eq!(failed.settled(), Some(false));
    }

    #[test]
    fn test_token_account_decoding() {
        let account: TokenAccount = serde_json::from_value(json!({
            "pubkey": "ignored",
            "account": { "data": { "parsed": { "info": {
                "tokenAmount": { "amount": "1500000", "decimals": 6, "uiAmount": 1.5 }
            }}}}
        }))
        .unwrap();
        let raw = parse_raw_amount(&account.account.data.parsed.info.token_amount.amount).unwrap();
        assert_eq!(from_base_units(raw, 6).unwrap(), dec!(1.5));
    }

    #[tokio::test]
    async fn test_calls_before_connect_fail() {
        let chain = SolanaConnector::new(&ChainConfig::new("http://127.0.0.1:1")).unwrap();
        assert_eq!(chain.blockchain(), Blockchain::Solana);

        let balance = chain.get_balance("So11111111111111111111111111111111111111112", None).await;
        assert!(matches!(balance, Err(TradingError::NotConnected(_))));

        let sent = chain.send_transaction(TransactionPayload::Signed(vec![1, 2, 3])).await;
        assert!(matches!(sent, Err(TradingError::NotConnected(_))));

        let confirmed = chain.wait_for_confirmation("sig", Duration::ZERO).await;
        assert!(matches!(confirmed, Err(TradingError::NotConnected(_))));
    }
}
