//! EVM signing wallet - key loading and transaction signing

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, B256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use std::str::FromStr;
use tracing::info;
use unipredict_core::{TradingError, TradingResult};

/// Signing identity for an EVM chain adapter
#[derive(Clone)]
pub struct EvmWallet {
    signer: PrivateKeySigner,
    address: Address,
}

impl EvmWallet {
    /// Create a wallet from a private key hex string
    pub fn from_private_key(private_key: &str) -> TradingResult<Self> {
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);

        let key_bytes = B256::from_str(key)
            .map_err(|e| TradingError::credential(format!("Invalid private key format: {}", e)))?;

        let signer = PrivateKeySigner::from_bytes(&key_bytes)
            .map_err(|e| TradingError::credential(format!("Failed to create signer: {}", e)))?;

        let address = signer.address();

        info!("Loaded signing wallet: {}", address);

        Ok(Self { signer, address })
    }

    /// Get the wallet address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the wallet address as a checksummed string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Sign a fully populated transaction request, returning EIP-2718 bytes
    ///
    /// The request must carry nonce, gas, gas price, and chain id.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> TradingResult<Vec<u8>> {
        let wallet = EthereumWallet::from(self.signer.clone());

        let envelope = tx
            .with_from(self.address)
            .build(&wallet)
            .await
            .map_err(|e| TradingError::submission(format!("Failed to sign transaction: {}", e)))?;

        Ok(envelope.encoded_2718())
    }
}

impl std::fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWallet")
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    // Well-known development key, never funded on mainnet
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = EvmWallet::from_private_key(TEST_KEY).unwrap();
        assert_eq!(
            wallet.address_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_key_without_prefix() {
        let wallet = EvmWallet::from_private_key(&TEST_KEY[2..]).unwrap();
        assert!(wallet.address_string().starts_with("0x"));
    }

    #[test]
    fn test_malformed_key_is_credential_error() {
        let err = EvmWallet::from_private_key("0x1234").unwrap_err();
        assert!(matches!(err, TradingError::Credential(_)));
    }

    #[test]
    fn test_debug_hides_key() {
        let wallet = EvmWallet::from_private_key(TEST_KEY).unwrap();
        let rendered = format!("{:?}", wallet);
        assert!(!rendered.contains("ac0974bec39a17e3"));
    }

    #[tokio::test]
    async fn test_sign_legacy_transfer() {
        let wallet = EvmWallet::from_private_key(TEST_KEY).unwrap();
        let tx = TransactionRequest::default()
            .with_to(Address::ZERO)
            .with_value(U256::from(1u64))
            .with_nonce(0)
            .with_chain_id(137)
            .with_gas_limit(21_000)
            .with_gas_price(30_000_000_000);

        let raw = wallet.sign_transaction(tx).await.unwrap();
        assert!(!raw.is_empty());
    }
}
