//! Blockchain adapters
//!
//! Implementations of [`ChainConnector`] for EVM chains (Ethereum, Polygon,
//! BNB Chain) and Solana. Reads go through a plain JSON-RPC client; EVM
//! transactions are signed locally with alloy.

pub mod confirm;
pub mod evm;
pub mod rpc;
pub mod solana;
pub mod units;
pub mod wallet;

use std::sync::Arc;

use unipredict_core::{Blockchain, ChainConfig, ChainConnector, TradingResult};

pub use evm::EvmConnector;
pub use rpc::RpcClient;
pub use solana::{SolanaConnector, SolanaKeypair};
pub use wallet::EvmWallet;

/// Build the adapter for a chain (not yet connected)
pub fn build_chain(blockchain: Blockchain, config: &ChainConfig) -> TradingResult<Arc<dyn ChainConnector>> {
    let connector: Arc<dyn ChainConnector> = match blockchain {
        Blockchain::Solana => Arc::new(SolanaConnector::new(config)?),
        evm => Arc::new(EvmConnector::new(evm, config)?),
    };
    Ok(connector)
}
