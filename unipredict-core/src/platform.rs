//! Blockchain and platform identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TradingError;

/// Well-known market platform names
pub mod platforms {
    pub const POLYMARKET: &str = "polymarket";
    pub const HEDGEHOG: &str = "hedgehog";
    pub const MYRIAD: &str = "myriad";
}

/// Supported blockchains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Blockchain {
    /// Ethereum mainnet
    Ethereum,
    /// Polygon PoS (EVM-compatible)
    Polygon,
    /// Solana mainnet-beta
    Solana,
    /// BNB Smart Chain (EVM-compatible)
    Bnb,
}

impl Blockchain {
    /// All supported chains, in configuration order
    pub const ALL: [Blockchain; 4] = [
        Blockchain::Ethereum,
        Blockchain::Polygon,
        Blockchain::Solana,
        Blockchain::Bnb,
    ];

    /// Lowercase identifier used in configuration and provenance tags
    pub fn as_str(&self) -> &'static str {
        match self {
            Blockchain::Ethereum => "ethereum",
            Blockchain::Polygon => "polygon",
            Blockchain::Solana => "solana",
            Blockchain::Bnb => "bnb",
        }
    }

    /// Get the full display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Blockchain::Ethereum => "Ethereum",
            Blockchain::Polygon => "Polygon",
            Blockchain::Solana => "Solana",
            Blockchain::Bnb => "BNB Chain",
        }
    }

    /// Whether the chain speaks the Ethereum JSON-RPC dialect
    pub fn is_evm(&self) -> bool {
        !matches!(self, Blockchain::Solana)
    }

    /// EIP-155 chain id for EVM chains
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Blockchain::Ethereum => Some(1),
            Blockchain::Polygon => Some(137),
            Blockchain::Bnb => Some(56),
            Blockchain::Solana => None,
        }
    }

    /// Public RPC endpoint used when none is configured
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Blockchain::Ethereum => "https://eth.llamarpc.com",
            Blockchain::Polygon => "https://polygon-rpc.com",
            Blockchain::Solana => "https://api.mainnet-beta.solana.com",
            Blockchain::Bnb => "https://bsc-dataseed1.binance.org",
        }
    }

    /// Decimals of the native asset
    pub fn native_decimals(&self) -> u32 {
        match self {
            Blockchain::Solana => 9,
            _ => 18,
        }
    }

    /// Environment variable prefix (e.g. `POLYGON` for `POLYGON_RPC_URL`)
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Blockchain::Ethereum => "ETHEREUM",
            Blockchain::Polygon => "POLYGON",
            Blockchain::Solana => "SOLANA",
            Blockchain::Bnb => "BNB",
        }
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Blockchain {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" => Ok(Blockchain::Ethereum),
            "polygon" | "matic" => Ok(Blockchain::Polygon),
            "solana" | "sol" => Ok(Blockchain::Solana),
            "bnb" | "bsc" => Ok(Blockchain::Bnb),
            _ => Err(TradingError::invalid_input(format!("Unknown blockchain: {}", s))),
        }
    }
}
