//! Configuration for chains, the router, and platform endpoints

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use crate::platform::{platforms, Blockchain};

const DEFAULT_MAX_IN_FLIGHT: usize = 8;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Endpoint and signing material for one chain
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ChainConfig {
    /// RPC endpoint; the chain's public default when absent
    pub rpc_url: Option<String>,
    /// Signing key; absent means read-only
    pub private_key: Option<String>,
}

impl ChainConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: Some(rpc_url.into()),
            private_key: None,
        }
    }

    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    /// Configured endpoint, falling back to the chain default
    pub fn rpc_url_for(&self, blockchain: Blockchain) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| blockchain.default_rpc_url().to_string())
    }

    pub fn is_read_only(&self) -> bool {
        self.private_key.is_none()
    }
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Fan-out limits for the trading router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Maximum adapter calls in flight across all callers
    pub max_in_flight: usize,
    /// Per-adapter deadline when the caller gives none
    pub default_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraderConfig {
    /// Enabled chains
    pub blockchains: BTreeMap<Blockchain, ChainConfig>,
    pub router: RouterConfig,
    /// Deadline for each chain's `connect` at startup
    pub connect_timeout: Duration,
    /// Per-platform REST endpoint overrides, keyed by platform name
    pub api_urls: BTreeMap<String, String>,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            blockchains: BTreeMap::new(),
            router: RouterConfig::default(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            api_urls: BTreeMap::new(),
        }
    }
}

impl TraderConfig {
    /// Load configuration from process environment variables
    ///
    /// Expects, per chain, `{CHAIN}_RPC_URL` and optionally
    /// `{CHAIN}_PRIVATE_KEY`, where `{CHAIN}` is one of `ETHEREUM`,
    /// `POLYGON`, `SOLANA`, `BNB`. A chain is enabled when its RPC URL is
    /// set or `{CHAIN}_ENABLED=true` (public endpoint).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Parse configuration from key/value pairs
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();

        let mut config = TraderConfig::default();

        for blockchain in Blockchain::ALL {
            let prefix = blockchain.env_prefix();
            let rpc_url = vars.get(&format!("{}_RPC_URL", prefix)).cloned();
            let enabled = match vars.get(&format!("{}_ENABLED", prefix)) {
                Some(v) => parse_bool(&format!("{}_ENABLED", prefix), v)?,
                None => false,
            };

            if rpc_url.is_none() && !enabled {
                continue;
            }

            config.blockchains.insert(
                blockchain,
                ChainConfig {
                    rpc_url,
                    private_key: vars.get(&format!("{}_PRIVATE_KEY", prefix)).cloned(),
                },
            );
        }

        if let Some(v) = vars.get("ROUTER_MAX_IN_FLIGHT") {
            let max = parse_number::<usize>("ROUTER_MAX_IN_FLIGHT", v)?;
            if max == 0 {
                return Err(ConfigError::OutOfRange {
                    field: "ROUTER_MAX_IN_FLIGHT".to_string(),
                    value: v.clone(),
                });
            }
            config.router.max_in_flight = max;
        }

        if let Some(v) = vars.get("ROUTER_TIMEOUT_SECS") {
            config.router.default_timeout =
                Duration::from_secs(parse_number("ROUTER_TIMEOUT_SECS", v)?);
        }

        if let Some(v) = vars.get("CHAIN_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout =
                Duration::from_secs(parse_number("CHAIN_CONNECT_TIMEOUT_SECS", v)?);
        }

        for platform in [platforms::POLYMARKET, platforms::HEDGEHOG, platforms::MYRIAD] {
            let key = format!("{}_API_URL", platform.to_uppercase());
            if let Some(url) = vars.get(&key) {
                config.api_urls.insert(platform.to_string(), url.clone());
            }
        }

        Ok(config)
    }

    /// Enable a chain programmatically
    pub fn with_chain(mut self, blockchain: Blockchain, chain: ChainConfig) -> Self {
        self.blockchains.insert(blockchain, chain);
        self
    }

    /// REST endpoint override for a platform
    pub fn api_url(&self, platform: &str) -> Option<&str> {
        self.api_urls.get(platform).map(String::as_str)
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid number in {field}: {value}")]
    InvalidNumber { field: String, value: String },

    #[error("Invalid boolean in {field}: {value}")]
    InvalidBool { field: String, value: String },

    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_environment_enables_nothing() {
        let config = TraderConfig::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert!(config.blockchains.is_empty());
        assert_eq!(config.router, RouterConfig::default());
    }

    #[test]
    fn test_chain_enabled_by_rpc_url() {
        let config = TraderConfig::from_vars(vec![
            ("POLYGON_RPC_URL", "https://polygon.example"),
            ("POLYGON_PRIVATE_KEY", "0xabc"),
            ("ETHEREUM_PRIVATE_KEY", "0xdef"),
        ])
        .unwrap();

        assert_eq!(config.blockchains.len(), 1);
        let polygon = &config.blockchains[&Blockchain::Polygon];
        assert_eq!(polygon.rpc_url.as_deref(), Some("https://polygon.example"));
        assert!(!polygon.is_read_only());
    }

    #[test]
    fn test_chain_enabled_flag_uses_default_endpoint() {
        let config = TraderConfig::from_vars(vec![("SOLANA_ENABLED", "true")]).unwrap();
        let solana = &config.blockchains[&Blockchain::Solana];
        assert!(solana.is_read_only());
        assert_eq!(
            solana.rpc_url_for(Blockchain::Solana),
            "https://api.mainnet-beta.solana.com"
        );
    }

    #[test]
    fn test_router_settings() {
        let config = TraderConfig::from_vars(vec![
            ("ROUTER_MAX_IN_FLIGHT", "3"),
            ("ROUTER_TIMEOUT_SECS", "2"),
            ("MYRIAD_API_URL", "https://myriad.example"),
        ])
        .unwrap();
        assert_eq!(config.router.max_in_flight, 3);
        assert_eq!(config.router.default_timeout, Duration::from_secs(2));
        assert_eq!(config.api_url("myriad"), Some("https://myriad.example"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            TraderConfig::from_vars(vec![("ROUTER_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            TraderConfig::from_vars(vec![("ROUTER_MAX_IN_FLIGHT", "0")]),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert!(matches!(
            TraderConfig::from_vars(vec![("BNB_ENABLED", "maybe")]),
            Err(ConfigError::InvalidBool { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let chain = ChainConfig::new("https://rpc").with_private_key("0xsecret");
        let rendered = format!("{:?}", chain);
        assert!(!rendered.contains("0xsecret"));
        assert!(rendered.contains("<redacted>"));
    }
}
