//! Connector registry
//!
//! Built once at startup: connects every configured chain, then walks the
//! platform table and binds each platform to the first connected chain in
//! its priority list. Nothing here aborts startup; construction failures are
//! kept as [`RegistryWarning`]s.

use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use unipredict_core::{
    platforms, Blockchain, ChainConfig, ChainConnector, MarketConnector, TraderConfig, TradingError, TradingResult,
};
use unipredict_polymarket::{PolymarketClient, PolymarketConnector, CLOB_API_BASE, DATA_API_BASE};
use unipredict_rest::{RestMarketConnector, HEDGEHOG_API_BASE, MYRIAD_API_BASE};

/// Constructor for a platform's market adapter
pub type MarketBuilder =
    fn(&str, Arc<dyn ChainConnector>, &TraderConfig) -> TradingResult<Arc<dyn MarketConnector>>;

/// One row of the platform table
#[derive(Clone, Copy)]
pub struct PlatformEntry {
    pub name: &'static str,
    /// Chains in priority order; the first connected one wins
    pub chains: &'static [Blockchain],
    pub build: MarketBuilder,
}

impl fmt::Debug for PlatformEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformEntry")
            .field("name", &self.name)
            .field("chains", &self.chains)
            .finish()
    }
}

fn build_polymarket(
    name: &str,
    chain: Arc<dyn ChainConnector>,
    config: &TraderConfig,
) -> TradingResult<Arc<dyn MarketConnector>> {
    Ok(Arc::new(polymarket_connector(name, chain, config)?))
}

/// Polymarket adapter; an API URL override replaces the Gamma base
fn polymarket_connector(
    name: &str,
    chain: Arc<dyn ChainConnector>,
    config: &TraderConfig,
) -> TradingResult<PolymarketConnector> {
    let client = match config.api_url(name) {
        Some(gamma_url) => PolymarketClient::with_urls(gamma_url, CLOB_API_BASE, DATA_API_BASE)?,
        None => PolymarketClient::new()?,
    };
    Ok(PolymarketConnector::with_client(client, chain))
}

fn build_hedgehog(
    name: &str,
    chain: Arc<dyn ChainConnector>,
    config: &TraderConfig,
) -> TradingResult<Arc<dyn MarketConnector>> {
    let api_url = config.api_url(name).unwrap_or(HEDGEHOG_API_BASE);
    Ok(Arc::new(RestMarketConnector::new(name, api_url, chain)?))
}

fn build_myriad(
    name: &str,
    chain: Arc<dyn ChainConnector>,
    config: &TraderConfig,
) -> TradingResult<Arc<dyn MarketConnector>> {
    let api_url = config.api_url(name).unwrap_or(MYRIAD_API_BASE);
    Ok(Arc::new(RestMarketConnector::new(name, api_url, chain)?))
}

/// Shipped platforms
pub const DEFAULT_PLATFORMS: &[PlatformEntry] = &[
    PlatformEntry {
        name: platforms::POLYMARKET,
        chains: &[Blockchain::Polygon],
        build: build_polymarket,
    },
    PlatformEntry {
        name: platforms::HEDGEHOG,
        chains: &[Blockchain::Ethereum],
        build: build_hedgehog,
    },
    PlatformEntry {
        name: platforms::MYRIAD,
        chains: &[Blockchain::Ethereum, Blockchain::Polygon],
        build: build_myriad,
    },
];

/// Builds chain adapters; swapped out in tests
pub trait ChainFactory: Send + Sync {
    fn build(&self, blockchain: Blockchain, config: &ChainConfig) -> TradingResult<Arc<dyn ChainConnector>>;
}

/// Factory producing the real EVM and Solana adapters
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultChainFactory;

impl ChainFactory for DefaultChainFactory {
    fn build(&self, blockchain: Blockchain, config: &ChainConfig) -> TradingResult<Arc<dyn ChainConnector>> {
        unipredict_chains::build_chain(blockchain, config)
    }
}

/// A recovered startup failure
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryWarning {
    /// Chain adapter could not be built or connected
    Chain { blockchain: Blockchain, error: TradingError },
    /// Market adapter could not be built
    Platform { platform: String, error: TradingError },
    /// No chain in the platform's priority list connected
    Unbound { platform: String, chains: Vec<Blockchain> },
}

impl fmt::Display for RegistryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryWarning::Chain { blockchain, error } => write!(f, "{} unavailable: {}", blockchain, error),
            RegistryWarning::Platform { platform, error } => write!(f, "{} unavailable: {}", platform, error),
            RegistryWarning::Unbound { platform, chains } => {
                let names: Vec<&str> = chains.iter().map(|c| c.as_str()).collect();
                write!(f, "{} skipped: none of [{}] connected", platform, names.join(", "))
            }
        }
    }
}

/// Connected chains and the market adapters bound to them
#[derive(Default)]
pub struct Registry {
    chains: BTreeMap<Blockchain, Arc<dyn ChainConnector>>,
    platforms: BTreeMap<String, Arc<dyn MarketConnector>>,
    warnings: Vec<RegistryWarning>,
}

impl Registry {
    /// Build from configuration with the real adapters and platform table
    pub async fn build(config: &TraderConfig) -> Self {
        Self::build_with(config, &DefaultChainFactory, DEFAULT_PLATFORMS).await
    }

    /// Build with an explicit chain factory and platform table
    pub async fn build_with(config: &TraderConfig, factory: &dyn ChainFactory, table: &[PlatformEntry]) -> Self {
        let mut registry = Self::default();

        let attempts = config.blockchains.iter().map(|(blockchain, chain_config)| async move {
            let result = connect_chain(factory, *blockchain, chain_config, config.connect_timeout).await;
            (*blockchain, result)
        });

        for (blockchain, result) in join_all(attempts).await {
            match result {
                Ok(chain) => {
                    info!("{} connected", blockchain);
                    registry.chains.insert(blockchain, chain);
                }
                Err(error) => registry.warn(RegistryWarning::Chain { blockchain, error }),
            }
        }

        for entry in table {
            let Some(chain) = entry.chains.iter().find_map(|c| registry.chains.get(c).cloned()) else {
                registry.warn(RegistryWarning::Unbound {
                    platform: entry.name.to_string(),
                    chains: entry.chains.to_vec(),
                });
                continue;
            };

            let blockchain = chain.blockchain();
            match (entry.build)(entry.name, chain, config) {
                Ok(connector) => {
                    info!("{} registered on {}", entry.name, blockchain);
                    registry.register(connector);
                }
                Err(error) => registry.warn(RegistryWarning::Platform {
                    platform: entry.name.to_string(),
                    error,
                }),
            }
        }

        info!(
            "Registry ready: {} chains, {} platforms, {} warnings",
            registry.chains.len(),
            registry.platforms.len(),
            registry.warnings.len()
        );
        registry
    }

    /// Register a market adapter under its platform name
    ///
    /// An existing registration with the same name is replaced.
    pub fn register(&mut self, connector: Arc<dyn MarketConnector>) {
        let name = connector.platform().to_string();
        if self.platforms.insert(name.clone(), connector).is_some() {
            warn!("Platform {} registered twice; keeping the latest", name);
        }
    }

    /// Register an already connected chain adapter
    pub fn register_chain(&mut self, chain: Arc<dyn ChainConnector>) {
        self.chains.insert(chain.blockchain(), chain);
    }

    fn warn(&mut self, warning: RegistryWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn platforms(&self) -> BTreeSet<String> {
        self.platforms.keys().cloned().collect()
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn MarketConnector>> {
        self.platforms.get(platform).cloned()
    }

    /// Every registered market adapter, ordered by platform name
    pub fn connectors(&self) -> Vec<Arc<dyn MarketConnector>> {
        self.platforms.values().cloned().collect()
    }

    pub fn chain(&self, blockchain: Blockchain) -> Option<Arc<dyn ChainConnector>> {
        self.chains.get(&blockchain).cloned()
    }

    pub fn chains(&self) -> Vec<Blockchain> {
        self.chains.keys().copied().collect()
    }

    pub fn warnings(&self) -> &[RegistryWarning] {
        &self.warnings
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("chains", &self.chains.keys().collect::<Vec<_>>())
            .field("platforms", &self.platforms.keys().collect::<Vec<_>>())
            .field("warnings", &self.warnings)
            .finish()
    }
}

async fn connect_chain(
    factory: &dyn ChainFactory,
    blockchain: Blockchain,
    config: &ChainConfig,
    connect_timeout: Duration,
) -> TradingResult<Arc<dyn ChainConnector>> {
    debug!("Connecting {} ({:?})", blockchain, config);
    let chain = factory.build(blockchain, config)?;

    match tokio::time::timeout(connect_timeout, chain.connect()).await {
        Ok(Ok(())) => Ok(chain),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(TradingError::timeout(format!(
            "{} connect exceeded {:?}",
            blockchain, connect_timeout
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_priorities() {
        let myriad = DEFAULT_PLATFORMS
            .iter()
            .find(|e| e.name == platforms::MYRIAD)
            .unwrap();
        assert_eq!(myriad.chains, &[Blockchain::Ethereum, Blockchain::Polygon]);

        let names: Vec<&str> = DEFAULT_PLATFORMS.iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["polymarket", "hedgehog", "myriad"]);
    }

    #[tokio::test]
    async fn test_empty_config_builds_empty_registry() {
        let registry = Registry::build(&TraderConfig::default()).await;
        assert!(registry.platforms().is_empty());
        assert!(registry.chains().is_empty());
        // Every platform is reported as unbound
        assert_eq!(registry.warnings().len(), DEFAULT_PLATFORMS.len());
    }

    #[test]
    fn test_polymarket_gamma_override() {
        let chain = unipredict_chains::build_chain(Blockchain::Polygon, &ChainConfig::new("http://127.0.0.1:1")).unwrap();

        let config = TraderConfig::from_vars(vec![("POLYMARKET_API_URL", "https://gamma.example/")]).unwrap();
        let polymarket = polymarket_connector(platforms::POLYMARKET, chain.clone(), &config).unwrap();
        assert_eq!(polymarket.client().base_url(), "https://gamma.example");

        let polymarket = polymarket_connector(platforms::POLYMARKET, chain, &TraderConfig::default()).unwrap();
        assert_eq!(polymarket.client().base_url(), unipredict_polymarket::GAMMA_API_BASE);
    }

    #[test]
    fn test_warning_display() {
        let warning = RegistryWarning::Unbound {
            platform: "myriad".to_string(),
            chains: vec![Blockchain::Ethereum, Blockchain::Polygon],
        };
        assert_eq!(warning.to_string(), "myriad skipped: none of [ethereum, polygon] connected");
    }
}
