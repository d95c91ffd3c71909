//! Registry and routing services
//!
//! [`Registry`] wires configured chains to the platforms that trade on them;
//! [`TradingRouter`] is the single entry point that fans listing calls out
//! across platforms and routes everything else by platform name.

pub mod aggregate;
pub mod registry;
pub mod router;

pub use aggregate::{FanOut, PlatformFailure};
pub use registry::{
    ChainFactory, DefaultChainFactory, MarketBuilder, PlatformEntry, Registry, RegistryWarning, DEFAULT_PLATFORMS,
};
pub use router::TradingRouter;
