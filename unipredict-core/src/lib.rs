//! Core types for unified prediction-market trading
//!
//! This crate defines the shared records (markets, positions, orders, order
//! books), the typed error model, configuration, and the two capability
//! contracts every adapter implements: [`ChainConnector`] for blockchains and
//! [`MarketConnector`] for market platforms.

pub mod amount;
pub mod chain;
pub mod config;
pub mod connector;
pub mod error;
pub mod market;
pub mod platform;
pub mod position;

pub use amount::{decimal_from_value, optional_decimal, required_decimal};
pub use chain::{ChainConnector, TransactionPayload};
pub use config::{ChainConfig, ConfigError, RouterConfig, TraderConfig};
pub use connector::{Listing, MarketConnector, MarketQuery};
pub use error::{TradingError, TradingResult};
pub use market::{BookSide, Market, MarketStatus, OrderBook, OrderBookLevel, Side};
pub use platform::{platforms, Blockchain};
pub use position::{Order, Position};
