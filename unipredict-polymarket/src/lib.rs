//! Polymarket integration
//!
//! Market metadata comes from the Gamma API, books and prices from the CLOB
//! API, and wallet holdings from the public Data API. None of these calls
//! require authentication.

pub mod client;
pub mod connector;
pub mod types;

pub use client::PolymarketClient;
pub use connector::PolymarketConnector;
pub use types::{GammaMarket, CLOB_API_BASE, DATA_API_BASE, GAMMA_API_BASE};
