//! REST market adapter
//!
//! Hedgehog Markets and Myriad Markets expose the same JSON layout
//! (`markets`, `markets/{id}`, `markets/{id}/price`,
//! `markets/{id}/orderbook`, `users/{address}/positions`), so one adapter
//! serves both; the platform name and base URL are supplied at construction.

pub mod client;
pub mod connector;
pub mod types;

pub use client::{RestClient, HEDGEHOG_API_BASE, MYRIAD_API_BASE};
pub use connector::RestMarketConnector;
