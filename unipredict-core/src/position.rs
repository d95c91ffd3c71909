//! Position and order structures

use crate::market::Side;
use crate::platform::Blockchain;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's stake in a prediction market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Position identifier on the platform
    pub id: String,

    /// Market this position belongs to
    pub market_id: String,

    /// Which outcome is held
    pub side: Side,

    /// Number of shares held
    pub shares: Decimal,

    /// Total amount paid for the shares
    pub cost_basis: Decimal,

    /// Mark-to-market value of the shares
    pub current_value: Decimal,

    pub platform: String,

    pub blockchain: Blockchain,
}

impl Position {
    /// Unrealized profit/loss
    pub fn unrealized_pnl(&self) -> Decimal {
        self.current_value - self.cost_basis
    }

    /// Average price paid per share
    pub fn avg_price(&self) -> Decimal {
        if self.shares.is_zero() {
            Decimal::ZERO
        } else {
            self.cost_basis / self.shares
        }
    }

    /// P&L as a percentage of cost basis
    pub fn pnl_percentage(&self) -> Decimal {
        if self.cost_basis.is_zero() {
            Decimal::ZERO
        } else {
            (self.unrealized_pnl() / self.cost_basis) * Decimal::from(100)
        }
    }
}

/// A resting or historical order, mirrored read-only from the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub market_id: String,
    pub side: Side,
    pub shares: Decimal,
    pub price: Decimal,
    /// Platform-defined lifecycle state (e.g. "live", "matched")
    pub status: String,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
}
