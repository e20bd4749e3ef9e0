//! Normalized exchange account state.
//!
//! An `AccountSnapshot` is one wallet-balance reading for one user, and a
//! `Position` is one open derivatives position. Both are immutable once
//! built; the exchange crate is responsible for mapping wire payloads into
//! them with every numeric field defaulted to zero.

use crate::decimal::Size;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exchange account category a snapshot was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// Unified trading account (spot + derivatives under one margin).
    Unified,
    /// Classic derivatives account.
    Contract,
    /// Classic spot account.
    Spot,
}

impl AccountType {
    /// Wire label used by the exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unified => "UNIFIED",
            Self::Contract => "CONTRACT",
            Self::Spot => "SPOT",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNIFIED" => Ok(Self::Unified),
            "CONTRACT" => Ok(Self::Contract),
            "SPOT" => Ok(Self::Spot),
            other => Err(CoreError::InvalidAccountType(other.to_string())),
        }
    }
}

/// One wallet-balance reading.
///
/// Fields an account type does not report are zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account category this reading came from.
    pub account_type: AccountType,
    /// Cash balance before margin and unrealized PnL.
    pub wallet_balance: Decimal,
    /// Total equity including unrealized PnL.
    pub total_equity: Decimal,
    /// Margin balance (equity under margin accounting).
    pub total_margin_balance: Decimal,
    /// Balance available for new positions.
    pub total_available_balance: Decimal,
    /// Initial margin reserved by open positions.
    pub position_initial_margin: Decimal,
    /// Generic initial margin; some account types only report this one.
    pub initial_margin: Decimal,
    /// Initial margin reserved by open orders.
    pub order_initial_margin: Decimal,
    /// Maintenance margin of open positions.
    pub maintenance_margin: Decimal,
    /// When the reading was taken.
    pub fetched_at: DateTime<Utc>,
}

impl AccountSnapshot {
    /// Snapshot with every figure at zero.
    pub fn empty(account_type: AccountType) -> Self {
        Self {
            account_type,
            wallet_balance: Decimal::ZERO,
            total_equity: Decimal::ZERO,
            total_margin_balance: Decimal::ZERO,
            total_available_balance: Decimal::ZERO,
            position_initial_margin: Decimal::ZERO,
            initial_margin: Decimal::ZERO,
            order_initial_margin: Decimal::ZERO,
            maintenance_margin: Decimal::ZERO,
            fetched_at: Utc::now(),
        }
    }
}

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
    /// Open position whose side label was not recognized.
    Unknown,
}

impl Side {
    /// Map the exchange's order-side label ("Buy"/"Sell") to a position side.
    pub fn from_exchange(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "buy" | "long" => Some(Self::Long),
            "sell" | "short" => Some(Self::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => f.write_str("Long"),
            Self::Short => f.write_str("Short"),
            Self::Unknown => f.write_str("?"),
        }
    }
}

/// An open derivatives position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol (e.g., "BTCUSDT").
    pub symbol: String,
    /// Position direction.
    pub side: Side,
    /// Position size (never negative).
    pub size: Size,
    /// Unrealized PnL in settlement currency (signed).
    pub unrealized_pnl: Decimal,
}

impl Position {
    /// A position is open only while its size is above zero.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.size.is_positive()
    }

    /// Keep only open positions, preserving order.
    pub fn retain_open(positions: Vec<Position>) -> Vec<Position> {
        positions.into_iter().filter(Position::is_open).collect()
    }
}
