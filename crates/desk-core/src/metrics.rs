//! Dashboard figures derived from one account snapshot.
//!
//! Exchange responses expose several overlapping notions of "money"
//! (wallet balance, equity, margin balance, available balance) that
//! disagree across account types. `MetricsEngine` fixes one derivation:
//!
//! | figure              | formula                                                    |
//! |---------------------|------------------------------------------------------------|
//! | `assets_now`        | margin balance if > 0, else equity                          |
//! | `available_margin`  | total available balance                                     |
//! | `used`              | `max(0, assets_now - available_margin)`                     |
//! | `pnl_open`          | sum of unrealized PnL over open positions                   |
//! | `capital_cost`      | `assets_now - pnl_open`                                     |
//! | `capital_free_real` | `max(0, wallet - position_im - order_im - maintenance)`     |
//! | `equity_mtm`        | `wallet + pnl_open`                                         |
//!
//! `position_im` falls back to the generic initial margin when the
//! position-specific field is not positive.

use crate::account::{AccountSnapshot, AccountType, Position};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Figures shown to chat users. Computed, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub account_type: AccountType,
    pub wallet_balance: Decimal,
    pub assets_now: Decimal,
    pub available_margin: Decimal,
    pub used: Decimal,
    pub pnl_open: Decimal,
    pub capital_cost: Decimal,
    pub position_im: Decimal,
    pub order_im: Decimal,
    pub maintenance: Decimal,
    pub capital_free_real: Decimal,
    pub equity_mtm: Decimal,
}

impl DerivedMetrics {
    /// Margin the user can commit right now, never negative.
    #[must_use]
    pub fn free_to_use(&self) -> Decimal {
        self.available_margin.max(Decimal::ZERO)
    }
}

/// Stateless derivation of [`DerivedMetrics`].
pub struct MetricsEngine;

impl MetricsEngine {
    /// Derive dashboard figures from a snapshot and its positions.
    ///
    /// Positions with zero size are ignored.
    pub fn derive(snapshot: &AccountSnapshot, positions: &[Position]) -> DerivedMetrics {
        let wallet_balance = snapshot.wallet_balance;
        let available_margin = snapshot.total_available_balance;

        let position_im = if snapshot.position_initial_margin > Decimal::ZERO {
            snapshot.position_initial_margin
        } else {
            snapshot.initial_margin
        };
        let order_im = snapshot.order_initial_margin;
        let maintenance = snapshot.maintenance_margin;

        let assets_now = if snapshot.total_margin_balance > Decimal::ZERO {
            snapshot.total_margin_balance
        } else {
            snapshot.total_equity
        };

        let pnl_open: Decimal = positions
            .iter()
            .filter(|p| p.is_open())
            .map(|p| p.unrealized_pnl)
            .sum();

        let used = (assets_now - available_margin).max(Decimal::ZERO);
        let capital_cost = assets_now - pnl_open;
        let capital_free_real =
            (wallet_balance - position_im - order_im - maintenance).max(Decimal::ZERO);
        let equity_mtm = wallet_balance + pnl_open;

        DerivedMetrics {
            account_type: snapshot.account_type,
            wallet_balance,
            assets_now,
            available_margin,
            used,
            pnl_open,
            capital_cost,
            position_im,
            order_im,
            maintenance,
            capital_free_real,
            equity_mtm,
        }
    }
}
