//! REST wire types for the v5 account, position and market endpoints.
//!
//! Every numeric field goes through `lenient_decimal`: the exchange sends
//! numbers as strings and leaves fields empty for account types that do
//! not support them, which must read as zero rather than fail.

use crate::error::{ExchangeError, ExchangeResult};
use chrono::Utc;
use desk_core::{lenient_decimal, AccountSnapshot, AccountType, Position, Side, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Common response envelope.
///
/// `retCode == 0` means success; otherwise `retMsg` is the
/// human-readable reason and is surfaced verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(rename = "retCode")]
    pub ret_code: i64,
    #[serde(rename = "retMsg", default)]
    pub ret_msg: String,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Convert into the result payload, or an `Api` error for non-zero codes.
    ///
    /// A successful envelope with no result yields `None`.
    pub fn into_result(self) -> ExchangeResult<Option<T>> {
        if self.ret_code != 0 {
            return Err(ExchangeError::Api {
                code: self.ret_code,
                message: self.ret_msg,
            });
        }
        Ok(self.result)
    }
}

/// `result` of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResult<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
}

/// One account entry from `/v5/account/wallet-balance`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawWalletAccount {
    #[serde(rename = "accountType", default)]
    pub account_type: Option<String>,
    #[serde(rename = "totalWalletBalance", default, deserialize_with = "lenient_decimal")]
    pub total_wallet_balance: Decimal,
    #[serde(rename = "totalEquity", default, deserialize_with = "lenient_decimal")]
    pub total_equity: Decimal,
    #[serde(rename = "totalMarginBalance", default, deserialize_with = "lenient_decimal")]
    pub total_margin_balance: Decimal,
    #[serde(rename = "totalAvailableBalance", default, deserialize_with = "lenient_decimal")]
    pub total_available_balance: Decimal,
    #[serde(rename = "totalPositionIM", default, deserialize_with = "lenient_decimal")]
    pub total_position_im: Decimal,
    #[serde(rename = "totalInitialMargin", default, deserialize_with = "lenient_decimal")]
    pub total_initial_margin: Decimal,
    #[serde(rename = "totalOrderIM", default, deserialize_with = "lenient_decimal")]
    pub total_order_im: Decimal,
    #[serde(rename = "totalMaintenanceMargin", default, deserialize_with = "lenient_decimal")]
    pub total_maintenance_margin: Decimal,
}

impl RawWalletAccount {
    /// Normalize into a snapshot tagged with the category that was queried.
    pub fn into_snapshot(self, requested: AccountType) -> AccountSnapshot {
        AccountSnapshot {
            account_type: requested,
            wallet_balance: self.total_wallet_balance,
            total_equity: self.total_equity,
            total_margin_balance: self.total_margin_balance,
            total_available_balance: self.total_available_balance,
            position_initial_margin: self.total_position_im,
            initial_margin: self.total_initial_margin,
            order_initial_margin: self.total_order_im,
            maintenance_margin: self.total_maintenance_margin,
            fetched_at: Utc::now(),
        }
    }
}

/// One entry from `/v5/position/list`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPosition {
    #[serde(default)]
    pub symbol: String,
    /// "Buy", "Sell", or empty for flat one-way slots.
    #[serde(default)]
    pub side: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub size: Decimal,
    #[serde(rename = "unrealisedPnl", default, deserialize_with = "lenient_decimal")]
    pub unrealised_pnl: Decimal,
}

impl RawPosition {
    /// Convert to an open position; `None` only for flat entries.
    ///
    /// An unrecognized side label keeps the row as `Side::Unknown` so its
    /// unrealized PnL still counts.
    pub fn into_open_position(self) -> Option<Position> {
        if self.size <= Decimal::ZERO {
            return None;
        }
        let side = Side::from_exchange(&self.side).unwrap_or_else(|| {
            warn!(symbol = %self.symbol, side = %self.side, "Open position with unknown side");
            Side::Unknown
        });
        Some(Position {
            symbol: self.symbol,
            side,
            size: Size::new(self.size),
            unrealized_pnl: self.unrealised_pnl,
        })
    }
}

/// One entry from `/v5/market/tickers`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTicker {
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "lastPrice", default, deserialize_with = "lenient_decimal")]
    pub last_price: Decimal,
    /// Only derivatives categories report a mark price.
    #[serde(rename = "markPrice", default, deserialize_with = "lenient_decimal")]
    pub mark_price: Decimal,
    /// 24h change as a fraction (0.0123 = +1.23%).
    #[serde(rename = "price24hPcnt", default, deserialize_with = "lenient_decimal")]
    pub price_24h_pcnt: Decimal,
}

/// Which price a quote carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceKind {
    Mark,
    Last,
}

impl fmt::Display for PriceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mark => f.write_str("mark"),
            Self::Last => f.write_str("last"),
        }
    }
}

/// Reference price for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerQuote {
    pub symbol: String,
    /// Category the quote came from (e.g., "linear").
    pub category: String,
    pub price: Decimal,
    pub kind: PriceKind,
    /// 24h change in percent.
    pub change_24h_pct: Decimal,
}

impl RawTicker {
    /// Build a quote, preferring a positive mark price over a positive last price.
    pub fn to_quote(&self, category: &str) -> Option<TickerQuote> {
        let (price, kind) = if self.mark_price > Decimal::ZERO {
            (self.mark_price, PriceKind::Mark)
        } else if self.last_price > Decimal::ZERO {
            (self.last_price, PriceKind::Last)
        } else {
            return None;
        };

        Some(TickerQuote {
            symbol: self.symbol.clone(),
            category: category.to_string(),
            price,
            kind,
            change_24h_pct: self.price_24h_pcnt * Decimal::ONE_HUNDRED,
        })
    }
}
