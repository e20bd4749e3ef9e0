//! Core domain types for the wallet-desk dashboard bot.
//!
//! This crate provides the types shared by every other crate:
//! - `AccountSnapshot`, `Position`: normalized exchange account state
//! - `MetricsEngine`, `DerivedMetrics`: dashboard figures derived from a snapshot
//! - `MonthKey`: calendar month used for the month-to-date baseline
//! - `Size` and lenient decimal parsing for exchange numeric fields

pub mod account;
pub mod decimal;
pub mod error;
pub mod metrics;
pub mod month;

pub use account::{AccountSnapshot, AccountType, Position, Side};
pub use decimal::{lenient_decimal, parse_lenient, Size};
pub use error::{CoreError, Result};
pub use metrics::{DerivedMetrics, MetricsEngine};
pub use month::{month_to_date_pct, MonthKey};
