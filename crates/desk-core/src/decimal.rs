//! Precision-safe decimal helpers for account figures.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors in balances and PnL.
//!
//! Exchange payloads carry numbers as strings that may be empty, missing
//! or malformed depending on the account type. Every such field is read
//! through [`parse_lenient`]: anything that is not a number becomes zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use tracing::debug;

/// Position size with exact decimal precision.
///
/// Always non-negative; the direction of a position lives in its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a size, taking the absolute value of `value`.
    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value.abs())
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self::new(d)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Self;

    /// Saturates at zero.
    fn sub(self, rhs: Self) -> Self::Output {
        Self((self.0 - rhs.0).max(Decimal::ZERO))
    }
}

/// Parse an exchange numeric string, defaulting to zero.
///
/// Missing, empty and non-numeric inputs all yield `Decimal::ZERO`.
pub fn parse_lenient(raw: Option<&str>) -> Decimal {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Decimal::ZERO;
    };

    match Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)) {
        Ok(value) => value,
        Err(e) => {
            debug!(raw, error = %e, "Discarding non-numeric field");
            Decimal::ZERO
        }
    }
}

/// Serde adapter applying [`parse_lenient`] to strings, numbers and nulls.
///
/// Use together with `#[serde(default)]` so absent fields become zero too.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_lenient(Some(&s)),
        Some(serde_json::Value::Number(n)) => parse_lenient(Some(&n.to_string())),
        _ => Decimal::ZERO,
    })
}
