//! Calendar month key and month-to-date return.

use crate::error::CoreError;
use chrono::{DateTime, Datelike, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Create a month key. `month` must be in `1..=12`.
    pub fn new(year: i32, month: u32) -> crate::Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidMonthKey(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// Month containing `at`, in `at`'s own timezone.
    pub fn of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidMonthKey(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Month-to-date return in percent: `(current - start) / start * 100`.
///
/// Zero when `start <= 0` or when the ratio does not fit a `Decimal`.
pub fn month_to_date_pct(start: Decimal, current: Decimal) -> Decimal {
    if start <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    current
        .checked_sub(start)
        .and_then(|delta| delta.checked_div(start))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_month_key_display_and_parse() {
        let key = MonthKey::new(2026, 3).unwrap();
        assert_eq!(key.to_string(), "2026-03");
        assert_eq!("2026-03".parse::<MonthKey>().unwrap(), key);
    }

    #[test]
    fn test_month_key_rejects_bad_input() {
        assert!(MonthKey::new(2026, 13).is_err());
        assert!(MonthKey::new(2026, 0).is_err());
        assert!("2026/03".parse::<MonthKey>().is_err());
        assert!("abcd-03".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_key_of_datetime() {
        let at = Utc.with_ymd_and_hms(2026, 10, 31, 23, 59, 59).unwrap();
        assert_eq!(MonthKey::of(&at).to_string(), "2026-10");
    }

    #[test]
    fn test_month_key_serde_as_string() {
        let key = MonthKey::new(2025, 12).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""2025-12""#);
        let back: MonthKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_month_to_date_pct() {
        assert_eq!(month_to_date_pct(dec!(1000), dec!(1100)), dec!(10));
        assert_eq!(month_to_date_pct(dec!(1000), dec!(950)), dec!(-5));
    }

    #[test]
    fn test_month_to_date_pct_zero_for_non_positive_start() {
        assert_eq!(month_to_date_pct(dec!(0), dec!(100)), Decimal::ZERO);
        assert_eq!(month_to_date_pct(dec!(-5), dec!(100)), Decimal::ZERO);
    }

    #[test]
    fn test_month_to_date_pct_overflow_is_zero() {
        let dust = Decimal::new(1, 28);
        assert_eq!(month_to_date_pct(dust, Decimal::MAX), Decimal::ZERO);
        assert_eq!(month_to_date_pct(dust, Decimal::MIN), Decimal::ZERO);
        assert_eq!(month_to_date_pct(dec!(0.5), dec!(1)), dec!(100));
    }
}
