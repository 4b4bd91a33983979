//! Fixed-point arithmetic: the validator fee fraction and truncating
//! integer helpers for durations and flow rates.
//!
//! Every division here truncates toward zero. Nothing rounds up, so the
//! engine never streams or charges more than was deposited.

use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A fraction in `[0, 1]` with at most 18 decimal places.
///
/// Wraps `rust_decimal::Decimal`, kept normalized (no trailing zeros) so
/// that equal fractions compare and print identically.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use stream_ledger::FeeRate;
///
/// let fee = FeeRate::from_str("0.0100").unwrap();
/// assert_eq!(fee.to_string(), "0.01");
/// assert_eq!(fee.mul_truncate(1_000), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FeeRate(Decimal);

impl FeeRate {
    /// Maximum number of decimal places accepted.
    pub const PRECISION: u32 = 18;

    /// Zero fee.
    pub const ZERO: Self = FeeRate(Decimal::ZERO);

    /// Validates and normalizes a fee fraction.
    pub fn new(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(EngineError::NegativeFee(value));
        }
        if value > Decimal::ONE {
            return Err(EngineError::FeeExceedsOne(value));
        }

        let normalized = value.normalize();
        if normalized.scale() > Self::PRECISION {
            return Err(EngineError::FeeTooPrecise(normalized.scale()));
        }
        Ok(FeeRate(normalized))
    }

    /// Returns `true` if this fee is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The underlying decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `floor(amount * self)`, computed exactly in integers.
    ///
    /// Splits `amount` into `q * 10^scale + r` so neither partial product
    /// can overflow: `q * mantissa <= amount` because the fraction is at
    /// most one, and `r * mantissa < 10^36`.
    pub fn mul_truncate(&self, amount: u128) -> u128 {
        if self.is_zero() || amount == 0 {
            return 0;
        }

        let mantissa = self.0.mantissa().unsigned_abs();
        let divisor = 10u128.pow(self.0.scale());
        let quotient = amount / divisor;
        let remainder = amount % divisor;

        quotient * mantissa + remainder * mantissa / divisor
    }
}

impl FromStr for FeeRate {
    type Err = EngineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EngineError::NilFee);
        }
        let decimal = Decimal::from_str(trimmed)
            .map_err(|e| EngineError::InvalidAmount(format!("fee {trimmed:?}: {e}")))?;
        FeeRate::new(decimal)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for FeeRate {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for FeeRate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FeeRate::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Seconds `amount` lasts at `flow_rate` per second, truncated.
///
/// Returns `None` for a non-positive flow rate. Saturates at `i64::MAX`.
pub fn duration_for(amount: u128, flow_rate: i64) -> Option<i64> {
    if flow_rate <= 0 {
        return None;
    }
    let seconds = amount / flow_rate as u128;
    Some(i64::try_from(seconds).unwrap_or(i64::MAX))
}

/// Per-second rate that spreads `amount` over `total_seconds`, truncated.
///
/// Zero seconds yields a zero rate. Saturates at `i64::MAX`.
pub fn flow_rate_for(amount: u128, total_seconds: u64) -> i64 {
    if total_seconds == 0 {
        return 0;
    }
    let rate = amount / total_seconds as u128;
    i64::try_from(rate).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee(s: &str) -> FeeRate {
        FeeRate::from_str(s).unwrap()
    }

    #[test]
    fn test_from_str_normalizes() {
        assert_eq!(fee("0.0100").to_string(), "0.01");
        assert_eq!(fee("1.000").to_string(), "1");
        assert_eq!(fee("  0.5 ").to_string(), "0.5");
        assert_eq!(fee("0.0100"), fee("0.01"));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(FeeRate::from_str(""), Err(EngineError::NilFee)));
        assert!(matches!(
            FeeRate::from_str("-0.1"),
            Err(EngineError::NegativeFee(_))
        ));
        assert!(matches!(
            FeeRate::from_str("1.01"),
            Err(EngineError::FeeExceedsOne(_))
        ));
        assert!(matches!(
            FeeRate::from_str("0.0000000000000000001"),
            Err(EngineError::FeeTooPrecise(19))
        ));
        assert!(matches!(
            FeeRate::from_str("abc"),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_boundaries_accepted() {
        assert!(fee("0").is_zero());
        assert_eq!(fee("1").mul_truncate(12345), 12345);
        assert_eq!(fee("0.000000000000000001").mul_truncate(10u128.pow(18)), 1);
    }

    #[test]
    fn test_mul_truncate_floors() {
        assert_eq!(fee("0.01").mul_truncate(500), 5);
        assert_eq!(fee("0.01").mul_truncate(199), 1);
        assert_eq!(fee("0.01").mul_truncate(99), 0);
        assert_eq!(fee("0.333").mul_truncate(1000), 333);
        assert_eq!(FeeRate::ZERO.mul_truncate(1000), 0);
    }

    #[test]
    fn test_mul_truncate_huge_amount() {
        let amount = u128::MAX;
        assert_eq!(fee("1").mul_truncate(amount), amount);
        assert_eq!(fee("0.5").mul_truncate(amount), amount / 2);
        assert_eq!(
            fee("0.999999999999999999").mul_truncate(amount),
            amount - amount / 10u128.pow(18) - 1
        );
    }

    #[test]
    fn test_duration_for() {
        assert_eq!(duration_for(1000, 1), Some(1000));
        assert_eq!(duration_for(1000, 3), Some(333));
        assert_eq!(duration_for(5, 10), Some(0));
        assert_eq!(duration_for(1000, 0), None);
        assert_eq!(duration_for(1000, -4), None);
        assert_eq!(duration_for(u128::MAX, 1), Some(i64::MAX));
    }

    #[test]
    fn test_flow_rate_for() {
        assert_eq!(flow_rate_for(1000, 60), 16);
        assert_eq!(flow_rate_for(23_423_423, 2_628_000), 8);
        assert_eq!(flow_rate_for(1000, 0), 0);
    }
}
