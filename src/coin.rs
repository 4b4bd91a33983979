//! Account addresses and single-denomination coin amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque, totally ordered account identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Address(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address::new(value)
    }
}

/// A non-negative integer amount of one denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Coin {
            denom: denom.into(),
            amount,
        }
    }

    /// Zero amount of `denom`.
    pub fn zero(denom: impl Into<String>) -> Self {
        Coin::new(denom, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Error returned when a coin string is not `<digits><denom>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid coin {0:?}: expected <amount><denom>, e.g. 1000nund")]
pub struct ParseCoinError(String);

impl FromStr for Coin {
    type Err = ParseCoinError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ParseCoinError(trimmed.to_string()))?;
        let (digits, denom) = trimmed.split_at(split);

        let valid_denom = denom
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false)
            && denom
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
        if digits.is_empty() || !valid_denom {
            return Err(ParseCoinError(trimmed.to_string()));
        }

        let amount = digits
            .parse::<u128>()
            .map_err(|_| ParseCoinError(trimmed.to_string()))?;
        Ok(Coin::new(denom, amount))
    }
}
