//! Module parameters.

use crate::decimal::FeeRate;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default validator fee: 1% of every claim.
pub fn default_validator_fee() -> Decimal {
    Decimal::new(1, 2)
}

/// Governance-controlled stream parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Fraction of each claimed amount sent to the fee collector.
    pub validator_fee: FeeRate,
}

impl Params {
    pub fn new(validator_fee: FeeRate) -> Self {
        Params { validator_fee }
    }

    /// Builds params from an optional raw fee, applying all validation.
    pub fn from_fee(validator_fee: Option<Decimal>) -> Result<Self> {
        let fee = validator_fee.ok_or(EngineError::NilFee)?;
        Ok(Params::new(FeeRate::new(fee)?))
    }

    /// Re-checks the fee. `FeeRate` is validated on construction, so this
    /// only fails for values that bypassed it (e.g. hand-built genesis).
    pub fn validate(&self) -> Result<()> {
        FeeRate::new(self.validator_fee.value()).map(|_| ())
    }
}

impl Default for Params {
    fn default() -> Self {
        // 0.01 is within [0, 1] with two decimal places.
        Params::new(FeeRate::new(default_validator_fee()).unwrap_or(FeeRate::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_fee_is_one_percent() {
        assert_eq!(Params::default().validator_fee.to_string(), "0.01");
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_from_fee_validation() {
        assert!(matches!(Params::from_fee(None), Err(EngineError::NilFee)));
        assert!(matches!(
            Params::from_fee(Some(Decimal::from_str("-0.5").unwrap())),
            Err(EngineError::NegativeFee(_))
        ));
        assert!(matches!(
            Params::from_fee(Some(Decimal::from_str("1.5").unwrap())),
            Err(EngineError::FeeExceedsOne(_))
        ));

        let params = Params::from_fee(Some(Decimal::from_str("0.25").unwrap())).unwrap();
        assert_eq!(params.validator_fee.to_string(), "0.25");
    }

    #[test]
    fn test_bounds_inclusive() {
        assert!(Params::from_fee(Some(Decimal::ZERO)).is_ok());
        assert!(Params::from_fee(Some(Decimal::ONE)).is_ok());
    }
}
