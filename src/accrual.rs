//! Lazy accrual math.
//!
//! Because `depletion_time` is fixed whenever a stream is mutated, the
//! claimable amount at any later `now` is O(1) to compute: no per-second or
//! per-block bookkeeping is ever needed. All functions here are pure and take
//! the current time explicitly.

use crate::decimal::FeeRate;
use crate::error::{EngineError, Result};

/// Outcome of settling a stream at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accrual {
    /// Amount that has flowed to the receiver since the last settlement.
    pub claimable: u128,
    /// Deposit left after paying out `claimable`.
    pub remaining: u128,
}

/// A claimed amount split between the receiver and the validator fee sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub receiver_amount: u128,
    pub validator_fee: u128,
}

/// Computes how much of `deposit` has accrued at `now`.
///
/// At or after `depletion_time` the whole deposit is claimable. Before it,
/// `(now - last_outflow_time) * flow_rate` is. Time running backwards, a
/// negative rate, overflow, or accrual beyond the deposit all mean the stored
/// record is inconsistent and are reported as `InvariantViolation`.
pub fn amount_claimable(
    now: i64,
    depletion_time: i64,
    last_outflow_time: i64,
    deposit: u128,
    flow_rate: i64,
) -> Result<Accrual> {
    if now >= depletion_time {
        return Ok(Accrual {
            claimable: deposit,
            remaining: 0,
        });
    }

    let elapsed = now.checked_sub(last_outflow_time).ok_or_else(|| {
        EngineError::InvariantViolation(format!(
            "elapsed time overflows: now {now}, last outflow {last_outflow_time}"
        ))
    })?;
    if elapsed < 0 {
        return Err(EngineError::InvariantViolation(format!(
            "now {now} is before last outflow time {last_outflow_time}"
        )));
    }
    if flow_rate < 0 {
        return Err(EngineError::InvariantViolation(format!(
            "negative flow rate {flow_rate}"
        )));
    }

    let claimable = (elapsed as u128)
        .checked_mul(flow_rate as u128)
        .ok_or_else(|| {
            EngineError::InvariantViolation(format!(
                "accrual overflows: {elapsed}s at {flow_rate}/s"
            ))
        })?;
    if claimable > deposit {
        return Err(EngineError::InvariantViolation(format!(
            "claimable {claimable} exceeds deposit {deposit}"
        )));
    }

    Ok(Accrual {
        claimable,
        remaining: deposit - claimable,
    })
}

/// Splits `amount` into the receiver's share and the validator fee.
///
/// The fee is `floor(amount * fee)`; a zero fee skips the multiplication.
pub fn split_validator_fee(fee: &FeeRate, amount: u128) -> FeeSplit {
    if fee.is_zero() {
        return FeeSplit {
            receiver_amount: amount,
            validator_fee: 0,
        };
    }

    let validator_fee = fee.mul_truncate(amount);
    FeeSplit {
        receiver_amount: amount - validator_fee,
        validator_fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_claimable_before_depletion() {
        let accrual = amount_claimable(1_500, 2_000, 1_000, 1_000, 1).unwrap();
        assert_eq!(accrual.claimable, 500);
        assert_eq!(accrual.remaining, 500);
    }

    #[test]
    fn test_claimable_at_and_after_depletion_is_everything() {
        let accrual = amount_claimable(2_000, 2_000, 1_000, 1_000, 1).unwrap();
        assert_eq!(accrual, Accrual { claimable: 1_000, remaining: 0 });

        // Deposit already partly claimed; rate no longer matters.
        let accrual = amount_claimable(9_999, 2_000, 1_500, 500, 1).unwrap();
        assert_eq!(accrual, Accrual { claimable: 500, remaining: 0 });
    }

    #[test]
    fn test_no_elapsed_time_claims_nothing() {
        let accrual = amount_claimable(1_000, 2_000, 1_000, 1_000, 1).unwrap();
        assert_eq!(accrual, Accrual { claimable: 0, remaining: 1_000 });
    }

    #[test]
    fn test_time_going_backwards_is_invariant_violation() {
        let result = amount_claimable(900, 2_000, 1_000, 1_000, 1);
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_accrual_beyond_deposit_is_invariant_violation() {
        // depletion_time inconsistent with deposit / rate
        let result = amount_claimable(1_500, 5_000, 1_000, 100, 1);
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_accrual_overflow_is_invariant_violation() {
        let result = amount_claimable(i64::MAX - 1, i64::MAX, 0, u128::MAX, i64::MAX);
        assert!(result.is_ok());

        let result = amount_claimable(1, i64::MAX, i64::MIN, u128::MAX, 2);
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_split_validator_fee() {
        let fee = FeeRate::from_str("0.01").unwrap();
        let split = split_validator_fee(&fee, 500);
        assert_eq!(split.validator_fee, 5);
        assert_eq!(split.receiver_amount, 495);

        let split = split_validator_fee(&fee, 99);
        assert_eq!(split.validator_fee, 0);
        assert_eq!(split.receiver_amount, 99);
    }

    #[test]
    fn test_zero_fee_passes_everything_through() {
        let split = split_validator_fee(&FeeRate::ZERO, 12_345);
        assert_eq!(split, FeeSplit { receiver_amount: 12_345, validator_fee: 0 });
    }
}
