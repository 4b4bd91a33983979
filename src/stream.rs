//! Stream record model.
//!
//! A stream is identified by its (receiver, sender) pair and is never
//! "ticked": accrual is derived on demand from `last_outflow_time`,
//! `depletion_time` and `flow_rate`.

use crate::coin::{Address, Coin};
use serde::{Deserialize, Serialize};

/// Depletion time given to a freshly created, unfunded stream.
///
/// Earlier than any block time, so an unfunded stream always reads as
/// depleted and the first top-up starts it from `now`.
pub const UNFUNDED_DEPLETION_TIME: i64 = i64::MIN;

/// Storage key for a stream: receiver first, then sender.
///
/// Ordering is receiver-major, which is what `iter_by_receiver` scans on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamKey {
    pub receiver: Address,
    pub sender: Address,
}

impl StreamKey {
    pub fn new(receiver: &Address, sender: &Address) -> Self {
        StreamKey {
            receiver: receiver.clone(),
            sender: sender.clone(),
        }
    }
}

/// One payment stream from a sender to a receiver.
///
/// # Invariants
///
/// - `deposit.amount >= 0` (enforced by the unsigned type)
/// - `flow_rate > 0` for every stream created through the engine
/// - while funded, `depletion_time` is where the deposit runs out at the
///   current rate, assuming no further top-ups or rate changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    /// Remaining, not yet claimed reserve.
    pub deposit: Coin,

    /// Units of `deposit.denom` per second.
    pub flow_rate: i64,

    /// Unix seconds up to which accrual has been settled.
    pub last_outflow_time: i64,

    /// Unix seconds at which `deposit` is projected to reach zero.
    pub depletion_time: i64,

    /// Whether the stream may be cancelled. Fixed at creation.
    pub cancellable: bool,

    pub create_time: i64,

    pub last_updated_time: i64,

    /// Cumulative claimed total, validator fees included.
    pub total_streamed: Coin,
}

impl Stream {
    /// Creates an empty stream of `denom` at `now`.
    pub fn new(denom: &str, flow_rate: i64, cancellable: bool, now: i64) -> Self {
        Stream {
            deposit: Coin::zero(denom),
            flow_rate,
            last_outflow_time: now,
            depletion_time: UNFUNDED_DEPLETION_TIME,
            cancellable,
            create_time: now,
            last_updated_time: now,
            total_streamed: Coin::zero(denom),
        }
    }

    pub fn denom(&self) -> &str {
        &self.deposit.denom
    }

    pub fn has_deposit(&self) -> bool {
        !self.deposit.is_zero()
    }

    /// Returns `true` once `now` has reached the projected depletion time.
    pub fn is_depleted(&self, now: i64) -> bool {
        now >= self.depletion_time
    }
}
