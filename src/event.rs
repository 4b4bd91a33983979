//! Structured events emitted by mutating operations.
//!
//! Events are for off-chain indexing only; the engine never reads them back.

use crate::coin::{Address, Coin};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Created {
        receiver: Address,
        sender: Address,
        flow_rate: i64,
        cancellable: bool,
    },
    Deposited {
        receiver: Address,
        sender: Address,
        deposit: Coin,
        /// Seconds the deposit adds at the current flow rate.
        duration: i64,
        depletion_time: i64,
    },
    Claimed {
        receiver: Address,
        sender: Address,
        total: Coin,
        receiver_amount: Coin,
        validator_fee: Coin,
        remaining_deposit: Coin,
    },
    FlowRateUpdated {
        receiver: Address,
        sender: Address,
        old_flow_rate: i64,
        new_flow_rate: i64,
        duration: i64,
        depletion_time: i64,
    },
    Cancelled {
        receiver: Address,
        sender: Address,
        refunded: Coin,
    },
}

/// Receiver of engine events.
pub trait EventSink {
    fn emit(&mut self, event: StreamEvent);
}

impl EventSink for Vec<StreamEvent> {
    fn emit(&mut self, event: StreamEvent) {
        self.push(event);
    }
}
