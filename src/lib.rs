//! # Stream Ledger
//!
//! Continuous payment streams between a sender and a receiver, with lazy
//! per-second accrual, validator-fee settlement and a pool-balance invariant.
//!
//! ## Design Principles
//!
//! - **Lazy accrual**: nothing happens per second; each stream stores its
//!   depletion time and claims compute what accrued in O(1)
//! - **Truncating arithmetic**: amounts are `u128` with checked math, the
//!   validator fee is a bounded `rust_decimal` rate that always rounds down
//! - **Strict invariants**: the pool account holds exactly the sum of all
//!   stream deposits
//! - **Explicit time**: every operation takes the block time as an argument
//!
//! ## Example
//!
//! ```no_run
//! use stream_ledger::{Address, Coin, StreamEngine};
//!
//! let mut engine = StreamEngine::new();
//! let (alice, bob) = (Address::from("alice"), Address::from("bob"));
//! engine.bank_mut().mint(&alice, &Coin::new("nund", 10_000));
//!
//! engine.open_stream(0, &bob, &alice, &Coin::new("nund", 3_600), 1, true).unwrap();
//! let claim = engine.claim(600, &bob, &alice).unwrap();
//! assert_eq!(claim.total, Coin::new("nund", 600));
//! ```

pub mod accrual;
pub mod bank;
pub mod coin;
pub mod command;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod event;
pub mod genesis;
pub mod invariant;
pub mod params;
pub mod period;
pub mod store;
pub mod stream;

pub use accrual::{amount_claimable, split_validator_fee, Accrual, FeeSplit};
pub use bank::{Bank, InsufficientFunds, MemoryBank, TransferError};
pub use coin::{Address, Coin};
pub use command::{CommandKind, CommandRecord, ParsedCommand};
pub use decimal::FeeRate;
pub use engine::{
    CancelOutcome, ClaimOutcome, EngineConfig, FlowRateOutcome, StreamEngine, TopUpOutcome,
};
pub use error::{EngineError, Result};
pub use event::{EventSink, StreamEvent};
pub use genesis::{GenesisState, StreamExport};
pub use invariant::InvariantReport;
pub use params::Params;
pub use period::{flow_rate_for_period, StreamPeriod};
pub use store::{MemoryStore, StreamStore};
pub use stream::{Stream, StreamKey};
