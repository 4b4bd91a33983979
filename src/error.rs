//! Error types for the stream ledger.

use crate::bank::{InsufficientFunds, TransferError};
use crate::coin::Address;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur during engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No stream exists for the (receiver, sender) pair
    #[error("stream does not exist: receiver {receiver}, sender {sender}")]
    NotFound { receiver: Address, sender: Address },

    /// A stream already exists for the (receiver, sender) pair
    #[error("stream already exists: receiver {receiver}, sender {sender}")]
    AlreadyExists { receiver: Address, sender: Address },

    /// Zero, empty-denom or denomination-mismatched amount
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Flow rate must be strictly positive
    #[error("invalid flow rate {0}: must be > 0")]
    InvalidFlowRate(i64),

    /// Claim attempted on a stream with nothing deposited
    #[error("stream deposit is zero")]
    ZeroDeposit,

    /// Cancel attempted on a stream created as non-cancellable
    #[error("stream not cancellable")]
    NotCancellable,

    /// Propagated from the token ledger
    #[error(transparent)]
    InsufficientFunds(#[from] InsufficientFunds),

    /// A transfer would push the destination balance past `u128::MAX`
    #[error("balance overflow: {account} cannot be credited {amount}{denom}")]
    BalanceOverflow {
        account: Address,
        denom: String,
        amount: u128,
    },

    /// Accounting state that should be unreachable
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Validator fee missing
    #[error("validator fee cannot be nil")]
    NilFee,

    /// Validator fee below zero
    #[error("validator fee cannot be negative: {0}")]
    NegativeFee(Decimal),

    /// Validator fee above 100%
    #[error("validator fee cannot be greater than 100%: {0}")]
    FeeExceedsOne(Decimal),

    /// Validator fee with more decimal places than supported
    #[error("validator fee has {0} decimal places, at most 18 are supported")]
    FeeTooPrecise(u32),

    /// Empty address, or sender and receiver are the same account
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Params update signed by someone other than the governance authority
    #[error("invalid authority; expected {expected}, got {got}")]
    Unauthorized { expected: Address, got: Address },

    /// Initial deposit would not last the configured minimum
    #[error("calculated duration too short: {duration}s, must be at least {minimum}s")]
    DurationTooShort { duration: i64, minimum: i64 },

    /// Genesis state is inconsistent
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid command record
    #[error("Invalid command at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Missing input file argument
    #[error("Missing input file argument. Usage: stream-ledger <commands.csv>")]
    MissingArgument,
}

impl From<TransferError> for EngineError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InsufficientFunds(e) => EngineError::InsufficientFunds(e),
            TransferError::BalanceOverflow {
                account,
                denom,
                amount,
            } => EngineError::BalanceOverflow {
                account,
                denom,
                amount,
            },
        }
    }
}
