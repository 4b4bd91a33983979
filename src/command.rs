//! Replay command models for CSV parsing and internal representation.

use crate::coin::{Address, Coin};
use crate::period::{flow_rate_for_period, StreamPeriod};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Raw command record as read from CSV.
///
/// Every column except `type` and `time` is optional; which ones a command
/// needs depends on its type.
#[derive(Debug, Deserialize)]
pub struct CommandRecord {
    /// mint, open, create, top_up, claim, set_flow_rate, cancel, set_params
    #[serde(rename = "type")]
    pub cmd_type: String,

    /// Block time in unix seconds
    pub time: i64,

    pub receiver: Option<String>,

    /// Sender, or the authority for set_params
    pub sender: Option<String>,

    /// A coin (`1000nund`), a bare denom for create, or the fee for set_params
    pub amount: Option<String>,

    /// Integer units per second, or `<count><period>` (e.g. `30day`) for open
    pub flow_rate: Option<String>,

    pub cancellable: Option<bool>,
}

impl CommandRecord {
    /// Parses the raw CSV record into a typed command.
    ///
    /// Returns a description of the problem if the record is unusable
    /// (unknown type, missing column, malformed value).
    pub fn parse(&self) -> Result<ParsedCommand, String> {
        let cmd_type = self.cmd_type.trim().to_lowercase();

        let kind = match cmd_type.as_str() {
            "mint" => CommandKind::Mint {
                account: self.address("receiver", &self.receiver)?,
                coin: self.coin()?,
            },
            "open" => {
                let deposit = self.coin()?;
                let flow_rate = self.flow_rate_for_deposit(&deposit)?;
                CommandKind::Open {
                    receiver: self.address("receiver", &self.receiver)?,
                    sender: self.address("sender", &self.sender)?,
                    deposit,
                    flow_rate,
                    cancellable: self.cancellable.unwrap_or(true),
                }
            }
            "create" => CommandKind::Create {
                receiver: self.address("receiver", &self.receiver)?,
                sender: self.address("sender", &self.sender)?,
                denom: self.field("amount", &self.amount)?.to_string(),
                flow_rate: self.flow_rate()?,
                cancellable: self.cancellable.unwrap_or(true),
            },
            "top_up" => CommandKind::TopUp {
                receiver: self.address("receiver", &self.receiver)?,
                sender: self.address("sender", &self.sender)?,
                deposit: self.coin()?,
            },
            "claim" => CommandKind::Claim {
                receiver: self.address("receiver", &self.receiver)?,
                sender: self.address("sender", &self.sender)?,
            },
            "set_flow_rate" => CommandKind::SetFlowRate {
                receiver: self.address("receiver", &self.receiver)?,
                sender: self.address("sender", &self.sender)?,
                flow_rate: self.flow_rate()?,
            },
            "cancel" => CommandKind::Cancel {
                receiver: self.address("receiver", &self.receiver)?,
                sender: self.address("sender", &self.sender)?,
            },
            "set_params" => CommandKind::SetParams {
                authority: self.address("sender", &self.sender)?,
                fee: match non_empty(&self.amount) {
                    Some(raw) => Some(
                        Decimal::from_str(raw).map_err(|e| format!("invalid fee {raw:?}: {e}"))?,
                    ),
                    None => None,
                },
            },
            other => return Err(format!("unknown command type {other:?}")),
        };

        Ok(ParsedCommand {
            time: self.time,
            kind,
        })
    }

    fn field<'a>(&self, name: &str, value: &'a Option<String>) -> Result<&'a str, String> {
        non_empty(value).ok_or_else(|| format!("{} requires {}", self.cmd_type.trim(), name))
    }

    fn address(&self, name: &str, value: &Option<String>) -> Result<Address, String> {
        self.field(name, value).map(Address::from)
    }

    fn coin(&self) -> Result<Coin, String> {
        let raw = self.field("amount", &self.amount)?;
        Coin::from_str(raw).map_err(|e| e.to_string())
    }

    fn flow_rate(&self) -> Result<i64, String> {
        let raw = self.field("flow_rate", &self.flow_rate)?;
        raw.parse::<i64>()
            .map_err(|e| format!("invalid flow_rate {raw:?}: {e}"))
    }

    /// Accepts either a plain rate or `<count><period>`, the latter meaning
    /// "spend the deposit over count periods".
    fn flow_rate_for_deposit(&self, deposit: &Coin) -> Result<i64, String> {
        let raw = self.field("flow_rate", &self.flow_rate)?;
        if let Ok(rate) = raw.parse::<i64>() {
            return Ok(rate);
        }

        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        let (digits, name) = raw.split_at(split);
        let count = digits
            .parse::<u64>()
            .map_err(|_| format!("invalid flow_rate {raw:?}"))?;
        let period = StreamPeriod::from_str(name.trim()).unwrap_or(StreamPeriod::Unspecified);
        if period == StreamPeriod::Unspecified {
            return Err(format!("unknown period in flow_rate {raw:?}"));
        }

        let (_, rate) = flow_rate_for_period(deposit, period, count);
        Ok(rate)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A parsed and validated command ready for replay.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    /// Block time the command executes at
    pub time: i64,

    pub kind: CommandKind,
}

/// Command variants with associated data.
#[derive(Debug, Clone)]
pub enum CommandKind {
    /// Credit funds to an account out of thin air.
    Mint { account: Address, coin: Coin },

    Open {
        receiver: Address,
        sender: Address,
        deposit: Coin,
        flow_rate: i64,
        cancellable: bool,
    },

    Create {
        receiver: Address,
        sender: Address,
        denom: String,
        flow_rate: i64,
        cancellable: bool,
    },

    TopUp {
        receiver: Address,
        sender: Address,
        deposit: Coin,
    },

    Claim { receiver: Address, sender: Address },

    SetFlowRate {
        receiver: Address,
        sender: Address,
        flow_rate: i64,
    },

    Cancel { receiver: Address, sender: Address },

    /// `fee` is `None` when the column is empty, which the engine rejects.
    SetParams {
        authority: Address,
        fee: Option<Decimal>,
    },
}
