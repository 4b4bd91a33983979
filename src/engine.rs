//! Stream lifecycle engine.
//!
//! Composes the accrual math, the stream store and the token ledger into the
//! operations that mutate streams: create, top-up, claim, flow-rate change,
//! cancel, and params update. Every operation takes the current block time
//! explicitly and validates before it writes, so a failed call leaves the
//! store and the ledger untouched.
//!
//! Top-up, flow-rate change and cancel settle accrued value first by calling
//! [`StreamEngine::claim`] directly and re-reading the record.

use crate::accrual::{amount_claimable, split_validator_fee, Accrual};
use crate::bank::{Bank, InsufficientFunds, MemoryBank};
use crate::coin::{Address, Coin};
use crate::command::{CommandKind, CommandRecord, ParsedCommand};
use crate::decimal::duration_for;
use crate::error::{EngineError, Result};
use crate::event::{EventSink, StreamEvent};
use crate::invariant::{check_deposits, InvariantReport};
use crate::params::Params;
use crate::store::{MemoryStore, StreamStore};
use crate::stream::{Stream, StreamKey};
use csv::{ReaderBuilder, Trim};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::io::{Read, Write};

/// Accounts and limits the engine is wired to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Account holding every outstanding deposit.
    pub pool_account: Address,
    /// Account receiving validator fees.
    pub fee_collector: Address,
    /// Only this account may update params.
    pub authority: Address,
    /// Minimum seconds the first deposit of [`StreamEngine::open_stream`] must last.
    pub min_stream_duration: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pool_account: Address::new("stream"),
            fee_collector: Address::new("fee_collector"),
            authority: Address::new("gov"),
            min_stream_duration: 60,
        }
    }
}

/// Result of a claim, explicit or implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    /// Everything settled from the deposit, fee included.
    pub total: Coin,
    pub receiver_amount: Coin,
    pub validator_fee: Coin,
    pub remaining_deposit: Coin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUpOutcome {
    pub deposit: Coin,
    pub current_deposit: Coin,
    pub duration: i64,
    pub depletion_time: i64,
    /// Set when a fully depleted deposit was flushed to the receiver first.
    pub claimed: Option<ClaimOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRateOutcome {
    pub old_flow_rate: i64,
    pub new_flow_rate: i64,
    pub duration: i64,
    pub depletion_time: i64,
    pub claimed: Option<ClaimOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    pub refunded: Coin,
    pub claimed: Option<ClaimOutcome>,
}

/// The stream engine.
///
/// Owns its store, token ledger and event sink; `&mut self` gives each
/// operation exclusive access for its duration. There is no clock: callers
/// pass the block time.
pub struct StreamEngine<S = MemoryStore, B = MemoryBank, E = Vec<StreamEvent>> {
    store: S,
    bank: B,
    events: E,
    config: EngineConfig,
}

impl StreamEngine<MemoryStore, MemoryBank, Vec<StreamEvent>> {
    /// Creates an empty in-memory engine with the default config.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an empty in-memory engine.
    pub fn with_config(config: EngineConfig) -> Self {
        StreamEngine::from_parts(MemoryStore::new(), MemoryBank::new(), Vec::new(), config)
    }
}

impl Default for StreamEngine<MemoryStore, MemoryBank, Vec<StreamEvent>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B, E> StreamEngine<S, B, E> {
    pub fn from_parts(store: S, bank: B, events: E, config: EngineConfig) -> Self {
        StreamEngine {
            store,
            bank,
            events,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// Direct ledger access, e.g. to fund accounts. Moving pool funds here
    /// breaks the deposits invariant.
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub fn events(&self) -> &E {
        &self.events
    }
}

impl<S, B, E> StreamEngine<S, B, E>
where
    S: StreamStore,
    B: Bank,
    E: EventSink,
{
    /// Creates an empty stream. Funds arrive with the first [`top_up`](Self::top_up).
    pub fn create(
        &mut self,
        now: i64,
        receiver: &Address,
        sender: &Address,
        denom: &str,
        flow_rate: i64,
        cancellable: bool,
    ) -> Result<Stream> {
        validate_pair(&self.config, receiver, sender)?;
        if self.store.exists(receiver, sender) {
            return Err(EngineError::AlreadyExists {
                receiver: receiver.clone(),
                sender: sender.clone(),
            });
        }
        if flow_rate <= 0 {
            return Err(EngineError::InvalidFlowRate(flow_rate));
        }
        if denom.trim().is_empty() {
            return Err(EngineError::InvalidAmount("denomination is empty".into()));
        }

        let stream = Stream::new(denom, flow_rate, cancellable, now);
        self.store.set(receiver, sender, stream.clone());

        debug!(
            "Created stream {} -> {} at {}/s ({})",
            sender,
            receiver,
            flow_rate,
            stream.denom()
        );
        self.events.emit(StreamEvent::Created {
            receiver: receiver.clone(),
            sender: sender.clone(),
            flow_rate,
            cancellable,
        });

        Ok(stream)
    }

    /// Adds `deposit` to a stream and pushes its depletion time out.
    ///
    /// A depleted stream that still holds a deposit is claimed first, then
    /// restarts from `now`. A live stream is extended by the new deposit's
    /// duration.
    pub fn top_up(
        &mut self,
        now: i64,
        receiver: &Address,
        sender: &Address,
        deposit: &Coin,
    ) -> Result<TopUpOutcome> {
        let stream = self.load(receiver, sender)?;
        if deposit.is_zero() {
            return Err(EngineError::InvalidAmount("deposit must be > 0".into()));
        }
        if deposit.denom != stream.deposit.denom {
            return Err(EngineError::InvalidAmount(format!(
                "top up denom does not match stream denom. stream: {}, top up: {}",
                stream.deposit.denom, deposit.denom
            )));
        }
        let duration = duration_for(deposit.amount, stream.flow_rate)
            .ok_or(EngineError::InvalidFlowRate(stream.flow_rate))?;
        if stream.deposit.amount.checked_add(deposit.amount).is_none() {
            return Err(EngineError::InvalidAmount(format!(
                "deposit {} would overflow stream deposit {}",
                deposit, stream.deposit
            )));
        }

        let flush = stream.is_depleted(now) && stream.has_deposit();
        if flush {
            self.ensure_pool_covers(&stream.deposit)?;
            self.ensure_credit_fits(receiver, &stream.deposit)?;
            self.ensure_credit_fits(&self.config.fee_collector, &stream.deposit)?;
        }

        // Underfunded senders must fail before any write.
        self.bank
            .move_funds(sender, &self.config.pool_account, deposit)?;

        let claimed = if flush {
            Some(self.claim(now, receiver, sender)?)
        } else {
            None
        };
        let mut stream = if flush {
            self.load(receiver, sender)?
        } else {
            stream
        };

        if stream.is_depleted(now) || !stream.has_deposit() {
            stream.depletion_time = now.saturating_add(duration);
            stream.last_outflow_time = now;
        } else {
            stream.depletion_time = stream.depletion_time.saturating_add(duration);
        }
        stream.deposit.amount = stream
            .deposit
            .amount
            .checked_add(deposit.amount)
            .ok_or_else(|| EngineError::InvariantViolation("deposit overflow".into()))?;
        stream.last_updated_time = now;
        self.store.set(receiver, sender, stream.clone());

        debug!(
            "Deposited {} to stream {} -> {}, depletes at {}",
            deposit, sender, receiver, stream.depletion_time
        );
        self.events.emit(StreamEvent::Deposited {
            receiver: receiver.clone(),
            sender: sender.clone(),
            deposit: deposit.clone(),
            duration,
            depletion_time: stream.depletion_time,
        });

        Ok(TopUpOutcome {
            deposit: deposit.clone(),
            current_deposit: stream.deposit,
            duration,
            depletion_time: stream.depletion_time,
            claimed,
        })
    }

    /// Settles everything accrued since the last outflow.
    ///
    /// The validator fee goes to the fee collector, the rest to the receiver.
    /// Zero-amount transfers are skipped.
    pub fn claim(&mut self, now: i64, receiver: &Address, sender: &Address) -> Result<ClaimOutcome> {
        let mut stream = self.load(receiver, sender)?;
        if !stream.has_deposit() {
            return Err(EngineError::ZeroDeposit);
        }

        let accrual = amount_claimable(
            now,
            stream.depletion_time,
            stream.last_outflow_time,
            stream.deposit.amount,
            stream.flow_rate,
        )?;
        let split = split_validator_fee(&self.params().validator_fee, accrual.claimable);

        let denom = stream.deposit.denom.clone();
        let total = Coin::new(denom.as_str(), accrual.claimable);
        let validator_fee = Coin::new(denom.as_str(), split.validator_fee);
        let receiver_amount = Coin::new(denom.as_str(), split.receiver_amount);

        self.ensure_pool_covers(&total)?;
        if *receiver == self.config.fee_collector {
            self.ensure_credit_fits(receiver, &total)?;
        } else {
            self.ensure_credit_fits(&self.config.fee_collector, &validator_fee)?;
            self.ensure_credit_fits(receiver, &receiver_amount)?;
        }
        if !validator_fee.is_zero() {
            self.bank.move_funds(
                &self.config.pool_account,
                &self.config.fee_collector,
                &validator_fee,
            )?;
        }
        if !receiver_amount.is_zero() {
            self.bank
                .move_funds(&self.config.pool_account, receiver, &receiver_amount)?;
        }

        stream.deposit.amount = accrual.remaining;
        stream.last_outflow_time = now;
        stream.last_updated_time = now;
        stream.total_streamed.amount = stream
            .total_streamed
            .amount
            .saturating_add(accrual.claimable);
        let remaining_deposit = stream.deposit.clone();
        self.store.set(receiver, sender, stream);

        debug!(
            "Claimed {} from stream {} -> {} (fee {}, remaining {})",
            total, sender, receiver, validator_fee, remaining_deposit
        );
        self.events.emit(StreamEvent::Claimed {
            receiver: receiver.clone(),
            sender: sender.clone(),
            total: total.clone(),
            receiver_amount: receiver_amount.clone(),
            validator_fee: validator_fee.clone(),
            remaining_deposit: remaining_deposit.clone(),
        });

        Ok(ClaimOutcome {
            total,
            receiver_amount,
            validator_fee,
            remaining_deposit,
        })
    }

    /// Changes the flow rate after settling accrual at the old rate.
    pub fn set_flow_rate(
        &mut self,
        now: i64,
        receiver: &Address,
        sender: &Address,
        new_flow_rate: i64,
    ) -> Result<FlowRateOutcome> {
        let mut stream = self.load(receiver, sender)?;
        if new_flow_rate <= 0 {
            return Err(EngineError::InvalidFlowRate(new_flow_rate));
        }
        let old_flow_rate = stream.flow_rate;

        let claimed = if stream.has_deposit() {
            let outcome = self.claim(now, receiver, sender)?;
            stream = self.load(receiver, sender)?;
            Some(outcome)
        } else {
            None
        };

        let duration = duration_for(stream.deposit.amount, new_flow_rate).unwrap_or(0);
        stream.flow_rate = new_flow_rate;
        stream.depletion_time = now.saturating_add(duration);
        stream.last_updated_time = now;
        self.store.set(receiver, sender, stream.clone());

        debug!(
            "Flow rate of stream {} -> {} changed {} -> {}, depletes at {}",
            sender, receiver, old_flow_rate, new_flow_rate, stream.depletion_time
        );
        self.events.emit(StreamEvent::FlowRateUpdated {
            receiver: receiver.clone(),
            sender: sender.clone(),
            old_flow_rate,
            new_flow_rate,
            duration,
            depletion_time: stream.depletion_time,
        });

        Ok(FlowRateOutcome {
            old_flow_rate,
            new_flow_rate,
            duration,
            depletion_time: stream.depletion_time,
            claimed,
        })
    }

    /// Settles accrual, refunds what is left to the sender and deletes the stream.
    pub fn cancel(&mut self, now: i64, receiver: &Address, sender: &Address) -> Result<CancelOutcome> {
        let mut stream = self.load(receiver, sender)?;
        if !stream.cancellable {
            return Err(EngineError::NotCancellable);
        }

        let claimed = if stream.has_deposit() {
            self.ensure_pool_covers(&stream.deposit)?;
            self.ensure_credit_fits(sender, &stream.deposit)?;
            let outcome = self.claim(now, receiver, sender)?;
            stream = self.load(receiver, sender)?;
            Some(outcome)
        } else {
            None
        };

        let refunded = stream.deposit;
        if !refunded.is_zero() {
            self.bank
                .move_funds(&self.config.pool_account, sender, &refunded)?;
        }
        self.store.delete(receiver, sender);

        debug!(
            "Cancelled stream {} -> {}, refunded {}",
            sender, receiver, refunded
        );
        self.events.emit(StreamEvent::Cancelled {
            receiver: receiver.clone(),
            sender: sender.clone(),
            refunded: refunded.clone(),
        });

        Ok(CancelOutcome { refunded, claimed })
    }

    /// Replaces the params. Only the configured authority may do this.
    pub fn set_params(&mut self, authority: &Address, validator_fee: Option<Decimal>) -> Result<Params> {
        if *authority != self.config.authority {
            return Err(EngineError::Unauthorized {
                expected: self.config.authority.clone(),
                got: authority.clone(),
            });
        }
        let params = Params::from_fee(validator_fee)?;
        self.store.set_params(params.clone());

        info!("Validator fee set to {}", params.validator_fee);
        Ok(params)
    }

    /// Creates a stream and funds it in one call.
    ///
    /// Everything `create` and `top_up` would reject is rejected up front,
    /// along with deposits that would not last `min_stream_duration` and
    /// senders who cannot cover the deposit. Nothing is written on failure.
    pub fn open_stream(
        &mut self,
        now: i64,
        receiver: &Address,
        sender: &Address,
        deposit: &Coin,
        flow_rate: i64,
        cancellable: bool,
    ) -> Result<TopUpOutcome> {
        validate_pair(&self.config, receiver, sender)?;
        if self.store.exists(receiver, sender) {
            return Err(EngineError::AlreadyExists {
                receiver: receiver.clone(),
                sender: sender.clone(),
            });
        }
        if deposit.is_zero() || deposit.denom.trim().is_empty() {
            return Err(EngineError::InvalidAmount(format!(
                "deposit must be > 0: {deposit}"
            )));
        }
        let duration =
            duration_for(deposit.amount, flow_rate).ok_or(EngineError::InvalidFlowRate(flow_rate))?;
        if duration < self.config.min_stream_duration {
            return Err(EngineError::DurationTooShort {
                duration,
                minimum: self.config.min_stream_duration,
            });
        }
        let available = self.bank.balance_of(sender, &deposit.denom);
        if available < deposit.amount {
            return Err(InsufficientFunds {
                account: sender.clone(),
                denom: deposit.denom.clone(),
                available,
                required: deposit.amount,
            }
            .into());
        }

        self.create(now, receiver, sender, &deposit.denom, flow_rate, cancellable)?;
        self.top_up(now, receiver, sender, deposit)
    }

    /// Current params, or the defaults if none were ever stored.
    pub fn params(&self) -> Params {
        self.store.params().unwrap_or_default()
    }

    pub fn stream(&self, receiver: &Address, sender: &Address) -> Option<Stream> {
        self.store.get(receiver, sender)
    }

    /// All streams in key order.
    pub fn streams(&self) -> Vec<(StreamKey, Stream)> {
        self.store.iter_all().collect()
    }

    pub fn streams_by_receiver(&self, receiver: &Address) -> Vec<(StreamKey, Stream)> {
        self.store.iter_by_receiver(receiver).collect()
    }

    pub fn streams_by_sender(&self, sender: &Address) -> Vec<(StreamKey, Stream)> {
        self.store.iter_by_sender(sender).collect()
    }

    /// What a claim at `now` would settle, without settling it.
    pub fn accrued(&self, now: i64, receiver: &Address, sender: &Address) -> Result<Accrual> {
        let stream = self.load(receiver, sender)?;
        amount_claimable(
            now,
            stream.depletion_time,
            stream.last_outflow_time,
            stream.deposit.amount,
            stream.flow_rate,
        )
    }

    /// Runs the pool-balance vs. deposits invariant.
    pub fn check_invariants(&self) -> InvariantReport {
        check_deposits(&self.store, &self.bank, &self.config.pool_account)
    }

    fn load(&self, receiver: &Address, sender: &Address) -> Result<Stream> {
        self.store
            .get(receiver, sender)
            .ok_or_else(|| EngineError::NotFound {
                receiver: receiver.clone(),
                sender: sender.clone(),
            })
    }

    fn ensure_pool_covers(&self, coin: &Coin) -> Result<()> {
        let available = self.bank.balance_of(&self.config.pool_account, &coin.denom);
        if available < coin.amount {
            return Err(InsufficientFunds {
                account: self.config.pool_account.clone(),
                denom: coin.denom.clone(),
                available,
                required: coin.amount,
            }
            .into());
        }
        Ok(())
    }

    fn ensure_credit_fits(&self, account: &Address, coin: &Coin) -> Result<()> {
        if self
            .bank
            .balance_of(account, &coin.denom)
            .checked_add(coin.amount)
            .is_none()
        {
            return Err(EngineError::BalanceOverflow {
                account: account.clone(),
                denom: coin.denom.clone(),
                amount: coin.amount,
            });
        }
        Ok(())
    }

    /// Writes final stream states to CSV.
    ///
    /// Output is in key order (receiver, then sender) for deterministic results.
    pub fn write_output<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "receiver",
            "sender",
            "deposit",
            "flow_rate",
            "last_outflow_time",
            "depletion_time",
            "cancellable",
        ])?;

        for (key, stream) in self.store.iter_all() {
            csv_writer.write_record([
                key.receiver.to_string(),
                key.sender.to_string(),
                stream.deposit.to_string(),
                stream.flow_rate.to_string(),
                stream.last_outflow_time.to_string(),
                stream.depletion_time.to_string(),
                stream.cancellable.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

impl<S, E> StreamEngine<S, MemoryBank, E>
where
    S: StreamStore,
    E: EventSink,
{
    /// Replays a CSV command log in file order.
    ///
    /// Records are read one at a time. Invalid or rejected commands are
    /// logged at warn level and skipped, as are commands whose time is
    /// earlier than the previous command's.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut last_time: Option<i64> = None;

        for (row_idx, result) in csv_reader.deserialize::<CommandRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let command = match result {
                Ok(record) => match record.parse() {
                    Ok(command) => command,
                    Err(message) => {
                        warn!("{}", EngineError::InvalidRecord { row: row_num, message });
                        continue;
                    }
                },
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                    continue;
                }
            };

            if let Some(previous) = last_time {
                if command.time < previous {
                    warn!(
                        "Row {}: time {} is before previous command time {}, ignoring",
                        row_num, command.time, previous
                    );
                    continue;
                }
            }
            last_time = Some(command.time);

            if let Err(e) = self.apply_command(command) {
                warn!("Row {}: {}", row_num, e);
            }
        }

        let report = self.check_invariants();
        if report.broken {
            warn!("{}", report.message);
        } else {
            debug!("{}", report.message);
        }

        Ok(())
    }

    /// Applies a single parsed command.
    pub fn apply_command(&mut self, command: ParsedCommand) -> Result<()> {
        let now = command.time;
        match command.kind {
            CommandKind::Mint { account, coin } => {
                self.bank.mint(&account, &coin);
                debug!("Minted {} to {}", coin, account);
            }
            CommandKind::Open {
                receiver,
                sender,
                deposit,
                flow_rate,
                cancellable,
            } => {
                self.open_stream(now, &receiver, &sender, &deposit, flow_rate, cancellable)?;
            }
            CommandKind::Create {
                receiver,
                sender,
                denom,
                flow_rate,
                cancellable,
            } => {
                self.create(now, &receiver, &sender, &denom, flow_rate, cancellable)?;
            }
            CommandKind::TopUp {
                receiver,
                sender,
                deposit,
            } => {
                self.top_up(now, &receiver, &sender, &deposit)?;
            }
            CommandKind::Claim { receiver, sender } => {
                self.claim(now, &receiver, &sender)?;
            }
            CommandKind::SetFlowRate {
                receiver,
                sender,
                flow_rate,
            } => {
                self.set_flow_rate(now, &receiver, &sender, flow_rate)?;
            }
            CommandKind::Cancel { receiver, sender } => {
                self.cancel(now, &receiver, &sender)?;
            }
            CommandKind::SetParams { authority, fee } => {
                self.set_params(&authority, fee)?;
            }
        }
        Ok(())
    }
}

/// Rejects empty addresses, self-streams, and streams touching the engine's
/// own accounts: the pool can be neither party, the fee collector cannot send.
pub(crate) fn validate_pair(config: &EngineConfig, receiver: &Address, sender: &Address) -> Result<()> {
    if receiver.is_empty() || sender.is_empty() {
        return Err(EngineError::InvalidAddress(
            "sender and receiver must be non-empty".into(),
        ));
    }
    if receiver == sender {
        return Err(EngineError::InvalidAddress(format!(
            "sender and receiver cannot be the same address: {sender}"
        )));
    }
    if *receiver == config.pool_account || *sender == config.pool_account {
        return Err(EngineError::InvalidAddress(format!(
            "{} is the stream pool account and cannot be a stream party",
            config.pool_account
        )));
    }
    if *sender == config.fee_collector {
        return Err(EngineError::InvalidAddress(format!(
            "{} is the fee collector and cannot send streams",
            config.fee_collector
        )));
    }
    Ok(())
}
