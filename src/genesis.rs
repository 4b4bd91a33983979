//! Genesis export and import of the full module state.

use crate::bank::Bank;
use crate::coin::Address;
use crate::engine::{validate_pair, StreamEngine};
use crate::error::{EngineError, Result};
use crate::event::EventSink;
use crate::params::Params;
use crate::store::StreamStore;
use crate::stream::{Stream, StreamKey};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One exported stream record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamExport {
    pub receiver: Address,
    pub sender: Address,
    pub stream: Stream,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub streams: Vec<StreamExport>,
}

impl GenesisState {
    pub fn new(params: Params, streams: Vec<StreamExport>) -> Self {
        GenesisState { params, streams }
    }

    /// Stateless checks: params, addresses, flow rates, duplicate pairs.
    pub fn validate(&self) -> Result<()> {
        self.params
            .validate()
            .map_err(|e| EngineError::InvalidGenesis(format!("params: {e}")))?;

        let mut seen = BTreeSet::new();
        for export in &self.streams {
            if export.receiver.is_empty() || export.sender.is_empty() {
                return Err(EngineError::InvalidGenesis(
                    "stream with empty receiver or sender".into(),
                ));
            }
            if export.receiver == export.sender {
                return Err(EngineError::InvalidGenesis(format!(
                    "stream from {} to itself",
                    export.sender
                )));
            }
            if export.stream.flow_rate <= 0 {
                return Err(EngineError::InvalidGenesis(format!(
                    "stream {} -> {} has flow rate {}",
                    export.sender, export.receiver, export.stream.flow_rate
                )));
            }
            if export.stream.deposit.denom.is_empty() {
                return Err(EngineError::InvalidGenesis(format!(
                    "stream {} -> {} has no denomination",
                    export.sender, export.receiver
                )));
            }
            if !seen.insert(StreamKey::new(&export.receiver, &export.sender)) {
                return Err(EngineError::InvalidGenesis(format!(
                    "duplicate stream {} -> {}",
                    export.sender, export.receiver
                )));
            }
        }
        Ok(())
    }

    /// Sum of deposits per denom.
    fn total_deposits(&self) -> Result<BTreeMap<String, u128>> {
        let mut totals: BTreeMap<String, u128> = BTreeMap::new();
        for export in &self.streams {
            let deposit = &export.stream.deposit;
            if deposit.is_zero() {
                continue;
            }
            let entry = totals.entry(deposit.denom.clone()).or_insert(0);
            *entry = entry.checked_add(deposit.amount).ok_or_else(|| {
                EngineError::InvalidGenesis(format!("total {} deposits overflow", deposit.denom))
            })?;
        }
        Ok(totals)
    }
}

impl<S, B, E> StreamEngine<S, B, E>
where
    S: StreamStore,
    B: Bank,
    E: EventSink,
{
    /// Snapshot of params and every stream, in key order.
    pub fn export_genesis(&self) -> GenesisState {
        let streams = self
            .store()
            .iter_all()
            .map(|(key, stream)| StreamExport {
                receiver: key.receiver,
                sender: key.sender,
                stream,
            })
            .collect();
        GenesisState::new(self.params(), streams)
    }

    /// Replaces params and all streams with `genesis`.
    ///
    /// The pool account must already hold exactly the sum of the imported
    /// deposits; nothing is written otherwise.
    pub fn init_genesis(&mut self, genesis: &GenesisState) -> Result<()> {
        genesis.validate()?;
        for export in &genesis.streams {
            validate_pair(self.config(), &export.receiver, &export.sender)
                .map_err(|e| EngineError::InvalidGenesis(e.to_string()))?;
        }

        let expected = genesis.total_deposits()?;
        let pool_balance = self.bank().balances(&self.config().pool_account);
        if pool_balance != expected {
            return Err(EngineError::InvalidGenesis(format!(
                "pool account {} holds {:?}, streams hold {:?}",
                self.config().pool_account,
                pool_balance,
                expected
            )));
        }

        let store = self.store_mut();
        store.clear_streams();
        store.set_params(genesis.params.clone());
        for export in &genesis.streams {
            store.set(&export.receiver, &export.sender, export.stream.clone());
        }

        info!(
            "Imported genesis: {} streams, validator fee {}",
            genesis.streams.len(),
            genesis.params.validator_fee
        );
        Ok(())
    }
}
