//! Token ledger interface and an in-memory implementation.
//!
//! The engine only ever moves funds through `Bank`; it never holds balances
//! itself. The pool account is where outstanding deposits live.

use crate::coin::{Address, Coin};
use std::collections::BTreeMap;
use thiserror::Error;

/// Returned when an account cannot cover a transfer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("insufficient funds: {account} has {available}{denom}, needs {required}{denom}")]
pub struct InsufficientFunds {
    pub account: Address,
    pub denom: String,
    pub available: u128,
    pub required: u128,
}

/// Why a transfer was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error(transparent)]
    InsufficientFunds(#[from] InsufficientFunds),

    #[error("balance overflow: {account} cannot be credited {amount}{denom}")]
    BalanceOverflow {
        account: Address,
        denom: String,
        amount: u128,
    },
}

/// External token ledger used to move deposits, claims, fees and refunds.
pub trait Bank {
    /// Moves `coin` from `from` to `to`, all or nothing.
    fn move_funds(
        &mut self,
        from: &Address,
        to: &Address,
        coin: &Coin,
    ) -> std::result::Result<(), TransferError>;

    fn balance_of(&self, account: &Address, denom: &str) -> u128;

    /// All non-zero balances of `account`, keyed by denom.
    fn balances(&self, account: &Address) -> BTreeMap<String, u128>;
}

/// In-memory `Bank` keyed by (account, denom).
#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    balances: BTreeMap<(Address, String), u128>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `coin` to `account` out of thin air (genesis / test funding).
    ///
    /// Saturates rather than wrapping on overflow.
    pub fn mint(&mut self, account: &Address, coin: &Coin) {
        if coin.is_zero() {
            return;
        }
        let balance = self
            .balances
            .entry((account.clone(), coin.denom.clone()))
            .or_insert(0);
        *balance = balance.saturating_add(coin.amount);
    }
}

impl Bank for MemoryBank {
    fn move_funds(
        &mut self,
        from: &Address,
        to: &Address,
        coin: &Coin,
    ) -> std::result::Result<(), TransferError> {
        let available = self.balance_of(from, &coin.denom);
        if available < coin.amount {
            return Err(InsufficientFunds {
                account: from.clone(),
                denom: coin.denom.clone(),
                available,
                required: coin.amount,
            }
            .into());
        }
        if coin.is_zero() || from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(to, &coin.denom)
            .checked_add(coin.amount)
            .ok_or_else(|| TransferError::BalanceOverflow {
                account: to.clone(),
                denom: coin.denom.clone(),
                amount: coin.amount,
            })?;

        let from_key = (from.clone(), coin.denom.clone());
        let remaining = available - coin.amount;
        if remaining == 0 {
            self.balances.remove(&from_key);
        } else {
            self.balances.insert(from_key, remaining);
        }
        self.balances.insert((to.clone(), coin.denom.clone()), credited);
        Ok(())
    }

    fn balance_of(&self, account: &Address, denom: &str) -> u128 {
        self.balances
            .get(&(account.clone(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn balances(&self, account: &Address) -> BTreeMap<String, u128> {
        self.balances
            .iter()
            .filter(|((owner, _), amount)| owner == account && **amount > 0)
            .map(|((_, denom), amount)| (denom.clone(), *amount))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    #[test]
    fn test_mint_and_move() {
        let mut bank = MemoryBank::new();
        bank.mint(&addr("alice"), &Coin::new("nund", 100));

        bank.move_funds(&addr("alice"), &addr("bob"), &Coin::new("nund", 40))
            .unwrap();
        assert_eq!(bank.balance_of(&addr("alice"), "nund"), 60);
        assert_eq!(bank.balance_of(&addr("bob"), "nund"), 40);
    }

    #[test]
    fn test_move_insufficient_funds_changes_nothing() {
        let mut bank = MemoryBank::new();
        bank.mint(&addr("alice"), &Coin::new("nund", 10));

        let err = bank
            .move_funds(&addr("alice"), &addr("bob"), &Coin::new("nund", 11))
            .unwrap_err();
        match err {
            TransferError::InsufficientFunds(e) => {
                assert_eq!(e.available, 10);
                assert_eq!(e.required, 11);
            }
            other => panic!("Expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(bank.balance_of(&addr("alice"), "nund"), 10);
        assert_eq!(bank.balance_of(&addr("bob"), "nund"), 0);
    }

    #[test]
    fn test_move_overflowing_credit_changes_nothing() {
        let mut bank = MemoryBank::new();
        bank.mint(&addr("alice"), &Coin::new("nund", 10));
        bank.mint(&addr("bob"), &Coin::new("nund", u128::MAX - 5));

        let err = bank
            .move_funds(&addr("alice"), &addr("bob"), &Coin::new("nund", 6))
            .unwrap_err();
        assert!(matches!(err, TransferError::BalanceOverflow { amount: 6, .. }));
        assert_eq!(bank.balance_of(&addr("alice"), "nund"), 10);
        assert_eq!(bank.balance_of(&addr("bob"), "nund"), u128::MAX - 5);

        bank.move_funds(&addr("alice"), &addr("bob"), &Coin::new("nund", 5))
            .unwrap();
        assert_eq!(bank.balance_of(&addr("bob"), "nund"), u128::MAX);
    }

    #[test]
    fn test_balances_per_denom() {
        let mut bank = MemoryBank::new();
        bank.mint(&addr("pool"), &Coin::new("nund", 5));
        bank.mint(&addr("pool"), &Coin::new("uatom", 7));
        bank.mint(&addr("other"), &Coin::new("nund", 9));

        let balances = bank.balances(&addr("pool"));
        assert_eq!(balances.len(), 2);
        assert_eq!(balances["nund"], 5);
        assert_eq!(balances["uatom"], 7);
    }

    #[test]
    fn test_emptied_account_has_no_balances() {
        let mut bank = MemoryBank::new();
        bank.mint(&addr("alice"), &Coin::new("nund", 5));
        bank.move_funds(&addr("alice"), &addr("bob"), &Coin::new("nund", 5))
            .unwrap();
        assert!(bank.balances(&addr("alice")).is_empty());
    }
}
