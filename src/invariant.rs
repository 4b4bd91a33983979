//! Module-account invariant: the pool's balance must equal the sum of all
//! outstanding stream deposits, per denomination.

use crate::bank::Bank;
use crate::coin::Address;
use crate::store::StreamStore;
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const MODULE_NAME: &str = "stream";
pub const DEPOSITS_ROUTE: &str = "deposits";

/// Result of an invariant check. `broken` is the verdict; `message` is for
/// operators and always lists both sides of the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantReport {
    pub message: String,
    pub broken: bool,
}

/// Compares the pool balance in `bank` to the deposits held in `store`.
pub fn check_deposits<S, B>(store: &S, bank: &B, pool: &Address) -> InvariantReport
where
    S: StreamStore + ?Sized,
    B: Bank + ?Sized,
{
    let mut total_deposits: BTreeMap<String, u128> = BTreeMap::new();
    let mut overflowed = false;

    for (_, stream) in store.iter_all() {
        if stream.deposit.is_zero() {
            continue;
        }
        let entry = total_deposits.entry(stream.deposit.denom.clone()).or_insert(0);
        match entry.checked_add(stream.deposit.amount) {
            Some(sum) => *entry = sum,
            None => overflowed = true,
        }
    }

    let pool_balance = bank.balances(pool);
    let broken = overflowed || pool_balance != total_deposits;

    let message = format_invariant(
        DEPOSITS_ROUTE,
        &format!(
            "\tstream pool account coins: {}\n\ttotal deposits: {}{}\n",
            format_coins(&pool_balance),
            format_coins(&total_deposits),
            if overflowed { " (overflowed)" } else { "" }
        ),
    );

    InvariantReport { message, broken }
}

fn format_invariant(route: &str, body: &str) -> String {
    format!("{MODULE_NAME}: {route} invariant\n{body}")
}

fn format_coins(coins: &BTreeMap<String, u128>) -> String {
    if coins.is_empty() {
        return "(none)".to_string();
    }
    let mut out = String::new();
    for (i, (denom, amount)) in coins.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{amount}{denom}");
    }
    out
}
