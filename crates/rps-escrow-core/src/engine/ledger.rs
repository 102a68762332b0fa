//! Pull-payment balance ledger.
//!
//! Settlement never pays players directly. Winnings, tie refunds, and
//! reclaimed wagers are credited here, and each player withdraws their own
//! balance in a separate step.

use std::collections::HashMap;

use crate::error::EscrowError;
use crate::game::Address;

/// Withdrawable balances keyed by address.
#[derive(Clone, Debug, Default)]
pub struct BalanceLedger {
    balances: HashMap<Address, u64>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an address. Only settlement paths call this; there is no
    /// public deposit.
    pub fn credit(&mut self, address: Address, amount: u64) {
        let balance = self.balances.entry(address).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Withdraw the entire balance of an address, zeroing it first.
    pub fn withdraw_all(&mut self, address: Address) -> Result<u64, EscrowError> {
        match self.balances.get_mut(&address) {
            Some(balance) if *balance > 0 => {
                let amount = *balance;
                *balance = 0;
                Ok(amount)
            }
            _ => Err(EscrowError::NothingToWithdraw),
        }
    }

    /// Current balance of an address; unknown addresses hold zero.
    pub fn balance_of(&self, address: Address) -> u64 {
        self.balances.get(&address).copied().unwrap_or(0)
    }

    /// Sum of all credited, not-yet-withdrawn balances.
    pub fn total(&self) -> u64 {
        self.balances
            .values()
            .fold(0u64, |acc, balance| acc.saturating_add(*balance))
    }
}
