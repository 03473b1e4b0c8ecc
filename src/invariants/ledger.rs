//! Shared before/after snapshot ledger for the delta oracles.
//!
//! "Before" state is the still-stale account cache captured when a check
//! cycle opens; "after" state is fetched from chain on demand and memoized
//! for the rest of the cycle, so every oracle in the cycle sees one
//! consistent post-action view.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};

use crate::account::Eip20Account;
use crate::contract::TargetContract;
use crate::error::{Result, SwarmError};

#[derive(Debug, Default)]
pub struct SnapshotLedger {
    before_balances: HashMap<Address, U256>,
    before_allowances: HashMap<Address, HashMap<Address, U256>>,
    after_balances: HashMap<Address, U256>,
    after_allowances: HashMap<(Address, Address), U256>,
}

impl SnapshotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a check cycle: capture the account caches as the pre-call view
    /// and forget the previous cycle's fetches.
    pub fn begin_cycle(&mut self, accounts: &[Eip20Account]) {
        self.before_balances = accounts
            .iter()
            .map(|a| (a.address(), a.token_balance()))
            .collect();
        self.before_allowances = accounts
            .iter()
            .map(|a| (a.address(), a.allowances().clone()))
            .collect();
        self.after_balances.clear();
        self.after_allowances.clear();
    }

    /// Cached pre-call balance; `None` when the address is not tracked.
    pub fn before_balance(&self, address: Address) -> Option<U256> {
        self.before_balances.get(&address).copied()
    }

    /// Cached pre-call allowance `owner -> spender`. `None` when the owner
    /// is not tracked; zero when the spender has simply never been observed.
    pub fn before_allowance(&self, owner: Address, spender: Address) -> Option<U256> {
        self.before_allowances
            .get(&owner)
            .map(|granted| granted.get(&spender).copied().unwrap_or(U256::ZERO))
    }

    /// On-chain balance now, fetched at most once per cycle.
    pub async fn after_balance(
        &mut self,
        target: &TargetContract,
        address: Address,
    ) -> Result<U256> {
        if let Some(balance) = self.after_balances.get(&address) {
            return Ok(*balance);
        }
        let balance = target.balance_of(address).await?;
        self.after_balances.insert(address, balance);
        Ok(balance)
    }

    /// On-chain allowance now, fetched at most once per cycle.
    pub async fn after_allowance(
        &mut self,
        target: &TargetContract,
        owner: Address,
        spender: Address,
    ) -> Result<U256> {
        if let Some(allowed) = self.after_allowances.get(&(owner, spender)) {
            return Ok(*allowed);
        }
        let allowed = target.allowance(owner, spender).await?;
        self.after_allowances.insert((owner, spender), allowed);
        Ok(allowed)
    }

    /// The delta heuristic confirming a transfer took effect: did any of
    /// `addresses` change balance since the snapshot? A self-transfer or a
    /// zero-amount transfer moves nothing and is indistinguishable from a
    /// no-op here.
    pub async fn balances_changed(
        &mut self,
        target: &TargetContract,
        addresses: &[Address],
    ) -> Result<bool> {
        for &address in addresses {
            let before = self.before_balance(address).ok_or_else(|| {
                SwarmError::Oracle(format!("address {address} is not a tracked account"))
            })?;
            let after = self.after_balance(target, address).await?;
            if before != after {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
