//! Tracked account identities and their cached on-chain state.
//!
//! Caches are stale-tolerant approximations refreshed only through
//! [`Eip20Account::update_status`]: once at init and after every successful
//! action. Oracles that need "before" state read these caches prior to any
//! refresh.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};

use crate::contract::TargetContract;
use crate::error::Result;
use crate::outcome::Outcome;
use crate::types::Value;

#[derive(Debug, Clone)]
pub struct Eip20Account {
    address: Address,
    token_balance: U256,
    allowance: HashMap<Address, U256>,
}

impl Eip20Account {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            token_balance: U256::ZERO,
            allowance: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Cached token balance as of the last refresh.
    pub fn token_balance(&self) -> U256 {
        self.token_balance
    }

    /// Cached allowance granted by this account to `spender` (zero if never
    /// observed).
    pub fn allowance_for(&self, spender: Address) -> U256 {
        self.allowance.get(&spender).copied().unwrap_or(U256::ZERO)
    }

    pub fn allowances(&self) -> &HashMap<Address, U256> {
        &self.allowance
    }

    /// Refresh the cached balance, and opportunistically the allowance map
    /// when the outcome is allowance-relevant. Allowance refresh trouble is
    /// logged and non-fatal; the balance refresh has already landed.
    pub async fn update_status(
        &mut self,
        target: &TargetContract,
        outcome: Option<&Outcome>,
    ) -> Result<()> {
        self.token_balance = target.balance_of(self.address).await?;
        if let Some(outcome) = outcome {
            if let Err(err) = self.update_allowance(target, outcome).await {
                tracing::error!("[ACCOUNT] cannot refresh allowance cache: {err}");
            }
        }
        Ok(())
    }

    async fn update_allowance(&mut self, target: &TargetContract, outcome: &Outcome) -> Result<()> {
        // An Approval event is authoritative when present.
        for event in outcome.events() {
            if event.name == "Approval" {
                let owner = event.args.first().and_then(Value::as_address);
                let spender = event.args.get(1).and_then(Value::as_address);
                let amount = event.args.get(2).and_then(Value::as_uint);
                if let (Some(owner), Some(spender), Some(amount)) = (owner, spender, amount) {
                    if owner == self.address {
                        self.allowance.insert(spender, amount);
                    }
                }
                return Ok(());
            }
        }

        // Without an event it is not safe to trust the call parameters
        // (increaseApproval and friends, or buggy approve paths): re-read
        // the allowance from the chain instead.
        let action = outcome.action.as_str();
        let lowered = action.to_lowercase();
        if (action == "approve" || lowered.contains("allowance") || lowered.contains("approv"))
            && outcome.caller == self.address
        {
            if let Some(spender) = outcome.param_address(0) {
                let amount = target.allowance(self.address, spender).await?;
                self.allowance.insert(spender, amount);
            }
            return Ok(());
        }

        // transferFrom decreases allowance[from][caller], but buggy targets
        // get the bookkeeping wrong: always re-read.
        if action == "transferFrom" {
            if let Some(from) = outcome.param_address(0) {
                if from == self.address {
                    let amount = target.allowance(self.address, outcome.caller).await?;
                    self.allowance.insert(outcome.caller, amount);
                }
            }
        }
        Ok(())
    }
}
