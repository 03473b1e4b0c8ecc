//! Normalized record of one attempted action. The sole input to every
//! invariant check and to the account cache refresh.

use alloy::primitives::{Address, U256};

use crate::executor::{EventRecord, TxReceipt};
use crate::types::Value;

#[derive(Debug, Clone)]
pub enum ActionResult {
    /// Confirmed on-chain, receipt attached.
    Executed(TxReceipt),
    /// Rejected on-chain. Not exceptional: recorded as a failed outcome.
    Reverted,
    /// The external solver found no satisfying assignment.
    Unsat,
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub successful: bool,
    pub overflow: bool,
    pub caller: Address,
    pub action: String,
    pub behaviour: &'static str,
    pub behaviour_counter: u64,
    pub params: Vec<Value>,
    pub tx_value: U256,
    pub result: ActionResult,
}

impl Outcome {
    pub fn events(&self) -> &[EventRecord] {
        match &self.result {
            ActionResult::Executed(receipt) => &receipt.events,
            _ => &[],
        }
    }

    /// Marker string for structured logs.
    pub fn result_marker(&self) -> &'static str {
        match &self.result {
            ActionResult::Executed(_) => "executed",
            ActionResult::Reverted => "revert",
            ActionResult::Unsat => "unsat",
        }
    }

    pub fn param_address(&self, position: usize) -> Option<Address> {
        self.params.get(position).and_then(Value::as_address)
    }

    pub fn param_uint(&self, position: usize) -> Option<U256> {
        self.params.get(position).and_then(Value::as_uint)
    }
}
