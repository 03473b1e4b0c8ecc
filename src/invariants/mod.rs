//! Invariant suite: declaration-ordered evaluation, monotonic violation
//! latches, and the shared snapshot ledger.
//!
//! Protocol: one baseline pass with no outcome before round zero, then one
//! pass per action. A latched oracle is never re-evaluated. An oracle whose
//! check errors is logged and counts as "not violated this round"; the run
//! only stops early when every registered oracle has latched.

mod eip20;
mod ledger;

pub use eip20::Oracle;
pub use ledger::SnapshotLedger;

use crate::account::Eip20Account;
use crate::contract::TargetContract;
use crate::outcome::Outcome;
use crate::telemetry;

/// Borrowed evaluation context handed to each oracle.
pub struct CheckCtx<'a> {
    pub target: &'a TargetContract,
    pub accounts: &'a [Eip20Account],
    pub ledger: &'a mut SnapshotLedger,
}

#[derive(Debug)]
struct InvariantSlot {
    oracle: Oracle,
    violated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteStatus {
    Continue,
    /// Every registered oracle has latched: the run must abort.
    Exhausted,
}

#[derive(Debug)]
pub struct InvariantSuite {
    slots: Vec<InvariantSlot>,
    ledger: SnapshotLedger,
}

impl InvariantSuite {
    pub fn new(oracles: Vec<Oracle>) -> Self {
        Self {
            slots: oracles
                .into_iter()
                .map(|oracle| InvariantSlot {
                    oracle,
                    violated: false,
                })
                .collect(),
            ledger: SnapshotLedger::new(),
        }
    }

    /// The full EIP-20 oracle set, in declaration order.
    pub fn eip20() -> Self {
        Self::new(vec![
            Oracle::Overflow,
            Oracle::TotalSupplyTotalBalance,
            Oracle::TransferFromAllowance,
            Oracle::ConsistentAllowanceAfterTransferFrom,
            Oracle::TransferEventConsistency,
            Oracle::ApprovalEventConsistency,
        ])
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn violated_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.violated).count()
    }

    pub fn is_violated(&self, oracle: Oracle) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.oracle == oracle && slot.violated)
    }

    /// Run all live oracles against the outcome, in declaration order.
    pub async fn check_all(
        &mut self,
        target: &TargetContract,
        accounts: &[Eip20Account],
        outcome: Option<&Outcome>,
        step: i64,
    ) -> SuiteStatus {
        let Self { slots, ledger } = self;
        ledger.begin_cycle(accounts);
        for slot in slots.iter_mut() {
            if slot.violated {
                continue;
            }
            let mut ctx = CheckCtx {
                target,
                accounts,
                ledger: &mut *ledger,
            };
            match slot.oracle.holds(&mut ctx, outcome).await {
                Ok(true) => {}
                Ok(false) => {
                    slot.violated = true;
                    telemetry::log_violation(slot.oracle.label(), step);
                    telemetry::log_status(accounts);
                }
                Err(err) => {
                    tracing::error!(
                        "[ORACLE] cannot run invariant {}: {err}",
                        slot.oracle.label()
                    );
                }
            }
        }
        if !slots.is_empty() && slots.iter().all(|slot| slot.violated) {
            SuiteStatus::Exhausted
        } else {
            SuiteStatus::Continue
        }
    }
}
