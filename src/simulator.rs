//! Round-based simulation driver.
//!
//! Owns the mutable registries for the whole run: the context, the bots,
//! and the invariant suite. One round dispatches every bot once, in
//! registration order; exactly one behaviour executes at a time. The
//! canonical refresh order is execute, evaluate oracles against the
//! still-stale caches, then refresh caches.

use alloy::primitives::{address, Address, U256};

use crate::bot::Bot;
use crate::context::Context;
use crate::contract::TargetContract;
use crate::error::Result;
use crate::executor::CallOptions;
use crate::invariants::{InvariantSuite, SuiteStatus};
use crate::outcome::Outcome;
use crate::telemetry;
use crate::types::Value;

/// Reserved spender for the liveness canary.
pub const CANARY_SPENDER: Address = address!("0000000000000000000000000000000000000001");

/// How a run ended, for runs that ended on their own terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// All requested rounds executed.
    Exhausted,
    /// Every registered invariant latched violated.
    AllInvariantsViolated,
    /// The canary stopped answering: the target presumably self-destructed.
    DeadCanary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationKind {
    Exhausted,
    AllInvariantsViolated,
    DeadCanary,
    FatalError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorState {
    Init,
    Running,
    Terminated(TerminationKind),
}

pub struct Simulator {
    target: TargetContract,
    context: Context,
    bots: Vec<Bot>,
    suite: InvariantSuite,
    state: SimulatorState,
}

impl Simulator {
    pub fn new(
        target: TargetContract,
        context: Context,
        bots: Vec<Bot>,
        suite: InvariantSuite,
    ) -> Self {
        for account in &context.accounts {
            telemetry::log_init_account(account.address());
        }
        telemetry::log_init_contract(target.address());
        telemetry::log_init_account(Address::ZERO);
        Self {
            target,
            context,
            bots,
            suite,
            state: SimulatorState::Init,
        }
    }

    pub fn state(&self) -> SimulatorState {
        self.state
    }

    pub fn invariants(&self) -> &InvariantSuite {
        &self.suite
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Plant the liveness canary: an `approve` for amount 1 to a reserved
    /// spender, sent from the first account. Failure is non-fatal but
    /// disables dead-contract detection.
    async fn set_canary(&self) -> bool {
        let Some(first) = self.context.addresses.first().copied() else {
            return false;
        };
        let args = [Value::Addr(CANARY_SPENDER), Value::Uint(U256::ONE)];
        match self
            .target
            .execute_by_name("approve", &args, CallOptions::sender(first))
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::error!("[SIM] canary approve failed: {err}");
                false
            }
        }
    }

    async fn check_canary(&self) -> bool {
        let Some(first) = self.context.addresses.first().copied() else {
            return false;
        };
        match self.target.allowance(first, CANARY_SPENDER).await {
            Ok(allowed) => allowed == U256::ONE,
            Err(err) => {
                tracing::error!("[SIM] canary liveness probe failed: {err}");
                false
            }
        }
    }

    pub async fn start(&mut self, rounds: u64) -> Result<Termination> {
        match self.run(rounds).await {
            Ok(termination) => Ok(termination),
            Err(err) => {
                tracing::error!("[SIM] fatal error, aborting the run: {err}");
                self.state = SimulatorState::Terminated(TerminationKind::FatalError);
                Err(err)
            }
        }
    }

    async fn run(&mut self, rounds: u64) -> Result<Termination> {
        self.state = SimulatorState::Running;
        self.update_status(None).await?;

        let canary_set = self.set_canary().await;
        if !canary_set {
            tracing::warn!(
                "[SIM] cannot call `approve` to set the canary flag; \
                 continuing without self-destruct detection"
            );
        }

        // baseline snapshotting pass
        if self.check_invariants(None, -1).await == SuiteStatus::Exhausted {
            return self.abort_all_violated(None).await;
        }

        for round in 0..rounds {
            telemetry::log_step(round);
            for bot_index in 0..self.bots.len() {
                if canary_set && !self.check_canary().await {
                    tracing::info!("[SIM] the target contract is dead or cannot call `approve`");
                    self.state = SimulatorState::Terminated(TerminationKind::DeadCanary);
                    return Ok(Termination::DeadCanary);
                }

                match self.bots[bot_index]
                    .perform_action(&self.target, &self.context)
                    .await
                {
                    Ok(outcome) => {
                        if self.check_invariants(Some(&outcome), round as i64).await
                            == SuiteStatus::Exhausted
                        {
                            return self.abort_all_violated(Some(&outcome)).await;
                        }
                        if outcome.successful {
                            self.update_status(Some(&outcome)).await?;
                        }
                    }
                    Err(err) if err.is_recoverable() => {
                        tracing::debug!("[SIM] {err} during the execution of an action");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        self.state = SimulatorState::Terminated(TerminationKind::Exhausted);
        Ok(Termination::Exhausted)
    }

    async fn check_invariants(&mut self, outcome: Option<&Outcome>, step: i64) -> SuiteStatus {
        self.suite
            .check_all(&self.target, &self.context.accounts, outcome, step)
            .await
    }

    async fn abort_all_violated(&mut self, outcome: Option<&Outcome>) -> Result<Termination> {
        // leave the caches describing the final state before aborting
        self.update_status(outcome).await?;
        tracing::warn!("[SIM] all the invariants have been violated, aborting the run");
        self.state = SimulatorState::Terminated(TerminationKind::AllInvariantsViolated);
        Ok(Termination::AllInvariantsViolated)
    }

    /// Refresh every tracked account cache, passing the outcome through so
    /// allowance-relevant caches can update opportunistically.
    async fn update_status(&mut self, outcome: Option<&Outcome>) -> Result<()> {
        let Self {
            target, context, ..
        } = self;
        for account in &mut context.accounts {
            account.update_status(target, outcome).await?;
        }
        Ok(())
    }
}
