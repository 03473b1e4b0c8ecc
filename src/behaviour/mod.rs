//! Pluggable action-selection policies.
//!
//! A closed set of three policies, fixed at bot-construction time. Each
//! invocation selects one callable function, synthesizes parameters,
//! executes, and returns a normalized [`Outcome`]. Reverts become failed
//! outcomes; transport failures propagate and end the run.

mod overflow;

pub use overflow::OverflowBehaviour;

use std::sync::Arc;

use alloy::primitives::{Address, U256};

use crate::abi::Function;
use crate::contract::TargetContract;
use crate::context::Context;
use crate::error::{ExecutionError, Result, SwarmError};
use crate::executor::CallOptions;
use crate::generator::ValueGenerator;
use crate::outcome::{ActionResult, Outcome};
use crate::solver::SolutionProvider;
use crate::telemetry;
use crate::types::Value;

/// Total execution attempts per action for the random/boundary policies.
const MAX_EXECUTION_ATTEMPTS: u32 = 5;
/// Wei attached when the chosen function is payable.
const PAYABLE_CALL_VALUE_WEI: u128 = 1_000_000_000_000_000_000;

pub const LABEL_RANDOM: &str = "random";
pub const LABEL_BOUNDARY: &str = "boundary";
pub const LABEL_OVERFLOW: &str = "overflow";

pub enum Behaviour {
    Random(RandomBehaviour),
    Boundary(BoundaryBehaviour),
    Overflow(OverflowBehaviour),
}

impl Behaviour {
    /// Build from a configuration label. Unknown labels fall back to the
    /// random policy.
    pub fn from_label(label: &str, solver: Arc<dyn SolutionProvider>) -> Self {
        match label {
            LABEL_RANDOM => Behaviour::Random(RandomBehaviour::new()),
            LABEL_BOUNDARY => Behaviour::Boundary(BoundaryBehaviour::new()),
            LABEL_OVERFLOW => Behaviour::Overflow(OverflowBehaviour::new(solver)),
            other => {
                tracing::debug!("[BOT] unknown behaviour label `{other}`, defaulting to random");
                Behaviour::Random(RandomBehaviour::new())
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Behaviour::Random(_) => LABEL_RANDOM,
            Behaviour::Boundary(_) => LABEL_BOUNDARY,
            Behaviour::Overflow(_) => LABEL_OVERFLOW,
        }
    }

    pub async fn perform_action(
        &mut self,
        caller: Address,
        target: &TargetContract,
        ctx: &Context,
    ) -> Result<Outcome> {
        match self {
            Behaviour::Random(b) => b.perform_action(caller, target, ctx).await,
            Behaviour::Boundary(b) => b.perform_action(caller, target, ctx).await,
            Behaviour::Overflow(b) => b.perform_action(caller, target, ctx).await,
        }
    }
}

pub struct RandomBehaviour {
    generator: ValueGenerator,
    counter: u64,
}

impl RandomBehaviour {
    pub fn new() -> Self {
        Self {
            generator: ValueGenerator::random(),
            counter: 0,
        }
    }

    pub async fn perform_action(
        &mut self,
        caller: Address,
        target: &TargetContract,
        ctx: &Context,
    ) -> Result<Outcome> {
        self.counter += 1;
        dispatch_generated(
            &mut self.generator,
            self.counter,
            LABEL_RANDOM,
            caller,
            target,
            ctx,
        )
        .await
    }
}

impl Default for RandomBehaviour {
    fn default() -> Self {
        Self::new()
    }
}

/// Identical dispatch to [`RandomBehaviour`], boundary-aware generation.
pub struct BoundaryBehaviour {
    generator: ValueGenerator,
    counter: u64,
}

impl BoundaryBehaviour {
    pub fn new() -> Self {
        Self {
            generator: ValueGenerator::boundary(),
            counter: 0,
        }
    }

    pub async fn perform_action(
        &mut self,
        caller: Address,
        target: &TargetContract,
        ctx: &Context,
    ) -> Result<Outcome> {
        self.counter += 1;
        dispatch_generated(
            &mut self.generator,
            self.counter,
            LABEL_BOUNDARY,
            caller,
            target,
            ctx,
        )
        .await
    }
}

impl Default for BoundaryBehaviour {
    fn default() -> Self {
        Self::new()
    }
}

async fn dispatch_generated(
    generator: &mut ValueGenerator,
    counter: u64,
    label: &'static str,
    caller: Address,
    target: &TargetContract,
    ctx: &Context,
) -> Result<Outcome> {
    let callable: Vec<&Function> = target
        .functions()
        .values()
        .filter(|f| f.is_callable())
        .collect();
    let chosen = generator
        .pick(&callable)
        .copied()
        .ok_or(SwarmError::NoCallableFunction)?;

    let mut attempt = 0;
    loop {
        let params = generator.random_parameters(chosen, ctx)?;
        let tx_value = if chosen.is_payable() {
            U256::from(PAYABLE_CALL_VALUE_WEI)
        } else {
            U256::ZERO
        };
        let outcome =
            exec_transaction(target, chosen, params, tx_value, caller, label, counter, false)
                .await?;
        attempt += 1;
        if outcome.successful {
            telemetry::log_action(&outcome);
            return Ok(outcome);
        }
        if attempt >= MAX_EXECUTION_ATTEMPTS {
            return Ok(outcome);
        }
    }
}

/// Execute one call and fold the result into an [`Outcome`]. Reverts are
/// recorded, everything else propagates to the round loop.
pub(crate) async fn exec_transaction(
    target: &TargetContract,
    function: &Function,
    params: Vec<Value>,
    tx_value: U256,
    caller: Address,
    label: &'static str,
    counter: u64,
    overflow_on_success: bool,
) -> Result<Outcome> {
    let opts = CallOptions {
        from: caller,
        value: tx_value,
    };
    match target.execute(function, &params, opts).await {
        Ok(receipt) => Ok(Outcome {
            successful: true,
            overflow: overflow_on_success,
            caller,
            action: function.name().to_string(),
            behaviour: label,
            behaviour_counter: counter,
            params,
            tx_value,
            result: ActionResult::Executed(receipt),
        }),
        Err(ExecutionError::Revert) => Ok(Outcome {
            successful: false,
            overflow: false,
            caller,
            action: function.name().to_string(),
            behaviour: label,
            behaviour_counter: counter,
            params,
            tx_value,
            result: ActionResult::Reverted,
        }),
        Err(other) => Err(other.into()),
    }
}
