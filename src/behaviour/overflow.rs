//! Solver-guided overflow probing.
//!
//! Targets only functions for which a solver artifact exists. Candidate
//! assignments from the external solver are admitted value by value: a
//! candidate that cannot possibly inhabit the declared type is dropped, not
//! replaced, and inputs the solver left unconstrained fall back to freshly
//! generated random values. The `overflow` flag of the resulting outcome is
//! true exactly when the solver-chosen call lands successfully on-chain.

use std::sync::Arc;

use alloy::primitives::{Address, U256};

use crate::abi::Function;
use crate::contract::TargetContract;
use crate::context::Context;
use crate::error::{Result, SolverError, SwarmError};
use crate::generator::ValueGenerator;
use crate::outcome::{ActionResult, Outcome};
use crate::solver::{scalar_string, SolutionProvider, SolveRequest, SolveResponse, PROTOCOL_VERSION};
use crate::telemetry;
use crate::types::{parse_int_wrapping, parse_uint_wrapping, ParamType, Value};

use super::{exec_transaction, LABEL_OVERFLOW};

pub struct OverflowBehaviour {
    generator: ValueGenerator,
    provider: Arc<dyn SolutionProvider>,
    counter: u64,
}

impl OverflowBehaviour {
    pub fn new(provider: Arc<dyn SolutionProvider>) -> Self {
        Self {
            generator: ValueGenerator::random(),
            provider,
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
        let callable: Vec<&Function> = target
            .functions()
            .values()
            .filter(|f| f.is_state_mutating() && self.provider.has_artifact(f.name()))
            .collect();
        let chosen = self
            .generator
            .pick(&callable)
            .copied()
            .ok_or(SwarmError::NoCallableFunction)?;

        let distinct = *self.generator.pick(&[0u8, 1u8]).unwrap_or(&0);
        let request = SolveRequest {
            version: PROTOCOL_VERSION,
            function: chosen.name().to_string(),
            artifacts_path: target.artifacts_path().to_path_buf(),
            contract: target.address(),
            caller,
            distinct,
            bot_count: ctx.bot_count(),
        };
        let response = self.provider.solve(&request).await;

        if response.sat {
            let (params, msg_value) = self.concrete_params(chosen, &response, ctx)?;
            let outcome = exec_transaction(
                target,
                chosen,
                params,
                msg_value,
                caller,
                LABEL_OVERFLOW,
                self.counter,
                true,
            )
            .await?;
            if outcome.successful {
                telemetry::log_action(&outcome);
                return Ok(outcome);
            }
        } else {
            tracing::debug!("[SOLVE] {}: not sat", chosen.name());
        }

        Ok(self.unsat_outcome(caller, chosen.name()))
    }

    fn unsat_outcome(&self, caller: Address, action: &str) -> Outcome {
        Outcome {
            successful: false,
            overflow: false,
            caller,
            action: action.to_string(),
            behaviour: LABEL_OVERFLOW,
            behaviour_counter: self.counter,
            params: Vec::new(),
            tx_value: U256::ZERO,
            result: ActionResult::Unsat,
        }
    }

    /// Resolve the solver's assignments into concrete call parameters plus
    /// the attached wei.
    fn concrete_params(
        &mut self,
        function: &Function,
        response: &SolveResponse,
        ctx: &Context,
    ) -> Result<(Vec<Value>, U256)> {
        let fallback = self.generator.random_parameters(function, ctx)?;
        let mut params = Vec::new();
        for (position, input) in function.inputs.iter().enumerate() {
            let ty = ParamType::parse(&input.ty)?;
            match response.assignments.get(&input.name) {
                Some(serde_json::Value::Array(items)) => {
                    let element_ty = match &ty {
                        ParamType::Array(inner) => (**inner).clone(),
                        other => other.clone(),
                    };
                    let mut kept = Vec::new();
                    for item in items {
                        let Some(raw) = scalar_string(item) else {
                            continue;
                        };
                        if let Some(value) = admit(&raw, &element_ty, ctx)? {
                            kept.push(value);
                        }
                    }
                    params.push(Value::Array(kept));
                }
                Some(scalar) => match scalar_string(scalar) {
                    // an inadmissible scalar is dropped outright, shifting
                    // later argument positions; the target rejects the call
                    Some(raw) => {
                        if let Some(value) = admit(&raw, &ty, ctx)? {
                            params.push(value);
                        }
                    }
                    None => {
                        if let Some(value) = fallback.get(position) {
                            params.push(value.clone());
                        }
                    }
                },
                None => {
                    if let Some(value) = fallback.get(position) {
                        params.push(value.clone());
                    }
                }
            }
        }
        let msg_value = match response.msg_value.as_ref().and_then(scalar_string) {
            Some(raw) => admit(&raw, &ParamType::Uint(256), ctx)?
                .and_then(|v| v.as_uint())
                .unwrap_or(U256::ZERO),
            None => U256::ZERO,
        };
        Ok((params, msg_value))
    }
}

/// Admission rules for one solver candidate. `Ok(None)` means dropped.
fn admit(raw: &str, ty: &ParamType, ctx: &Context) -> Result<Option<Value>> {
    match ty {
        ParamType::Addr => {
            if raw.contains('-') {
                return Ok(None);
            }
            let index: usize = match raw.trim().parse() {
                Ok(index) => index,
                Err(_) => return Ok(None),
            };
            // address candidates are indices into the tracked account list
            let account = ctx.accounts.get(index).ok_or(SolverError::AddressIndex {
                index,
                known: ctx.accounts.len(),
            })?;
            Ok(Some(Value::Addr(account.address())))
        }
        ParamType::Uint(_) => {
            if raw.contains('-') {
                return Ok(None);
            }
            Ok(parse_uint_wrapping(raw).map(Value::Uint))
        }
        ParamType::Int(bits) => Ok(parse_int_wrapping(raw, *bits).map(Value::Int)),
        ParamType::Bool => match raw.trim() {
            "0" | "false" => Ok(Some(Value::Bool(false))),
            "1" | "true" => Ok(Some(Value::Bool(true))),
            _ => Ok(None),
        },
        ParamType::Str => Ok(Some(Value::Str(raw.to_string()))),
        ParamType::Array(inner) => admit(raw, inner, ctx),
    }
}
