//! Structured log records consumed by the external dashboard.
//!
//! Every record carries a `label` field naming its category:
//! `status`, `action`, `step`, `init`, `invariant_violation`.

use alloy::primitives::Address;

use crate::account::Eip20Account;
use crate::outcome::Outcome;
use crate::types::Value;

pub fn log_init_account(address: Address) {
    tracing::info!(label = "init", kind = "account", address = %address, "[INIT] tracked account");
}

pub fn log_init_contract(address: Address) {
    tracing::info!(label = "init", kind = "contract", address = %address, "[INIT] target contract");
}

pub fn log_step(round: u64) {
    tracing::info!(label = "step", step_number = round, "[SIM] step {round}");
}

pub fn log_action(outcome: &Outcome) {
    tracing::info!(
        label = "action",
        successful = outcome.successful,
        overflow = outcome.overflow,
        address = %outcome.caller,
        action = %outcome.action,
        behaviour = outcome.behaviour,
        behaviour_counter = outcome.behaviour_counter,
        params = %format_params(&outcome.params),
        result = outcome.result_marker(),
        "[ACTION] {} from {}",
        outcome.action,
        outcome.caller,
    );
}

pub fn log_violation(invariant: &str, step: i64) {
    tracing::warn!(
        label = "invariant_violation",
        invariant,
        violation_step = step,
        "==== invariant {invariant} has been violated at step {step} ====",
    );
}

pub fn log_status(accounts: &[Eip20Account]) {
    for account in accounts {
        tracing::info!(
            label = "status",
            address = %account.address(),
            token_balance = %account.token_balance(),
            "[STATUS] account snapshot",
        );
    }
}

fn format_params(params: &[Value]) -> String {
    let rendered: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    format!("[{}]", rendered.join(", "))
}
