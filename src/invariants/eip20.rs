//! The concrete oracle set for EIP-20 style targets.

use alloy::primitives::{Address, U256};

use crate::error::{Result, SwarmError};
use crate::executor::EventRecord;
use crate::outcome::Outcome;
use crate::types::Value;

use super::CheckCtx;

/// Tagged oracle variants; no shared state beyond the suite ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oracle {
    /// Violated iff the latest outcome reports a successful solver-guided
    /// overflow call.
    Overflow,
    /// Sum of tracked balances must equal `totalSupply()` at every check.
    TotalSupplyTotalBalance,
    /// A confirmed transferFrom must have been covered by the pre-call
    /// allowance.
    TransferFromAllowance,
    /// Post-call allowance must equal pre-call allowance minus the
    /// transferred amount, exactly.
    ConsistentAllowanceAfterTransferFrom,
    /// A confirmed transfer must emit a `Transfer` log matching both the
    /// call parameters and the real balance deltas.
    TransferEventConsistency,
    /// An approve that changed the allowance must emit a matching
    /// `Approval` log, and the on-chain allowance must equal the requested
    /// amount (mod 2^256).
    ApprovalEventConsistency,
}

impl Oracle {
    pub fn label(&self) -> &'static str {
        match self {
            Oracle::Overflow => "overflow",
            Oracle::TotalSupplyTotalBalance => "total_supply_total_balance",
            Oracle::TransferFromAllowance => "transfer_from_allowance",
            Oracle::ConsistentAllowanceAfterTransferFrom => {
                "consistent_allowance_after_transfer_from"
            }
            Oracle::TransferEventConsistency => "transfer_event_consistency",
            Oracle::ApprovalEventConsistency => "approval_event_consistency",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Oracle::Overflow => "successful transaction with overflow",
            Oracle::TotalSupplyTotalBalance => {
                "totalSupply must be equal to the sum of the balances"
            }
            Oracle::TransferFromAllowance => {
                "no successful transferFrom beyond the allowed amount"
            }
            Oracle::ConsistentAllowanceAfterTransferFrom => {
                "transferred amount must be subtracted from the allowance of the from address"
            }
            Oracle::TransferEventConsistency => {
                "every token transfer must trigger a consistent Transfer event"
            }
            Oracle::ApprovalEventConsistency => {
                "every approve must trigger a consistent Approval event"
            }
        }
    }

    /// Evaluate against the latest outcome (`None` for the baseline pass
    /// before round zero). `Ok(true)` means the invariant holds.
    pub async fn holds(&self, ctx: &mut CheckCtx<'_>, outcome: Option<&Outcome>) -> Result<bool> {
        match self {
            Oracle::Overflow => Ok(!outcome.is_some_and(|o| o.overflow)),
            Oracle::TotalSupplyTotalBalance => check_total_supply(ctx).await,
            Oracle::TransferFromAllowance => check_transfer_from_allowance(ctx, outcome).await,
            Oracle::ConsistentAllowanceAfterTransferFrom => {
                check_consistent_allowance(ctx, outcome).await
            }
            Oracle::TransferEventConsistency => check_transfer_event(ctx, outcome).await,
            Oracle::ApprovalEventConsistency => check_approval_event(ctx, outcome).await,
        }
    }
}

fn oracle_err(message: impl Into<String>) -> SwarmError {
    SwarmError::Oracle(message.into())
}

/// Effective `(from, to, amount)` of a transfer-shaped call.
fn transfer_shape(outcome: &Outcome) -> Result<(Address, Address, U256)> {
    let missing = || oracle_err(format!("{} outcome carries malformed params", outcome.action));
    if outcome.action == "transferFrom" {
        Ok((
            outcome.param_address(0).ok_or_else(missing)?,
            outcome.param_address(1).ok_or_else(missing)?,
            outcome.param_uint(2).ok_or_else(missing)?,
        ))
    } else {
        Ok((
            outcome.caller,
            outcome.param_address(0).ok_or_else(missing)?,
            outcome.param_uint(1).ok_or_else(missing)?,
        ))
    }
}

fn event_transfer_args(event: &EventRecord) -> Result<(Address, Address, U256)> {
    let malformed = || oracle_err(format!("{} event carries malformed args", event.name));
    let from = event
        .args
        .first()
        .and_then(Value::as_address)
        .ok_or_else(malformed)?;
    let to = event
        .args
        .get(1)
        .and_then(Value::as_address)
        .ok_or_else(malformed)?;
    let amount = event
        .args
        .get(2)
        .and_then(Value::as_uint)
        .ok_or_else(malformed)?;
    Ok((from, to, amount))
}

async fn check_total_supply(ctx: &mut CheckCtx<'_>) -> Result<bool> {
    let mut total = U256::ZERO;
    for address in ctx.accounts.iter().map(|a| a.address()).collect::<Vec<_>>() {
        let balance = ctx.ledger.after_balance(ctx.target, address).await?;
        total = match total.checked_add(balance) {
            Some(sum) => sum,
            // the sum escapes uint256: no supply value can match it
            None => return Ok(false),
        };
    }
    let supply = ctx.target.total_supply().await?;
    Ok(total == supply)
}

async fn check_transfer_from_allowance(
    ctx: &mut CheckCtx<'_>,
    outcome: Option<&Outcome>,
) -> Result<bool> {
    let Some(outcome) = outcome else {
        return Ok(true);
    };
    if outcome.action != "transferFrom" || !outcome.successful {
        return Ok(true);
    }
    let (from, to, amount) = transfer_shape(outcome)?;
    if !ctx
        .ledger
        .balances_changed(ctx.target, &[outcome.caller, from, to])
        .await?
    {
        return Ok(true);
    }
    let allowed = ctx
        .ledger
        .before_allowance(from, outcome.caller)
        .ok_or_else(|| oracle_err(format!("from address {from} is not tracked")))?;
    Ok(allowed >= amount)
}

async fn check_consistent_allowance(
    ctx: &mut CheckCtx<'_>,
    outcome: Option<&Outcome>,
) -> Result<bool> {
    let Some(outcome) = outcome else {
        return Ok(true);
    };
    if outcome.action != "transferFrom" || !outcome.successful {
        return Ok(true);
    }
    let (from, to, amount) = transfer_shape(outcome)?;
    if !ctx
        .ledger
        .balances_changed(ctx.target, &[outcome.caller, from, to])
        .await?
    {
        return Ok(true);
    }
    let allowed_before = ctx
        .ledger
        .before_allowance(from, outcome.caller)
        .ok_or_else(|| oracle_err(format!("from address {from} is not tracked")))?;
    let allowed_after = ctx
        .ledger
        .after_allowance(ctx.target, from, outcome.caller)
        .await?;
    match allowed_before.checked_sub(amount) {
        Some(expected) => Ok(allowed_after == expected),
        // expected allowance would be negative: nothing on chain can match
        None => Ok(false),
    }
}

async fn check_transfer_event(ctx: &mut CheckCtx<'_>, outcome: Option<&Outcome>) -> Result<bool> {
    let Some(outcome) = outcome else {
        return Ok(true);
    };
    if !(outcome.action == "transfer" || outcome.action == "transferFrom") || !outcome.successful {
        return Ok(true);
    }
    let (from, to, amount) = transfer_shape(outcome)?;
    if !ctx
        .ledger
        .balances_changed(ctx.target, &[outcome.caller, from, to])
        .await?
    {
        return Ok(true);
    }
    for event in outcome.events() {
        if event.name != "Transfer" {
            continue;
        }
        let (event_from, event_to, event_amount) = event_transfer_args(event)?;
        let log_matches_params = event_from == from && event_to == to && event_amount == amount;

        let from_before = ctx
            .ledger
            .before_balance(event_from)
            .ok_or_else(|| oracle_err(format!("event from address {event_from} is not tracked")))?;
        let to_before = ctx
            .ledger
            .before_balance(event_to)
            .ok_or_else(|| oracle_err(format!("event to address {event_to} is not tracked")))?;
        let from_after = ctx.ledger.after_balance(ctx.target, event_from).await?;
        let to_after = ctx.ledger.after_balance(ctx.target, event_to).await?;
        let log_matches_deltas = match (
            from_before.checked_sub(event_amount),
            to_before.checked_add(event_amount),
        ) {
            (Some(expected_from), Some(expected_to)) => {
                from_after == expected_from && to_after == expected_to
            }
            _ => false,
        };
        return Ok(log_matches_params && log_matches_deltas);
    }
    // tokens moved but no Transfer log was produced
    Ok(false)
}

async fn check_approval_event(ctx: &mut CheckCtx<'_>, outcome: Option<&Outcome>) -> Result<bool> {
    let Some(outcome) = outcome else {
        return Ok(true);
    };
    if outcome.action != "approve" || !outcome.successful {
        return Ok(true);
    }
    let malformed = || oracle_err("approve outcome carries malformed params");
    let owner = outcome.caller;
    let spender = outcome.param_address(0).ok_or_else(malformed)?;
    // the requested amount wraps modulo 2^256 at parse time, so the cached
    // parameter is already the expected on-chain value
    let amount = outcome.param_uint(1).ok_or_else(malformed)?;

    let before = ctx
        .ledger
        .before_allowance(owner, spender)
        .ok_or_else(|| oracle_err(format!("owner address {owner} is not tracked")))?;
    let after = ctx.ledger.after_allowance(ctx.target, owner, spender).await?;
    if after == before {
        // nothing changed; the call was a no-op as far as approvals go
        return Ok(true);
    }

    for event in outcome.events() {
        if event.name != "Approval" {
            continue;
        }
        let (event_owner, event_spender, event_amount) = event_transfer_args(event)?;
        let log_matches_params =
            event_owner == owner && event_spender == spender && event_amount == amount;
        let approval_matches_request = after == amount;
        return Ok(log_matches_params && approval_matches_request);
    }
    // the allowance changed but no Approval log was produced
    Ok(false)
}
