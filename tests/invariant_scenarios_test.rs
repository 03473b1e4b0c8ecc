//! Oracle scenarios against the in-memory token, with and without injected
//! bookkeeping bugs.

mod common;

use alloy::primitives::{Address, U256};
use common::{erc20_map, target_for, MockToken, TokenBugs};
use token_swarm::account::Eip20Account;
use token_swarm::contract::TargetContract;
use token_swarm::executor::CallOptions;
use token_swarm::invariants::{InvariantSuite, Oracle, SuiteStatus};
use token_swarm::outcome::{ActionResult, Outcome};
use token_swarm::types::Value;

const A: Address = Address::repeat_byte(0xAA);
const B: Address = Address::repeat_byte(0xBB);
const S: Address = Address::repeat_byte(0x55);

async fn refreshed_accounts(target: &TargetContract, addresses: &[Address]) -> Vec<Eip20Account> {
    let mut accounts: Vec<Eip20Account> =
        addresses.iter().copied().map(Eip20Account::new).collect();
    for account in &mut accounts {
        account
            .update_status(target, None)
            .await
            .expect("cache refresh must succeed");
    }
    accounts
}

async fn perform(
    target: &TargetContract,
    caller: Address,
    action: &str,
    params: Vec<Value>,
) -> Outcome {
    let receipt = target
        .execute_by_name(action, &params, CallOptions::sender(caller))
        .await
        .expect("fixture call must succeed");
    Outcome {
        successful: true,
        overflow: false,
        caller,
        action: action.to_string(),
        behaviour: "random",
        behaviour_counter: 1,
        params,
        tx_value: U256::ZERO,
        result: ActionResult::Executed(receipt),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_a_consistent_transfer_keeps_oracles_green() {
    let token = MockToken::new(&[(A, 1000), (B, 0)]);
    let target = target_for(token, erc20_map());
    let accounts = refreshed_accounts(&target, &[A, B]).await;
    let mut suite = InvariantSuite::new(vec![
        Oracle::TotalSupplyTotalBalance,
        Oracle::TransferEventConsistency,
    ]);

    let status = suite.check_all(&target, &accounts, None, -1).await;
    assert_eq!(status, SuiteStatus::Continue);
    assert_eq!(suite.violated_count(), 0);

    let outcome = perform(
        &target,
        A,
        "transfer",
        vec![Value::Addr(B), Value::Uint(U256::from(100u64))],
    )
    .await;
    suite.check_all(&target, &accounts, Some(&outcome), 0).await;
    assert_eq!(suite.violated_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_transfer_event_is_flagged() {
    let token = MockToken::with_bugs(
        &[(A, 1000), (B, 0)],
        TokenBugs {
            skip_transfer_event: true,
            ..TokenBugs::default()
        },
    );
    let target = target_for(token, erc20_map());
    let accounts = refreshed_accounts(&target, &[A, B]).await;
    let mut suite = InvariantSuite::new(vec![Oracle::TransferEventConsistency]);
    suite.check_all(&target, &accounts, None, -1).await;

    let outcome = perform(
        &target,
        A,
        "transfer",
        vec![Value::Addr(B), Value::Uint(U256::from(100u64))],
    )
    .await;
    suite.check_all(&target, &accounts, Some(&outcome), 0).await;
    assert!(suite.is_violated(Oracle::TransferEventConsistency));
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_b_consistent_approval_event_holds() {
    let token = MockToken::new(&[(A, 1000), (B, 0)]);
    let target = target_for(token, erc20_map());
    let accounts = refreshed_accounts(&target, &[A, B]).await;
    let mut suite = InvariantSuite::new(vec![Oracle::ApprovalEventConsistency]);
    suite.check_all(&target, &accounts, None, -1).await;

    let outcome = perform(
        &target,
        A,
        "approve",
        vec![Value::Addr(B), Value::Uint(U256::from(50u64))],
    )
    .await;
    suite.check_all(&target, &accounts, Some(&outcome), 0).await;
    assert_eq!(suite.violated_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_b_zero_reported_approval_is_flagged() {
    let token = MockToken::with_bugs(
        &[(A, 1000), (B, 0)],
        TokenBugs {
            misreport_approval_zero: true,
            ..TokenBugs::default()
        },
    );
    let target = target_for(token, erc20_map());
    let accounts = refreshed_accounts(&target, &[A, B]).await;
    let mut suite = InvariantSuite::new(vec![Oracle::ApprovalEventConsistency]);
    suite.check_all(&target, &accounts, None, -1).await;

    let outcome = perform(
        &target,
        A,
        "approve",
        vec![Value::Addr(B), Value::Uint(U256::from(50u64))],
    )
    .await;
    let status = suite.check_all(&target, &accounts, Some(&outcome), 0).await;
    assert!(suite.is_violated(Oracle::ApprovalEventConsistency));
    // only one oracle registered, so the suite also reports exhaustion
    assert_eq!(status, SuiteStatus::Exhausted);
}

#[tokio::test(flavor = "multi_thread")]
async fn scenario_c_transfer_beyond_allowance_is_flagged() {
    let token = MockToken::with_bugs(
        &[(A, 1000), (B, 0), (S, 0)],
        TokenBugs {
            ignore_allowance_check: true,
            ..TokenBugs::default()
        },
    );
    let target = target_for(token, erc20_map());
    let mut accounts = refreshed_accounts(&target, &[A, B, S]).await;

    // A grants S an allowance of 50 and the cache picks it up
    let approval = perform(
        &target,
        A,
        "approve",
        vec![Value::Addr(S), Value::Uint(U256::from(50u64))],
    )
    .await;
    for account in &mut accounts {
        account.update_status(&target, Some(&approval)).await.unwrap();
    }
    assert_eq!(accounts[0].allowance_for(S), U256::from(50u64));

    let mut suite = InvariantSuite::new(vec![Oracle::TransferFromAllowance]);
    suite.check_all(&target, &accounts, None, -1).await;

    // the buggy target lets S move 100 anyway
    let outcome = perform(
        &target,
        S,
        "transferFrom",
        vec![
            Value::Addr(A),
            Value::Addr(B),
            Value::Uint(U256::from(100u64)),
        ],
    )
    .await;
    suite.check_all(&target, &accounts, Some(&outcome), 3).await;
    assert!(suite.is_violated(Oracle::TransferFromAllowance));
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_allowance_after_transfer_from_is_flagged() {
    let token = MockToken::with_bugs(
        &[(A, 1000), (B, 0), (S, 0)],
        TokenBugs {
            skip_allowance_decrement: true,
            ..TokenBugs::default()
        },
    );
    let target = target_for(token, erc20_map());
    let mut accounts = refreshed_accounts(&target, &[A, B, S]).await;

    let approval = perform(
        &target,
        A,
        "approve",
        vec![Value::Addr(S), Value::Uint(U256::from(50u64))],
    )
    .await;
    for account in &mut accounts {
        account.update_status(&target, Some(&approval)).await.unwrap();
    }

    let mut suite = InvariantSuite::new(vec![Oracle::ConsistentAllowanceAfterTransferFrom]);
    suite.check_all(&target, &accounts, None, -1).await;

    // a covered transferFrom, but the allowance is never decremented
    let outcome = perform(
        &target,
        S,
        "transferFrom",
        vec![
            Value::Addr(A),
            Value::Addr(B),
            Value::Uint(U256::from(30u64)),
        ],
    )
    .await;
    suite.check_all(&target, &accounts, Some(&outcome), 0).await;
    assert!(suite.is_violated(Oracle::ConsistentAllowanceAfterTransferFrom));
}

#[tokio::test(flavor = "multi_thread")]
async fn consistent_allowance_decrement_holds() {
    let token = MockToken::new(&[(A, 1000), (B, 0), (S, 0)]);
    let target = target_for(token, erc20_map());
    let mut accounts = refreshed_accounts(&target, &[A, B, S]).await;

    let approval = perform(
        &target,
        A,
        "approve",
        vec![Value::Addr(S), Value::Uint(U256::from(50u64))],
    )
    .await;
    for account in &mut accounts {
        account.update_status(&target, Some(&approval)).await.unwrap();
    }

    let mut suite = InvariantSuite::new(vec![
        Oracle::TransferFromAllowance,
        Oracle::ConsistentAllowanceAfterTransferFrom,
    ]);
    suite.check_all(&target, &accounts, None, -1).await;

    let outcome = perform(
        &target,
        S,
        "transferFrom",
        vec![
            Value::Addr(A),
            Value::Addr(B),
            Value::Uint(U256::from(30u64)),
        ],
    )
    .await;
    suite.check_all(&target, &accounts, Some(&outcome), 0).await;
    assert_eq!(suite.violated_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn inflated_total_supply_is_flagged_at_baseline() {
    let token = MockToken::with_bugs(
        &[(A, 1000)],
        TokenBugs {
            reported_total_supply: Some(2000),
            ..TokenBugs::default()
        },
    );
    let target = target_for(token, erc20_map());
    let accounts = refreshed_accounts(&target, &[A]).await;
    let mut suite = InvariantSuite::new(vec![
        Oracle::Overflow,
        Oracle::TotalSupplyTotalBalance,
    ]);

    // the baseline pass before round zero already evaluates stateless checks
    suite.check_all(&target, &accounts, None, -1).await;
    assert!(suite.is_violated(Oracle::TotalSupplyTotalBalance));
    assert!(!suite.is_violated(Oracle::Overflow));
}

#[tokio::test(flavor = "multi_thread")]
async fn latched_oracles_stay_latched() {
    let token = MockToken::new(&[(A, 1000), (B, 0)]);
    let target = target_for(token, erc20_map());
    let accounts = refreshed_accounts(&target, &[A, B]).await;
    let mut suite = InvariantSuite::new(vec![Oracle::Overflow, Oracle::TotalSupplyTotalBalance]);
    suite.check_all(&target, &accounts, None, -1).await;

    let overflowing = Outcome {
        successful: true,
        overflow: true,
        caller: A,
        action: "transfer".to_string(),
        behaviour: "overflow",
        behaviour_counter: 1,
        params: vec![Value::Addr(B), Value::Uint(U256::ZERO)],
        tx_value: U256::ZERO,
        result: ActionResult::Executed(Default::default()),
    };
    let status = suite.check_all(&target, &accounts, Some(&overflowing), 0).await;
    assert_eq!(status, SuiteStatus::Continue);
    assert!(suite.is_violated(Oracle::Overflow));
    assert_eq!(suite.violated_count(), 1);

    // repeated overflow outcomes change nothing: the latch is monotonic and
    // the oracle is never re-evaluated
    for step in 1..4 {
        let status = suite
            .check_all(&target, &accounts, Some(&overflowing), step)
            .await;
        assert_eq!(status, SuiteStatus::Continue);
        assert_eq!(suite.violated_count(), 1);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn approval_event_overrides_allowance_refetch_in_cache() {
    // the event is authoritative even when it disagrees with the chain
    let token = MockToken::with_bugs(
        &[(A, 1000), (B, 0)],
        TokenBugs {
            misreport_approval_zero: true,
            ..TokenBugs::default()
        },
    );
    let target = target_for(token, erc20_map());
    let mut accounts = refreshed_accounts(&target, &[A, B]).await;

    let approval = perform(
        &target,
        A,
        "approve",
        vec![Value::Addr(B), Value::Uint(U256::from(50u64))],
    )
    .await;
    accounts[0]
        .update_status(&target, Some(&approval))
        .await
        .unwrap();
    // chain says 50, the (buggy) event said 0; the cache follows the event
    assert_eq!(accounts[0].allowance_for(B), U256::ZERO);
}
