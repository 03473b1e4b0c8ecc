//! Shared test fixtures: an in-memory ERC-20 executor with injectable
//! bookkeeping bugs, plus a scripted solver provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use token_swarm::abi::{import_abi, NameToFunctionMap};
use token_swarm::contract::TargetContract;
use token_swarm::error::ExecutionError;
use token_swarm::executor::{CallOptions, EventRecord, TransactionExecutor, TxReceipt};
use token_swarm::solver::{SolutionProvider, SolveRequest, SolveResponse};
use token_swarm::types::Value;

pub const ERC20_ABI: &str = r#"[
    {"name": "transfer", "type": "function", "stateMutability": "nonpayable",
     "inputs": [{"name": "to", "type": "address"},
                {"name": "value", "type": "uint256"}],
     "outputs": [{"name": "", "type": "bool"}]},
    {"name": "transferFrom", "type": "function", "stateMutability": "nonpayable",
     "inputs": [{"name": "from", "type": "address"},
                {"name": "to", "type": "address"},
                {"name": "value", "type": "uint256"}],
     "outputs": [{"name": "", "type": "bool"}]},
    {"name": "approve", "type": "function", "stateMutability": "nonpayable",
     "inputs": [{"name": "spender", "type": "address"},
                {"name": "value", "type": "uint256"}],
     "outputs": [{"name": "", "type": "bool"}]},
    {"name": "balanceOf", "type": "function", "stateMutability": "view",
     "inputs": [{"name": "owner", "type": "address"}],
     "outputs": [{"name": "", "type": "uint256"}]},
    {"name": "totalSupply", "type": "function", "stateMutability": "view",
     "inputs": [],
     "outputs": [{"name": "", "type": "uint256"}]},
    {"name": "allowance", "type": "function", "stateMutability": "view",
     "inputs": [{"name": "owner", "type": "address"},
                {"name": "spender", "type": "address"}],
     "outputs": [{"name": "", "type": "uint256"}]}
]"#;

/// Same surface, but the only state-mutating function the behaviours can see
/// is a small-amount `transfer`; used where a deterministic action mix
/// matters.
pub const TRANSFER_ONLY_ABI: &str = r#"[
    {"name": "transfer", "type": "function", "stateMutability": "nonpayable",
     "inputs": [{"name": "to", "type": "address"},
                {"name": "value", "type": "uint256",
                 "constraints": {"minValue": "0", "maxValue": "10"}}],
     "outputs": [{"name": "", "type": "bool"}]},
    {"name": "balanceOf", "type": "function", "stateMutability": "view",
     "inputs": [{"name": "owner", "type": "address"}],
     "outputs": [{"name": "", "type": "uint256"}]},
    {"name": "totalSupply", "type": "function", "stateMutability": "view",
     "inputs": [],
     "outputs": [{"name": "", "type": "uint256"}]},
    {"name": "allowance", "type": "function", "stateMutability": "view",
     "inputs": [{"name": "owner", "type": "address"},
                {"name": "spender", "type": "address"}],
     "outputs": [{"name": "", "type": "uint256"}]}
]"#;

#[derive(Debug, Default, Clone, Copy)]
pub struct TokenBugs {
    /// Transfers move tokens without emitting a `Transfer` log.
    pub skip_transfer_event: bool,
    /// `Approval` logs always report amount zero.
    pub misreport_approval_zero: bool,
    /// `transferFrom` moves tokens without checking the allowance.
    pub ignore_allowance_check: bool,
    /// `transferFrom` forgets to decrement the allowance.
    pub skip_allowance_decrement: bool,
    /// `totalSupply()` reports this instead of the real supply.
    pub reported_total_supply: Option<u64>,
    /// Every state-mutating call reverts.
    pub revert_everything: bool,
    /// The first confirmed transfer self-destructs the contract.
    pub die_on_transfer: bool,
}

#[derive(Debug, Default)]
struct TokenState {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    total_supply: U256,
}

pub struct MockToken {
    state: Mutex<TokenState>,
    bugs: TokenBugs,
    dead: AtomicBool,
    confirmed_transfers: AtomicU64,
    execute_attempts: AtomicU64,
}

impl MockToken {
    pub fn new(initial_balances: &[(Address, u64)]) -> Arc<Self> {
        Self::with_bugs(initial_balances, TokenBugs::default())
    }

    pub fn with_bugs(initial_balances: &[(Address, u64)], bugs: TokenBugs) -> Arc<Self> {
        let mut state = TokenState::default();
        for (address, amount) in initial_balances {
            let amount = U256::from(*amount);
            state.balances.insert(*address, amount);
            state.total_supply += amount;
        }
        Arc::new(Self {
            state: Mutex::new(state),
            bugs,
            dead: AtomicBool::new(false),
            confirmed_transfers: AtomicU64::new(0),
            execute_attempts: AtomicU64::new(0),
        })
    }

    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    pub fn confirmed_transfers(&self) -> u64 {
        self.confirmed_transfers.load(Ordering::SeqCst)
    }

    pub fn execute_attempts(&self) -> u64 {
        self.execute_attempts.load(Ordering::SeqCst)
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&address)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn set_allowance(&self, owner: Address, spender: Address, amount: u64) {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((owner, spender), U256::from(amount));
    }

    fn record_transfer(&self) {
        self.confirmed_transfers.fetch_add(1, Ordering::SeqCst);
        if self.bugs.die_on_transfer {
            self.kill();
        }
    }
}

fn addr_arg(args: &[Value], position: usize) -> Result<Address, ExecutionError> {
    args.get(position)
        .and_then(Value::as_address)
        .ok_or(ExecutionError::Revert)
}

fn uint_arg(args: &[Value], position: usize) -> Result<U256, ExecutionError> {
    args.get(position)
        .and_then(Value::as_uint)
        .ok_or(ExecutionError::Revert)
}

fn transfer_event(from: Address, to: Address, amount: U256) -> EventRecord {
    EventRecord {
        name: "Transfer".to_string(),
        args: vec![Value::Addr(from), Value::Addr(to), Value::Uint(amount)],
    }
}

#[async_trait]
impl TransactionExecutor for MockToken {
    async fn execute(
        &self,
        function: &str,
        args: &[Value],
        opts: CallOptions,
    ) -> Result<TxReceipt, ExecutionError> {
        self.execute_attempts.fetch_add(1, Ordering::SeqCst);
        if self.dead.load(Ordering::SeqCst) || self.bugs.revert_everything {
            return Err(ExecutionError::Revert);
        }
        let caller = opts.from;
        let mut state = self.state.lock().unwrap();
        match function {
            "approve" => {
                let spender = addr_arg(args, 0)?;
                let amount = uint_arg(args, 1)?;
                state.allowances.insert((caller, spender), amount);
                let reported = if self.bugs.misreport_approval_zero {
                    U256::ZERO
                } else {
                    amount
                };
                Ok(TxReceipt {
                    events: vec![EventRecord {
                        name: "Approval".to_string(),
                        args: vec![
                            Value::Addr(caller),
                            Value::Addr(spender),
                            Value::Uint(reported),
                        ],
                    }],
                })
            }
            "transfer" => {
                let to = addr_arg(args, 0)?;
                let amount = uint_arg(args, 1)?;
                let from_balance = state.balances.get(&caller).copied().unwrap_or(U256::ZERO);
                let Some(remaining) = from_balance.checked_sub(amount) else {
                    return Err(ExecutionError::Revert);
                };
                state.balances.insert(caller, remaining);
                *state.balances.entry(to).or_insert(U256::ZERO) += amount;
                drop(state);
                self.record_transfer();
                let events = if self.bugs.skip_transfer_event {
                    Vec::new()
                } else {
                    vec![transfer_event(caller, to, amount)]
                };
                Ok(TxReceipt { events })
            }
            "transferFrom" => {
                let from = addr_arg(args, 0)?;
                let to = addr_arg(args, 1)?;
                let amount = uint_arg(args, 2)?;
                let allowed = state
                    .allowances
                    .get(&(from, caller))
                    .copied()
                    .unwrap_or(U256::ZERO);
                if !self.bugs.ignore_allowance_check && allowed < amount {
                    return Err(ExecutionError::Revert);
                }
                let from_balance = state.balances.get(&from).copied().unwrap_or(U256::ZERO);
                let Some(remaining) = from_balance.checked_sub(amount) else {
                    return Err(ExecutionError::Revert);
                };
                state.balances.insert(from, remaining);
                *state.balances.entry(to).or_insert(U256::ZERO) += amount;
                if !self.bugs.skip_allowance_decrement {
                    state
                        .allowances
                        .insert((from, caller), allowed.saturating_sub(amount));
                }
                drop(state);
                self.record_transfer();
                let events = if self.bugs.skip_transfer_event {
                    Vec::new()
                } else {
                    vec![transfer_event(from, to, amount)]
                };
                Ok(TxReceipt { events })
            }
            _ => Err(ExecutionError::Revert),
        }
    }

    async fn query(&self, function: &str, args: &[Value]) -> Result<Value, ExecutionError> {
        if self.dead.load(Ordering::SeqCst) {
            // a self-destructed contract answers every call with zero
            return Ok(Value::Uint(U256::ZERO));
        }
        let state = self.state.lock().unwrap();
        match function {
            "balanceOf" => {
                let owner = addr_arg(args, 0)?;
                Ok(Value::Uint(
                    state.balances.get(&owner).copied().unwrap_or(U256::ZERO),
                ))
            }
            "totalSupply" => {
                let supply = match self.bugs.reported_total_supply {
                    Some(reported) => U256::from(reported),
                    None => state.total_supply,
                };
                Ok(Value::Uint(supply))
            }
            "allowance" => {
                let owner = addr_arg(args, 0)?;
                let spender = addr_arg(args, 1)?;
                Ok(Value::Uint(
                    state
                        .allowances
                        .get(&(owner, spender))
                        .copied()
                        .unwrap_or(U256::ZERO),
                ))
            }
            _ => Err(ExecutionError::Revert),
        }
    }
}

/// An executor whose every call fails at the transport layer.
pub struct BrokenTransport;

#[async_trait]
impl TransactionExecutor for BrokenTransport {
    async fn execute(
        &self,
        _function: &str,
        _args: &[Value],
        _opts: CallOptions,
    ) -> Result<TxReceipt, ExecutionError> {
        Err(ExecutionError::Transport("connection refused".to_string()))
    }

    async fn query(&self, _function: &str, _args: &[Value]) -> Result<Value, ExecutionError> {
        Err(ExecutionError::Transport("connection refused".to_string()))
    }
}

pub fn erc20_map() -> NameToFunctionMap {
    import_abi(ERC20_ABI).expect("fixture abi must parse")
}

pub fn transfer_only_map() -> NameToFunctionMap {
    import_abi(TRANSFER_ONLY_ABI).expect("fixture abi must parse")
}

pub fn target_for(executor: Arc<dyn TransactionExecutor>, map: NameToFunctionMap) -> TargetContract {
    TargetContract::new(
        Address::repeat_byte(0xCC),
        map,
        PathBuf::from("artifacts/Token.json"),
        executor,
    )
}

/// Solver provider answering from a canned response, artifact set fixed at
/// construction.
pub struct ScriptedSolver {
    artifacts: Vec<String>,
    response: String,
}

impl ScriptedSolver {
    pub fn new(artifacts: &[&str], response_json: &str) -> Arc<Self> {
        Arc::new(Self {
            artifacts: artifacts.iter().map(|s| s.to_string()).collect(),
            response: response_json.to_string(),
        })
    }

    pub fn unsat_for(artifacts: &[&str]) -> Arc<Self> {
        Self::new(artifacts, r#"{"sat": false}"#)
    }
}

#[async_trait]
impl SolutionProvider for ScriptedSolver {
    fn has_artifact(&self, function: &str) -> bool {
        self.artifacts.iter().any(|name| name == function)
    }

    async fn solve(&self, _request: &SolveRequest) -> SolveResponse {
        serde_json::from_str(&self.response).unwrap_or_else(|_| SolveResponse::unsat())
    }
}

/// Provider with no artifacts at all; bots built with it never run the
/// overflow policy.
pub fn no_solver() -> Arc<ScriptedSolver> {
    ScriptedSolver::unsat_for(&[])
}
