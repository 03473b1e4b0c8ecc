//! Handle to the contract under test: address, imported function map, the
//! solver artifacts location, and the execution seam. Immutable after
//! construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::primitives::{Address, U256};

use crate::abi::{Function, NameToFunctionMap};
use crate::error::{ExecutionError, Result};
use crate::executor::{CallOptions, TransactionExecutor, TxReceipt};
use crate::types::Value;

pub struct TargetContract {
    address: Address,
    functions: NameToFunctionMap,
    artifacts_path: PathBuf,
    executor: Arc<dyn TransactionExecutor>,
}

impl TargetContract {
    pub fn new(
        address: Address,
        functions: NameToFunctionMap,
        artifacts_path: PathBuf,
        executor: Arc<dyn TransactionExecutor>,
    ) -> Self {
        Self {
            address,
            functions,
            artifacts_path,
            executor,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn functions(&self) -> &NameToFunctionMap {
        &self.functions
    }

    pub fn artifacts_path(&self) -> &Path {
        &self.artifacts_path
    }

    pub async fn execute(
        &self,
        function: &Function,
        args: &[Value],
        opts: CallOptions,
    ) -> std::result::Result<TxReceipt, ExecutionError> {
        self.executor.execute(function.name(), args, opts).await
    }

    pub async fn execute_by_name(
        &self,
        function: &str,
        args: &[Value],
        opts: CallOptions,
    ) -> std::result::Result<TxReceipt, ExecutionError> {
        self.executor.execute(function, args, opts).await
    }

    pub async fn query(
        &self,
        function: &str,
        args: &[Value],
    ) -> std::result::Result<Value, ExecutionError> {
        self.executor.query(function, args).await
    }

    async fn query_uint(&self, function: &str, args: &[Value]) -> Result<U256> {
        match self.query(function, args).await? {
            Value::Uint(v) => Ok(v),
            other => Err(ExecutionError::BadReturn(format!(
                "{function} returned {other}, expected an unsigned integer"
            ))
            .into()),
        }
    }

    pub async fn balance_of(&self, holder: Address) -> Result<U256> {
        self.query_uint("balanceOf", &[Value::Addr(holder)]).await
    }

    pub async fn total_supply(&self) -> Result<U256> {
        self.query_uint("totalSupply", &[]).await
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        self.query_uint("allowance", &[Value::Addr(owner), Value::Addr(spender)])
            .await
    }
}
