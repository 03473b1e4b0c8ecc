//! Transaction execution seam.
//!
//! The engine never executes transactions itself; it drives a
//! [`TransactionExecutor`] and classifies the outcome. The one binding
//! shipped here is the thin JSON-RPC implementation in [`rpc`].

pub mod rpc;

use async_trait::async_trait;

use alloy::primitives::{Address, U256};

use crate::error::ExecutionError;
use crate::types::Value;

/// Sender and attached value for a state-mutating call.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    pub from: Address,
    pub value: U256,
}

impl CallOptions {
    /// Options for a zero-value call from `sender`.
    pub fn sender(sender: Address) -> Self {
        Self {
            from: sender,
            value: U256::ZERO,
        }
    }
}

/// One decoded log entry from a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub name: String,
    pub args: Vec<Value>,
}

/// Normalized receipt of a confirmed (non-reverted) transaction.
#[derive(Debug, Clone, Default)]
pub struct TxReceipt {
    pub events: Vec<EventRecord>,
}

/// The contract/RPC binding the simulator orchestrates.
///
/// A revert must surface as [`ExecutionError::Revert`]; every other failure
/// kind is treated as fatal by the round loop.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// Send a state-mutating call and wait for its receipt.
    async fn execute(
        &self,
        function: &str,
        args: &[Value],
        opts: CallOptions,
    ) -> Result<TxReceipt, ExecutionError>;

    /// Read-only call, decoded to the function's first output.
    async fn query(&self, function: &str, args: &[Value]) -> Result<Value, ExecutionError>;
}

/// Classify a raw RPC error message: on-chain rejection vs transport trouble.
pub fn classify_rpc_error(message: &str) -> ExecutionError {
    let msg = message.to_ascii_lowercase();
    let revert_markers = ["execution reverted", "revert", "status code 0"];
    if revert_markers.iter().any(|needle| msg.contains(needle)) {
        ExecutionError::Revert
    } else {
        ExecutionError::Transport(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_messages_classify_as_revert() {
        assert!(matches!(
            classify_rpc_error("server returned an error response: execution reverted"),
            ExecutionError::Revert
        ));
        assert!(matches!(
            classify_rpc_error("VM Exception: revert"),
            ExecutionError::Revert
        ));
        assert!(matches!(
            classify_rpc_error("connection refused"),
            ExecutionError::Transport(_)
        ));
    }
}
