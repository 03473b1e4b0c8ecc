//! Thin JSON-RPC binding for a deployed target contract.
//!
//! Calldata is assembled dynamically from the imported ABI descriptors, so
//! the engine can drive arbitrary token contracts without compile-time
//! bindings. State-mutating calls go through `eth_sendTransaction` (node
//! managed accounts, the deployment model the harness uses); reads go
//! through `eth_call`.

use std::sync::OnceLock;

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::transports::http::Http;
use async_trait::async_trait;
use reqwest::Client;

use crate::abi::{Function, NameToFunctionMap};
use crate::error::{ConfigError, ExecutionError};
use crate::executor::{classify_rpc_error, CallOptions, EventRecord, TransactionExecutor, TxReceipt};
use crate::types::{ParamType, Value};

pub type HttpProvider = RootProvider<Http<Client>>;

fn transfer_topic() -> B256 {
    static TOPIC: OnceLock<B256> = OnceLock::new();
    *TOPIC.get_or_init(|| keccak256("Transfer(address,address,uint256)"))
}

fn approval_topic() -> B256 {
    static TOPIC: OnceLock<B256> = OnceLock::new();
    *TOPIC.get_or_init(|| keccak256("Approval(address,address,uint256)"))
}

pub struct RpcExecutor {
    provider: HttpProvider,
    contract: Address,
    functions: NameToFunctionMap,
}

impl RpcExecutor {
    pub fn connect(
        rpc_url: &str,
        contract: Address,
        functions: NameToFunctionMap,
    ) -> Result<Self, ConfigError> {
        let url = rpc_url.parse().map_err(|e| {
            ConfigError::InvalidConfig(format!("rpc url `{rpc_url}` is not a valid URL: {e}"))
        })?;
        Ok(Self {
            provider: RootProvider::new_http(url),
            contract,
            functions,
        })
    }

    fn descriptor(&self, function: &str) -> Result<&Function, ExecutionError> {
        self.functions
            .get(function)
            .ok_or_else(|| ExecutionError::UnknownFunction(function.to_string()))
    }

    fn calldata(&self, function: &Function, args: &[Value]) -> Bytes {
        let selector = &keccak256(function.signature().as_bytes())[..4];
        let mut tokens = Vec::with_capacity(args.len());
        for (position, arg) in args.iter().enumerate() {
            let declared = function.inputs.get(position).map(|p| p.ty.as_str());
            tokens.push(to_dyn_value(arg, declared));
        }
        let encoded = DynSolValue::Tuple(tokens).abi_encode_params();
        let mut data = Vec::with_capacity(4 + encoded.len());
        data.extend_from_slice(selector);
        data.extend_from_slice(&encoded);
        data.into()
    }

    fn decode_output(&self, function: &Function, raw: &[u8]) -> Result<Value, ExecutionError> {
        let out_ty = function
            .outputs
            .first()
            .map(|p| p.ty.as_str())
            .unwrap_or("uint256");
        let sol_ty = DynSolType::parse(out_ty)
            .map_err(|e| ExecutionError::BadReturn(format!("output type `{out_ty}`: {e}")))?;
        let decoded = sol_ty
            .abi_decode(raw)
            .map_err(|e| ExecutionError::BadReturn(e.to_string()))?;
        from_dyn_value(decoded)
            .ok_or_else(|| ExecutionError::BadReturn(format!("undecodable `{out_ty}` return")))
    }

    fn decode_event(&self, log: &alloy::rpc::types::Log) -> Option<EventRecord> {
        if log.inner.address != self.contract {
            return None;
        }
        let topics = log.inner.data.topics();
        let topic0 = topics.first()?;
        let name = if *topic0 == transfer_topic() {
            "Transfer"
        } else if *topic0 == approval_topic() {
            "Approval"
        } else {
            return None;
        };
        if topics.len() < 3 {
            return None;
        }
        let data = log.inner.data.data.as_ref();
        if data.len() > 32 {
            return None;
        }
        let amount = U256::from_be_slice(data);
        Some(EventRecord {
            name: name.to_string(),
            args: vec![
                Value::Addr(Address::from_word(topics[1])),
                Value::Addr(Address::from_word(topics[2])),
                Value::Uint(amount),
            ],
        })
    }
}

#[async_trait]
impl TransactionExecutor for RpcExecutor {
    async fn execute(
        &self,
        function: &str,
        args: &[Value],
        opts: CallOptions,
    ) -> Result<TxReceipt, ExecutionError> {
        let descriptor = self.descriptor(function)?;
        let tx = TransactionRequest {
            from: Some(opts.from),
            to: Some(TxKind::Call(self.contract)),
            value: Some(opts.value),
            input: TransactionInput::new(self.calldata(descriptor, args)),
            ..Default::default()
        };
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        if !receipt.status() {
            return Err(ExecutionError::Revert);
        }
        let events = receipt
            .inner
            .as_receipt()
            .map(|r| r.logs.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|log| self.decode_event(log))
            .collect();
        Ok(TxReceipt { events })
    }

    async fn query(&self, function: &str, args: &[Value]) -> Result<Value, ExecutionError> {
        let descriptor = self.descriptor(function)?;
        let tx = TransactionRequest {
            to: Some(TxKind::Call(self.contract)),
            input: TransactionInput::new(self.calldata(descriptor, args)),
            ..Default::default()
        };
        let raw = self
            .provider
            .call(&tx)
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        self.decode_output(descriptor, raw.as_ref())
    }
}

fn declared_type(declared: Option<&str>) -> Option<ParamType> {
    declared.and_then(|raw| ParamType::parse(raw).ok())
}

fn to_dyn_value(value: &Value, declared: Option<&str>) -> DynSolValue {
    match value {
        Value::Uint(v) => {
            let bits = match declared_type(declared) {
                Some(ParamType::Uint(bits)) => bits as usize,
                _ => 256,
            };
            DynSolValue::Uint(*v, bits)
        }
        Value::Int(v) => {
            let bits = match declared_type(declared) {
                Some(ParamType::Int(bits)) => bits as usize,
                _ => 256,
            };
            DynSolValue::Int(*v, bits)
        }
        Value::Addr(a) => DynSolValue::Address(*a),
        Value::Bool(b) => DynSolValue::Bool(*b),
        Value::Str(s) => DynSolValue::String(s.clone()),
        Value::Array(items) => {
            let element = declared
                .and_then(|raw| raw.strip_suffix("[]"))
                .map(str::to_string);
            DynSolValue::Array(
                items
                    .iter()
                    .map(|item| to_dyn_value(item, element.as_deref()))
                    .collect(),
            )
        }
    }
}

fn from_dyn_value(value: DynSolValue) -> Option<Value> {
    match value {
        DynSolValue::Uint(v, _) => Some(Value::Uint(v)),
        DynSolValue::Int(v, _) => Some(Value::Int(v)),
        DynSolValue::Address(a) => Some(Value::Addr(a)),
        DynSolValue::Bool(b) => Some(Value::Bool(b)),
        DynSolValue::String(s) => Some(Value::Str(s)),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => items
            .into_iter()
            .map(from_dyn_value)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        _ => None,
    }
}
