//! ABI document model and import.
//!
//! Accepts either a bare JSON array of function descriptors or an object
//! carrying that array under an `"abi"` key; both forms produce identical
//! name-to-function maps. Parameters may carry generator constraints.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::AbiError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub default_value: Option<serde_json::Value>,
    pub min_array_size: Option<u64>,
    pub max_array_size: Option<u64>,
    pub min_string_size: Option<u64>,
    pub max_string_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub constraints: Option<Constraints>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default = "default_descriptor_kind")]
    pub kind: String,
    #[serde(default)]
    pub inputs: Vec<Parameter>,
    #[serde(default)]
    pub outputs: Vec<Parameter>,
    #[serde(default)]
    pub state_mutability: Option<String>,
    #[serde(default)]
    pub payable: Option<bool>,
    #[serde(default)]
    pub constant: Option<bool>,
}

fn default_descriptor_kind() -> String {
    "function".to_string()
}

impl Function {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Mutability, falling back to the legacy `constant` flag for pre-0.5
    /// style documents.
    pub fn mutability(&self) -> &str {
        match self.state_mutability.as_deref() {
            Some(m) => m,
            None if self.constant == Some(true) => "view",
            None => "nonpayable",
        }
    }

    pub fn is_payable(&self) -> bool {
        self.payable == Some(true) || self.mutability() == "payable"
    }

    /// A function the random/boundary behaviours may invoke: an actual
    /// function (not an event), state-mutating, and not freeze-related.
    pub fn is_callable(&self) -> bool {
        self.kind == "function"
            && !matches!(self.mutability(), "view" | "pure")
            && !self.name().contains("freeze")
    }

    /// State-mutating, ignoring the kind and freeze filters; the overflow
    /// behaviour applies its own artifact-existence filter on top.
    pub fn is_state_mutating(&self) -> bool {
        !matches!(self.mutability(), "view" | "pure")
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.inputs.iter().map(|p| p.ty.as_str()).collect();
        format!("{}({})", self.name(), params.join(","))
    }
}

/// Function name to descriptor. Ordered so iteration is deterministic.
pub type NameToFunctionMap = BTreeMap<String, Function>;

pub fn import_abi(document: &str) -> Result<NameToFunctionMap, AbiError> {
    let root: serde_json::Value = serde_json::from_str(document)?;
    let entries = match root {
        array @ serde_json::Value::Array(_) => array,
        serde_json::Value::Object(mut fields) => {
            fields.remove("abi").ok_or(AbiError::Malformed)?
        }
        _ => return Err(AbiError::Malformed),
    };
    let descriptors: Vec<Function> = serde_json::from_value(entries)?;
    let mut map = NameToFunctionMap::new();
    for descriptor in descriptors {
        // constructor/fallback descriptors carry no name and cannot be
        // addressed by the engine
        if let Some(name) = descriptor.name.clone() {
            map.insert(name, descriptor);
        }
    }
    Ok(map)
}

pub fn import_abi_from_file(path: impl AsRef<Path>) -> Result<NameToFunctionMap, AbiError> {
    let document = std::fs::read_to_string(path)?;
    import_abi(&document)
}
