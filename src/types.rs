//! Concrete parameter values and the Solidity type grammar the generators
//! and the solver admission rules operate on.

use alloy::primitives::{Address, I256, U256};
use std::fmt;

use crate::error::GenerationError;

/// A concrete value for one typed function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(U256),
    Int(I256),
    Addr(Address),
    Bool(bool),
    Str(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Addr(a) => Some(*a),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Addr(a) => write!(f, "{a}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Parsed form of the ABI type-string grammar: `uintN`/`intN` (missing `N`
/// means 256), `address`, `bool`, `string`, and `T[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Uint(u32),
    Int(u32),
    Addr,
    Bool,
    Str,
    Array(Box<ParamType>),
}

impl ParamType {
    pub fn parse(raw: &str) -> Result<Self, GenerationError> {
        if let Some(base) = raw.strip_suffix("[]") {
            return Ok(ParamType::Array(Box::new(ParamType::parse(base)?)));
        }
        if let Some(bits) = raw.strip_prefix("uint") {
            return parse_bits(raw, bits).map(ParamType::Uint);
        }
        if let Some(bits) = raw.strip_prefix("int") {
            return parse_bits(raw, bits).map(ParamType::Int);
        }
        match raw {
            "address" => Ok(ParamType::Addr),
            "bool" => Ok(ParamType::Bool),
            "string" => Ok(ParamType::Str),
            _ => Err(GenerationError::UnsupportedType(raw.to_string())),
        }
    }

    /// Canonical type string, used to build call signatures.
    pub fn canonical(&self) -> String {
        match self {
            ParamType::Uint(bits) => format!("uint{bits}"),
            ParamType::Int(bits) => format!("int{bits}"),
            ParamType::Addr => "address".to_string(),
            ParamType::Bool => "bool".to_string(),
            ParamType::Str => "string".to_string(),
            ParamType::Array(inner) => format!("{}[]", inner.canonical()),
        }
    }
}

fn parse_bits(raw: &str, suffix: &str) -> Result<u32, GenerationError> {
    if suffix.is_empty() {
        return Ok(256);
    }
    match suffix.parse::<u32>() {
        Ok(bits) if (1..=256).contains(&bits) => Ok(bits),
        _ => Err(GenerationError::UnsupportedType(raw.to_string())),
    }
}

/// Representable range of `uintN`.
pub fn unsigned_type_bounds(bits: u32) -> (U256, U256) {
    let max = if bits >= 256 {
        U256::MAX
    } else {
        (U256::from(1u8) << bits) - U256::from(1u8)
    };
    (U256::ZERO, max)
}

/// 2^(bits-1) as a positive `I256`; callers guarantee `bits < 256`.
fn signed_half_range(bits: u32) -> I256 {
    I256::from_raw(U256::from(1u8) << (bits - 1))
}

/// Generator range of `intN`: `[-(2^(bits-1))+1, 2^(bits-1)-2]`, one short of
/// the representable extremes at both ends. This mirrors the established
/// generator bounds and must not be widened.
pub fn signed_type_bounds(bits: u32) -> (I256, I256) {
    if bits >= 256 {
        return (I256::MIN + I256::ONE, I256::MAX - I256::ONE);
    }
    let half = signed_half_range(bits);
    (-half + I256::ONE, half - I256::ONE - I256::ONE)
}

/// True minimum of `intN`, the lower admission bound for solver output.
pub fn signed_type_min(bits: u32) -> I256 {
    if bits >= 256 {
        I256::MIN
    } else {
        -signed_half_range(bits)
    }
}

/// Parse a decimal string modulo 2^256. Oversized candidates (the solver is
/// free to emit them) keep their low 256 bits.
pub fn parse_uint_wrapping(raw: &str) -> Option<U256> {
    let digits = raw.trim();
    if digits.is_empty() {
        return None;
    }
    let mut acc = U256::ZERO;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            return None;
        }
        acc = acc
            .wrapping_mul(U256::from(10u8))
            .wrapping_add(U256::from(byte - b'0'));
    }
    Some(acc)
}

/// Parse a signed decimal string with modulo-2^256 wrap-around, rejecting
/// values below the true minimum of `intN`.
pub fn parse_int_wrapping(raw: &str, bits: u32) -> Option<I256> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let magnitude = parse_uint_wrapping(digits)?;
    let value = if negative {
        I256::from_raw(magnitude.wrapping_neg())
    } else {
        I256::from_raw(magnitude)
    };
    if value < signed_type_min(bits) {
        return None;
    }
    Some(value)
}

/// Convert a constraint-level `defaultValue` (free-form JSON) into a typed
/// value for the declared parameter type.
pub fn value_from_json(
    ty: &ParamType,
    raw: &serde_json::Value,
) -> Result<Value, GenerationError> {
    let invalid = || GenerationError::InvalidDefault {
        ty: ty.canonical(),
        raw: raw.to_string(),
    };
    match ty {
        ParamType::Uint(_) => match raw {
            serde_json::Value::String(s) => {
                parse_uint_wrapping(s).map(Value::Uint).ok_or_else(invalid)
            }
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(|v| Value::Uint(U256::from(v)))
                .ok_or_else(invalid),
            _ => Err(invalid()),
        },
        ParamType::Int(bits) => match raw {
            serde_json::Value::String(s) => parse_int_wrapping(s, *bits)
                .map(Value::Int)
                .ok_or_else(invalid),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(|v| Value::Int(I256::try_from(v).unwrap_or(I256::ZERO)))
                .ok_or_else(invalid),
            _ => Err(invalid()),
        },
        ParamType::Addr => match raw {
            serde_json::Value::String(s) => {
                s.parse::<Address>().map(Value::Addr).map_err(|_| invalid())
            }
            _ => Err(invalid()),
        },
        ParamType::Bool => match raw {
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(invalid()),
        },
        ParamType::Str => match raw {
            serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
            _ => Err(invalid()),
        },
        ParamType::Array(inner) => match raw {
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| value_from_json(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Err(invalid()),
        },
    }
}
