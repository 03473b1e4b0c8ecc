//! Constraint-aware value synthesis for typed function parameters.
//!
//! One generator type, two numeric modes: uniform sampling and the
//! boundary-biased distribution used to provoke off-by-one and wrap-around
//! behavior near type or constraint edges.

use std::collections::BTreeMap;

use alloy::primitives::{I256, U256};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::abi::{Constraints, Function, Parameter};
use crate::context::Context;
use crate::error::GenerationError;
use crate::types::{
    parse_int_wrapping, parse_uint_wrapping, signed_type_bounds, unsigned_type_bounds,
    value_from_json, ParamType, Value,
};

pub const DEFAULT_BOUNDARY_DELTA: u64 = 10_000;

const DEFAULT_MIN_STRING_SIZE: u64 = 0;
const DEFAULT_MAX_STRING_SIZE: u64 = 10;
const DEFAULT_MIN_ARRAY_SIZE: u64 = 0;
const DEFAULT_MAX_ARRAY_SIZE: u64 = 5;

#[derive(Debug, Clone, Copy)]
enum NumericMode {
    Uniform,
    /// 1/10 min, 1/10 max, 1/10 near-min, 1/10 near-max, 6/10 in `[0, delta)`.
    Boundary { delta: u64 },
}

pub struct ValueGenerator {
    rng: StdRng,
    mode: NumericMode,
    defaults: BTreeMap<String, Constraints>,
}

fn default_constraints() -> BTreeMap<String, Constraints> {
    let mut defaults = BTreeMap::new();
    defaults.insert(
        "string".to_string(),
        Constraints {
            min_string_size: Some(DEFAULT_MIN_STRING_SIZE),
            max_string_size: Some(DEFAULT_MAX_STRING_SIZE),
            ..Constraints::default()
        },
    );
    defaults.insert(
        "[]".to_string(),
        Constraints {
            min_array_size: Some(DEFAULT_MIN_ARRAY_SIZE),
            max_array_size: Some(DEFAULT_MAX_ARRAY_SIZE),
            ..Constraints::default()
        },
    );
    defaults
}

impl ValueGenerator {
    pub fn random() -> Self {
        Self::with_mode(NumericMode::Uniform, StdRng::from_entropy())
    }

    pub fn boundary() -> Self {
        Self::with_mode(
            NumericMode::Boundary {
                delta: DEFAULT_BOUNDARY_DELTA,
            },
            StdRng::from_entropy(),
        )
    }

    pub fn random_seeded(seed: u64) -> Self {
        Self::with_mode(NumericMode::Uniform, StdRng::seed_from_u64(seed))
    }

    pub fn boundary_seeded(seed: u64) -> Self {
        Self::with_mode(
            NumericMode::Boundary {
                delta: DEFAULT_BOUNDARY_DELTA,
            },
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_mode(mode: NumericMode, rng: StdRng) -> Self {
        Self {
            rng,
            mode,
            defaults: default_constraints(),
        }
    }

    /// Uniform pick among a slice; `None` only when the slice is empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..items.len());
        Some(&items[index])
    }

    /// Resolve all declared inputs of `function`, in order.
    pub fn random_parameters(
        &mut self,
        function: &Function,
        ctx: &Context,
    ) -> Result<Vec<Value>, GenerationError> {
        function
            .inputs
            .iter()
            .map(|param| self.random_value(param, ctx))
            .collect()
    }

    /// Synthesize one value: a constraint-level `defaultValue` wins, then a
    /// type-keyed default, then randomization.
    pub fn random_value(
        &mut self,
        param: &Parameter,
        ctx: &Context,
    ) -> Result<Value, GenerationError> {
        let ty = ParamType::parse(&param.ty)?;
        let constraints = param.constraints.clone().unwrap_or_default();
        if let Some(default) = &constraints.default_value {
            return value_from_json(&ty, default);
        }
        if let Some(default) = self
            .defaults
            .get(&param.ty)
            .and_then(|c| c.default_value.as_ref())
        {
            return value_from_json(&ty, default);
        }
        self.value_for(&ty, &constraints, ctx)
    }

    fn value_for(
        &mut self,
        ty: &ParamType,
        constraints: &Constraints,
        ctx: &Context,
    ) -> Result<Value, GenerationError> {
        match ty {
            ParamType::Array(inner) => {
                let array_defaults = &self.defaults["[]"];
                let min = constraints
                    .min_array_size
                    .or(array_defaults.min_array_size);
                let max = constraints
                    .max_array_size
                    .or(array_defaults.max_array_size);
                let (Some(min), Some(max)) = (min, max) else {
                    return Ok(Value::Array(Vec::new()));
                };
                if max == 0 {
                    return Ok(Value::Array(Vec::new()));
                }
                // array lengths use the exclusive upper bound
                let len = self.length_exclusive(min, max);
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    items.push(self.value_for(inner, constraints, ctx)?);
                }
                Ok(Value::Array(items))
            }
            ParamType::Uint(bits) => Ok(Value::Uint(self.unsigned_value(*bits, constraints))),
            ParamType::Int(bits) => Ok(Value::Int(self.signed_value(*bits, constraints))),
            ParamType::Addr => {
                let account = self
                    .pick(&ctx.bot_accounts)
                    .copied()
                    .ok_or(GenerationError::NoKnownAccounts)?;
                Ok(Value::Addr(account))
            }
            ParamType::Bool => Ok(Value::Bool(self.rng.gen_bool(0.5))),
            ParamType::Str => {
                let string_defaults = &self.defaults["string"];
                let min = constraints
                    .min_string_size
                    .or(string_defaults.min_string_size);
                let max = constraints
                    .max_string_size
                    .or(string_defaults.max_string_size);
                let (Some(min), Some(max)) = (min, max) else {
                    return Ok(Value::Str(String::new()));
                };
                if max == 0 {
                    return Ok(Value::Str(String::new()));
                }
                // string lengths use the inclusive upper bound
                let len = self.length_inclusive(min, max);
                Ok(Value::Str(self.random_string(len)))
            }
        }
    }

    fn unsigned_value(&mut self, bits: u32, constraints: &Constraints) -> U256 {
        let (type_min, type_max) = unsigned_type_bounds(bits);
        let min = constraints
            .min_value
            .as_deref()
            .and_then(parse_uint_wrapping)
            .map(|v| v.clamp(type_min, type_max))
            .unwrap_or(type_min);
        let max = constraints
            .max_value
            .as_deref()
            .and_then(parse_uint_wrapping)
            .map(|v| v.clamp(type_min, type_max))
            .unwrap_or(type_max);
        let (lo, hi) = (min.min(max), min.max(max));
        match self.mode {
            NumericMode::Uniform => self.uniform_u256(lo, hi),
            NumericMode::Boundary { delta } => self.boundary_u256(lo, hi, delta),
        }
    }

    fn signed_value(&mut self, bits: u32, constraints: &Constraints) -> I256 {
        let (type_min, type_max) = signed_type_bounds(bits);
        let min = constraints
            .min_value
            .as_deref()
            .and_then(|raw| parse_int_wrapping(raw, bits))
            .map(|v| v.clamp(type_min, type_max))
            .unwrap_or(type_min);
        let max = constraints
            .max_value
            .as_deref()
            .and_then(|raw| parse_int_wrapping(raw, bits))
            .map(|v| v.clamp(type_min, type_max))
            .unwrap_or(type_max);
        let (lo, hi) = (min.min(max), min.max(max));
        match self.mode {
            NumericMode::Uniform => self.uniform_i256(lo, hi),
            NumericMode::Boundary { delta } => self.boundary_i256(lo, hi, delta),
        }
    }

    /// Uniform in `[lo, hi]`, both ends inclusive.
    fn uniform_u256(&mut self, lo: U256, hi: U256) -> U256 {
        let raw = U256::from_le_bytes(self.rng.gen::<[u8; 32]>());
        let span = hi - lo;
        if span == U256::MAX {
            return raw;
        }
        lo + raw % (span + U256::from(1u8))
    }

    fn uniform_i256(&mut self, lo: I256, hi: I256) -> I256 {
        // two's complement span fits U256 for any ordered pair
        let span = hi.into_raw().wrapping_sub(lo.into_raw());
        let offset = self.uniform_u256(U256::ZERO, span);
        I256::from_raw(lo.into_raw().wrapping_add(offset))
    }

    fn boundary_u256(&mut self, lo: U256, hi: U256, delta: u64) -> U256 {
        let delta = U256::from(delta);
        match self.rng.gen_range(0..10u8) {
            0 => lo,
            1 => hi,
            2 => {
                let near_min_hi = lo.saturating_add(delta).min(hi);
                self.uniform_u256(lo, near_min_hi)
            }
            3 => {
                let near_max_lo = hi.saturating_sub(delta).max(lo);
                self.uniform_u256(near_max_lo, hi)
            }
            _ => {
                let small = self.uniform_u256(U256::ZERO, delta.saturating_sub(U256::from(1u8)));
                small.clamp(lo, hi)
            }
        }
    }

    fn boundary_i256(&mut self, lo: I256, hi: I256, delta: u64) -> I256 {
        let delta = I256::try_from(delta).unwrap_or(I256::MAX);
        match self.rng.gen_range(0..10u8) {
            0 => lo,
            1 => hi,
            2 => {
                let near_min_hi = lo.saturating_add(delta).min(hi);
                self.uniform_i256(lo, near_min_hi)
            }
            3 => {
                let near_max_lo = hi.saturating_sub(delta).max(lo);
                self.uniform_i256(near_max_lo, hi)
            }
            _ => {
                let small = self.uniform_i256(I256::ZERO, delta.saturating_sub(I256::ONE));
                small.clamp(lo, hi)
            }
        }
    }

    fn length_exclusive(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            min
        } else {
            self.rng.gen_range(min..max)
        }
    }

    fn length_inclusive(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            min
        } else {
            self.rng.gen_range(min..=max)
        }
    }

    fn random_string(&mut self, len: u64) -> String {
        (0..len)
            .map(|_| self.rng.sample(Alphanumeric) as char)
            .collect()
    }
}
