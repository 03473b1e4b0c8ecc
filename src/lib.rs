//! Stateful invariant-checking fuzzing engine for token-style smart
//! contracts.
//!
//! The engine repeatedly drives a deployed contract through randomized,
//! boundary-biased, and solver-guided transactions while a set of stateful
//! oracles watches balance, allowance, and event consistency across time.
//! Transaction execution itself lives behind the [`executor`] seam; the
//! overflow solver is an external subprocess behind [`solver`].

pub mod abi;
pub mod account;
pub mod behaviour;
pub mod bot;
pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod executor;
pub mod generator;
pub mod invariants;
pub mod outcome;
pub mod simulator;
pub mod solver;
pub mod telemetry;
pub mod types;

pub use error::{Result, SwarmError};
