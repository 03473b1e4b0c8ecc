//! Env-driven run configuration.

use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::Address;

use crate::error::ConfigError;

const DEFAULT_ROUNDS: u64 = 100;
const DEFAULT_SOLVER_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SCRIPTS_DIR: &str = "generated";
const DEFAULT_ARTIFACTS_PATH: &str = "artifacts";
const DEFAULT_BEHAVIOURS: &str = "random";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub rpc_url: String,
    pub target_address: Address,
    pub abi_path: PathBuf,
    pub artifacts_path: PathBuf,
    pub scripts_dir: PathBuf,
    pub accounts: Vec<Address>,
    pub behaviours: Vec<String>,
    pub rounds: u64,
    pub solver_timeout: Duration,
}

impl RunConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_url = require("SWARM_RPC_URL")?;
        validate_http_url("SWARM_RPC_URL", &rpc_url)?;

        let target_address = parse_address("SWARM_TARGET_ADDRESS", &require("SWARM_TARGET_ADDRESS")?)?;
        let abi_path = PathBuf::from(require("SWARM_ABI_PATH")?);
        let artifacts_path = PathBuf::from(env_or("SWARM_ARTIFACTS_PATH", DEFAULT_ARTIFACTS_PATH));
        let scripts_dir = PathBuf::from(env_or("SWARM_SCRIPTS_DIR", DEFAULT_SCRIPTS_DIR));

        let accounts = require("SWARM_ACCOUNTS")?
            .split(',')
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| parse_address("SWARM_ACCOUNTS", raw))
            .collect::<Result<Vec<_>, _>>()?;
        if accounts.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "SWARM_ACCOUNTS must list at least one address".to_string(),
            ));
        }

        let behaviours: Vec<String> = env_or("SWARM_BEHAVIOURS", DEFAULT_BEHAVIOURS)
            .split(',')
            .map(|raw| raw.trim().to_ascii_lowercase())
            .filter(|raw| !raw.is_empty())
            .collect();
        if behaviours.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "SWARM_BEHAVIOURS must list at least one label".to_string(),
            ));
        }

        let rounds = std::env::var("SWARM_ROUNDS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|v| *v >= 1)
            .unwrap_or(DEFAULT_ROUNDS);

        let solver_timeout_ms = std::env::var("SWARM_SOLVER_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|v| (1_000..=60_000).contains(v))
            .unwrap_or(DEFAULT_SOLVER_TIMEOUT_MS);

        Ok(Self {
            rpc_url,
            target_address,
            abi_path,
            artifacts_path,
            scripts_dir,
            accounts,
            behaviours,
            rounds,
            solver_timeout: Duration::from_millis(solver_timeout_ms),
        })
    }
}

fn require(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ConfigError::MissingConfig(key.to_string()))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn validate_http_url(name: &str, raw: &str) -> Result<(), ConfigError> {
    let parsed = raw.parse::<reqwest::Url>().map_err(|e| {
        ConfigError::InvalidConfig(format!("{name} must be a valid URL, got `{raw}`: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidConfig(format!(
            "{name} must use http(s) scheme, got `{other}`"
        ))),
    }
}

fn parse_address(name: &str, raw: &str) -> Result<Address, ConfigError> {
    raw.parse::<Address>().map_err(|e| {
        ConfigError::InvalidConfig(format!("{name} contains an invalid address `{raw}`: {e}"))
    })
}
