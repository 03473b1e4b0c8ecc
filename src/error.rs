use thiserror::Error;

pub type Result<T> = std::result::Result<T, SwarmError>;

#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),
    #[error("abi error: {0}")]
    Abi(#[from] AbiError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("no callable function")]
    NoCallableFunction,
    #[error("bot has no behaviours attached")]
    EmptyBehaviourSet,
    #[error("oracle error: {0}")]
    Oracle(String),
}

impl SwarmError {
    /// Errors the round loop swallows: the bot is skipped for the round
    /// and the simulation continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SwarmError::Generation(_) | SwarmError::NoCallableFunction
        )
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("unhandled solidity type `{0}`")]
    UnsupportedType(String),
    #[error("constraint default is not a valid `{ty}` value: {raw}")]
    InvalidDefault { ty: String, raw: String },
    #[error("no known bot accounts to pick an address from")]
    NoKnownAccounts,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("transaction reverted")]
    Revert,
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected return value: {0}")]
    BadReturn(String),
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver address index {index} out of range ({known} known accounts)")]
    AddressIndex { index: usize, known: usize },
}

#[derive(Debug, Error)]
pub enum AbiError {
    #[error("cannot read abi document: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse abi document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("abi document is neither an array nor an object with an `abi` key")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingConfig(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
