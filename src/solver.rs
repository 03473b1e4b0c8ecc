//! External overflow-solver protocol.
//!
//! Candidate assignments come from per-function solver scripts generated
//! ahead of time. The engine talks to them through a versioned
//! request/response schema behind [`SolutionProvider`], so a different
//! solver backend slots in without touching behaviour logic. Every failure
//! mode of the subprocess (timeout, non-zero exit, stderr noise, non-JSON
//! stdout) degrades to an unsat response; the solver can never abort a run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_SOLVER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
pub struct SolveRequest {
    pub version: u32,
    pub function: String,
    pub artifacts_path: PathBuf,
    pub contract: Address,
    pub caller: Address,
    /// Binary mode flag forwarded verbatim to the script (`-d 0|1`).
    pub distinct: u8,
    pub bot_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolveResponse {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub sat: bool,
    /// Attached-wei candidate. Optional in the schema: absent means zero.
    #[serde(default)]
    pub msg_value: Option<serde_json::Value>,
    /// Candidate assignments keyed by parameter name. Scalars are decimal
    /// strings (or numbers); array parameters map to arrays of those.
    #[serde(flatten)]
    pub assignments: BTreeMap<String, serde_json::Value>,
}

fn default_version() -> u32 {
    PROTOCOL_VERSION
}

impl SolveResponse {
    pub fn unsat() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            sat: false,
            msg_value: None,
            assignments: BTreeMap::new(),
        }
    }
}

/// Decimal text of a scalar candidate, whether the script emitted it as a
/// JSON string or a bare number.
pub fn scalar_string(raw: &serde_json::Value) -> Option<String> {
    match raw {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
pub trait SolutionProvider: Send + Sync {
    /// Whether a solver artifact exists for `function`; gates the overflow
    /// behaviour's candidate set.
    fn has_artifact(&self, function: &str) -> bool;

    /// Total: degraded failures come back as unsat.
    async fn solve(&self, request: &SolveRequest) -> SolveResponse;
}

/// Subprocess provider over the generated `<function>_z3.py` scripts.
pub struct Z3ScriptProvider {
    scripts_dir: PathBuf,
    timeout: Duration,
    interpreter: String,
}

impl Z3ScriptProvider {
    pub fn new(scripts_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::with_interpreter(scripts_dir, timeout, "python3")
    }

    pub fn with_interpreter(
        scripts_dir: impl Into<PathBuf>,
        timeout: Duration,
        interpreter: impl Into<String>,
    ) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            timeout,
            interpreter: interpreter.into(),
        }
    }

    fn script_path(&self, function: &str) -> PathBuf {
        self.scripts_dir.join(format!("{function}_z3.py"))
    }
}

#[async_trait]
impl SolutionProvider for Z3ScriptProvider {
    fn has_artifact(&self, function: &str) -> bool {
        self.script_path(function).is_file()
    }

    async fn solve(&self, request: &SolveRequest) -> SolveResponse {
        let script = self.script_path(&request.function);
        if !script.is_file() {
            return SolveResponse::unsat();
        }
        tracing::debug!(
            "[SOLVE] {} {} -ta {} -c {} -a {} -d {} -bn {}",
            self.interpreter,
            script.display(),
            request.artifacts_path.display(),
            request.contract,
            request.caller,
            request.distinct,
            request.bot_count
        );
        let child = Command::new(&self.interpreter)
            .arg(&script)
            .arg("-ta")
            .arg(&request.artifacts_path)
            .arg("-c")
            .arg(request.contract.to_string())
            .arg("-a")
            .arg(request.caller.to_string())
            .arg("-d")
            .arg(request.distinct.to_string())
            .arg("-bn")
            .arg(request.bot_count.to_string())
            .kill_on_drop(true)
            .output();
        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                tracing::debug!("[SOLVE] solver spawn failed: {err}");
                return SolveResponse::unsat();
            }
            Err(_) => {
                tracing::debug!("[SOLVE] solver timed out for {}", request.function);
                return SolveResponse::unsat();
            }
        };
        if !output.status.success() || !output.stderr.is_empty() {
            return SolveResponse::unsat();
        }
        serde_json::from_slice(&output.stdout).unwrap_or_else(|_| SolveResponse::unsat())
    }
}
