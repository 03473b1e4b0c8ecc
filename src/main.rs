//! Driver binary: wire the configured context, bots, and oracle suite
//! around one deployed target and run the round loop.

use std::sync::Arc;

use anyhow::Context as _;

use token_swarm::abi;
use token_swarm::bot::Bot;
use token_swarm::config::RunConfig;
use token_swarm::context::Context;
use token_swarm::contract::TargetContract;
use token_swarm::executor::rpc::RpcExecutor;
use token_swarm::invariants::InvariantSuite;
use token_swarm::simulator::Simulator;
use token_swarm::solver::{SolutionProvider, Z3ScriptProvider};

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = RunConfig::from_env().context("loading run configuration")?;
    let functions = abi::import_abi_from_file(&config.abi_path)
        .with_context(|| format!("importing abi from {}", config.abi_path.display()))?;

    let executor = Arc::new(RpcExecutor::connect(
        &config.rpc_url,
        config.target_address,
        functions.clone(),
    )?);
    let target = TargetContract::new(
        config.target_address,
        functions,
        config.artifacts_path.clone(),
        executor,
    );

    let solver: Arc<dyn SolutionProvider> = Arc::new(Z3ScriptProvider::new(
        config.scripts_dir.clone(),
        config.solver_timeout,
    ));

    let context = Context::for_addresses(config.accounts.clone());
    let bots: Vec<Bot> = config
        .accounts
        .iter()
        .map(|account| Bot::with_behaviours(*account, &config.behaviours, &solver))
        .collect();

    let mut simulator = Simulator::new(target, context, bots, InvariantSuite::eip20());
    let termination = simulator.start(config.rounds).await?;
    tracing::info!("[SIM] run terminated: {termination:?}");
    Ok(())
}
