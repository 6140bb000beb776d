//! Command Line Interface for stable-swap routing and liquidity estimates.
mod args;
mod follow;
mod render;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use primitive_types::U256;
use rust_decimal::Decimal;
use stable_lp_domain::config::ChainConfig;
use stable_lp_domain::registry::Registry;
use stable_lp_domain::route::resolve_route;
use stable_lp_domain::value_objects::{Amount, SwapEstimate};
use stable_lp_estimation::QueryClients;
use stable_lp_estimation::deposit::DepositRequest;
use stable_lp_estimation::swap::SwapRequest;
use stable_lp_estimation::withdraw::{
    WithdrawEstimator, WithdrawMode, WithdrawPlan, WithdrawRequest,
};
use stable_lp_execution::prelude::*;
use stable_lp_protocols::simulator::{SimulatorConfig, StableSwapSimulator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const DEFAULT_ROUTER: &str = "router";

#[derive(Parser)]
#[command(name = "stable-lp")]
#[command(about = "Stable-swap routing and liquidity estimates", long_about = None)]
struct Cli {
    /// Chain configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "STABLE_LP_CONFIG",
        default_value = "crates/cli/config/sample.json"
    )]
    config: PathBuf,

    /// Slippage tolerance in percent (e.g. 0.5); defaults to the configured value
    #[arg(short, long, global = true)]
    slippage: Option<Decimal>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List pools with their assets and loaded state
    Pools,
    /// Show how one token is swapped into another
    Route {
        /// Token to sell
        from: String,
        /// Token to buy
        to: String,
    },
    /// Estimate a swap
    Swap {
        /// Token to sell
        from: String,
        /// Token to buy
        to: String,
        /// Amount to sell, in whole tokens
        amount: Decimal,
        /// Keep re-estimating as pool state changes, until Ctrl+C
        #[arg(short, long)]
        watch: bool,
    },
    /// Estimate adding liquidity
    Deposit {
        /// Pool id
        pool: String,
        /// Amounts to deposit, as SYMBOL=AMOUNT
        #[arg(required = true, value_parser = args::parse_allocation)]
        amounts: Vec<(String, Decimal)>,
        /// Deposit the base pool LP token instead of the underlying assets
        #[arg(long)]
        base_lp: bool,
    },
    /// Estimate removing liquidity
    Withdraw {
        /// Pool id
        pool: String,
        /// LP tokens to redeem, in whole tokens
        lp: Decimal,
        /// Redeem into this asset only
        #[arg(short, long)]
        asset: Option<String>,
        /// Receive the base pool LP token instead of the underlying assets
        #[arg(long)]
        base_lp: bool,
    },
}

/// A loaded registry with its read clients and updater.
struct Session {
    config: ChainConfig,
    registry: SharedRegistry,
    clients: QueryClients,
    updater: Arc<PoolStateUpdater>,
}

/// Builds the simulated backend from the configuration and loads every
/// pool's state once.
async fn connect(path: &Path) -> Result<Session> {
    let config = ChainConfig::from_path(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let registry = config.to_registry()?;

    let simulation = config
        .simulation
        .as_ref()
        .ok_or_else(|| anyhow!("{} has no simulation section", path.display()))?;
    let seeds = SimulatorConfig::from_value(simulation)?;
    let router = config
        .router
        .clone()
        .unwrap_or_else(|| DEFAULT_ROUTER.to_string());
    let backend = Arc::new(StableSwapSimulator::from_registry(&registry, &seeds, router)?);

    let registry = shared(registry);
    let updater = Arc::new(PoolStateUpdater::new(
        backend.clone(),
        registry.clone(),
        UpdaterConfig::from_chain(&config),
    ));
    updater.watch_all().await;
    let loaded = updater.refresh_once().await;
    info!(
        chain = %config.name,
        updated = loaded.updated,
        failed = loaded.failed,
        "Pool state loaded"
    );

    Ok(Session {
        config,
        registry,
        clients: QueryClients::from_backend(backend),
        updater,
    })
}

fn decimals_of(registry: &Registry, symbol: &str) -> Result<u8> {
    registry
        .token(symbol)
        .map(|t| t.decimals)
        .ok_or_else(|| anyhow!("unknown token {symbol}"))
}

fn lp_decimals_of(registry: &Registry, pool: &str) -> Result<u8> {
    let pool = registry
        .pool(pool)
        .ok_or_else(|| anyhow!("unknown pool {pool}"))?;
    decimals_of(registry, &pool.lp_token)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let session = connect(&cli.config).await?;
    let slippage = match cli.slippage {
        Some(percent) => args::slippage(percent)?,
        None => session.config.slippage(),
    };

    match cli.command {
        Commands::Pools => {
            render::pools(&*session.registry.read().await);
        }
        Commands::Route { from, to } => {
            let registry = session.registry.read().await;
            render::route(&from, &to, resolve_route(&registry, &from, &to).as_ref());
        }
        Commands::Swap {
            from,
            to,
            amount,
            watch,
        } => {
            let (request, from_decimals, to_decimals) = {
                let registry = session.registry.read().await;
                let raw = args::raw_amount(&registry, &from, amount)?;
                let request = SwapRequest::new(from.clone(), to.clone(), raw, slippage);
                (request, decimals_of(&registry, &from)?, decimals_of(&registry, &to)?)
            };
            let show = |estimate: &SwapEstimate| {
                render::swap((from.as_str(), from_decimals), (to.as_str(), to_decimals), estimate)
            };
            let source = SwapSource::new(session.clients.clone(), session.registry.clone());

            if !watch {
                match source.estimate(&request).await {
                    Ok(estimate) => show(&estimate),
                    Err(reason) => render::unavailable(&reason),
                }
                return Ok(());
            }

            let stream = EstimateStream::spawn(
                Arc::new(source),
                EstimateStreamConfig::from_chain(&session.config),
            );
            let updater = session.updater.clone();
            let sync = tokio::spawn(async move { updater.run().await });

            let states = stream.subscribe();
            stream.set_input(request);
            println!("👀 Watching {from} -> {to}, press Ctrl+C to stop");

            follow::follow(states, tokio::signal::ctrl_c(), |state| match state {
                EstimateState::Ready(estimate) => show(estimate),
                EstimateState::Unavailable(reason) => render::unavailable(reason),
                EstimateState::Pending | EstimateState::Idle => {}
            })
            .await;

            session.updater.stop();
            sync.abort();
            println!("👋 Stopped");
        }
        Commands::Deposit {
            pool,
            amounts,
            base_lp,
        } => {
            let (request, lp_decimals) = {
                let registry = session.registry.read().await;
                let raw = args::deposit_amounts(&registry, &pool, base_lp, &amounts)?;
                let request =
                    DepositRequest::new(pool.clone(), raw, slippage).with_base_pool_token(base_lp);
                (request, lp_decimals_of(&registry, &pool)?)
            };
            let source = DepositSource::new(session.clients.clone(), session.registry.clone());
            match source.estimate(&request).await {
                Ok(estimate) => render::deposit(&pool, lp_decimals, &estimate),
                Err(reason) => render::unavailable(&reason),
            }
        }
        Commands::Withdraw {
            pool,
            lp,
            asset,
            base_lp,
        } => {
            let (plan, lp_decimals) = {
                let registry = session.registry.read().await;
                let lp_decimals = lp_decimals_of(&registry, &pool)?;
                let lp_amount: U256 = Amount::from_decimal(lp, lp_decimals)
                    .with_context(|| format!("LP amount {lp} is not representable"))?
                    .raw;
                let mode = match &asset {
                    Some(symbol) => {
                        let assets = registry.effective_assets(&pool, base_lp)?;
                        let index = assets
                            .iter()
                            .position(|t| &t.symbol == symbol)
                            .ok_or_else(|| anyhow!("{symbol} is not an asset of {pool}"))?;
                        WithdrawMode::SingleAsset(index)
                    }
                    None => WithdrawMode::AllAssets,
                };
                let request = WithdrawRequest::new(pool.clone(), lp_amount, mode, slippage)
                    .with_base_pool_token(base_lp);
                (WithdrawPlan::prepare(&registry, &request), lp_decimals)
            };

            let plan = match plan {
                Ok(plan) => plan,
                Err(reason) => {
                    render::unavailable(&reason);
                    return Ok(());
                }
            };
            let estimator = WithdrawEstimator::new(session.clients.clone());
            match estimator.quote(&plan).await {
                Ok(estimate) => {
                    let spender = plan.spender(session.clients.router_address());
                    render::withdraw(&pool, lp_decimals, &plan.assets, spender, &estimate);
                }
                Err(reason) => render::unavailable(&reason),
            }
        }
    }

    Ok(())
}
